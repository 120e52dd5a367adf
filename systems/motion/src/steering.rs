//! Separation steering between neighboring agents.

use glam::Vec2;
use waypath_core::{AgentId, AgentView};

/// Repulsion away from living neighbors inside `radius`.
///
/// Each neighbor contributes a unit vector pointing away from it, weighted by
/// `1 - distance / radius`. The sum is rescaled so its length never exceeds
/// `max_step`; a single neighbor at the edge of the neighborhood contributes
/// almost nothing while overlapping neighbors push at full strength.
pub(crate) fn separation(
    agent: AgentId,
    position: Vec2,
    siblings: &AgentView,
    radius: f32,
    max_step: f32,
) -> Vec2 {
    if radius <= 0.0 || max_step <= 0.0 {
        return Vec2::ZERO;
    }

    let mut push = Vec2::ZERO;
    for other in siblings.living_except(agent) {
        let away = position - other.position.to_vec2();
        let distance = away.length();
        if distance >= radius || distance <= f32::EPSILON {
            continue;
        }
        push += away / distance * (1.0 - distance / radius);
    }

    let strength = push.length();
    if strength <= f32::EPSILON {
        return Vec2::ZERO;
    }

    push / strength * strength.min(1.0) * max_step
}
