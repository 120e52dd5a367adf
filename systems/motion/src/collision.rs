//! Static and dynamic collision checks with slide recovery.

use std::f32::consts::FRAC_PI_4;

use glam::Vec2;
use waypath_core::{AgentId, AgentView, ObstacleField, WorldPosition};

/// Number of points sampled on the collision ring.
const RING_SAMPLES: u32 = 8;

/// Deflections tried after the axis slides, in radians (about 17 and 34 degrees).
const DEFLECTIONS: [f32; 4] = [0.3, -0.3, 0.6, -0.6];

/// Everything a candidate position is tested against during one step.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CollisionProbe<'a> {
    pub(crate) agent: AgentId,
    pub(crate) origin: Vec2,
    pub(crate) radius: f32,
    pub(crate) ring_radius: f32,
    pub(crate) field: &'a ObstacleField,
    pub(crate) siblings: &'a AgentView,
}

impl CollisionProbe<'_> {
    /// Reports whether the agent may move its center to `candidate`.
    ///
    /// The center and eight ring points must sit on walkable tiles, and the
    /// agent's circle may not overlap a living sibling. An agent that already
    /// overlaps a sibling may still move away from it.
    pub(crate) fn is_clear(&self, candidate: Vec2) -> bool {
        self.clear_of_obstacles(candidate) && self.clear_of_agents(candidate)
    }

    /// Tries the axis slides, the half step and the deflected headings in
    /// order and returns the first clear position.
    pub(crate) fn recover(&self, desired: Vec2) -> Option<Vec2> {
        let mut attempts = [Vec2::ZERO; 3 + DEFLECTIONS.len()];
        attempts[0] = Vec2::new(desired.x, 0.0);
        attempts[1] = Vec2::new(0.0, desired.y);
        attempts[2] = desired * 0.5;
        for (slot, angle) in attempts[3..].iter_mut().zip(DEFLECTIONS) {
            *slot = rotate(desired, angle);
        }

        attempts
            .into_iter()
            .filter(|offset| offset.length_squared() > f32::EPSILON)
            .map(|offset| self.origin + offset)
            .find(|candidate| self.is_clear(*candidate))
    }

    fn clear_of_obstacles(&self, candidate: Vec2) -> bool {
        if !self.field.is_walkable_at(WorldPosition::from(candidate)) {
            return false;
        }

        (0..RING_SAMPLES).all(|sample| {
            let angle = sample as f32 * FRAC_PI_4;
            let point = candidate + Vec2::new(angle.cos(), angle.sin()) * self.ring_radius;
            self.field.is_walkable_at(WorldPosition::from(point))
        })
    }

    fn clear_of_agents(&self, candidate: Vec2) -> bool {
        self.siblings.living_except(self.agent).all(|other| {
            let center = other.position.to_vec2();
            let limit = self.radius + other.radius;
            let after = candidate.distance(center);
            if after >= limit {
                return true;
            }
            after > self.origin.distance(center)
        })
    }
}

fn rotate(vector: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(
        vector.x * cos - vector.y * sin,
        vector.x * sin + vector.y * cos,
    )
}
