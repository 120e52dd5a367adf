//! Tunables for the motion controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters shared by every agent driven by the motion controller.
///
/// Distances are measured in pixels, speeds in pixels per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Travel speed.
    pub speed: f32,
    /// Collision radius.
    pub radius: f32,
    /// Distance at which an intermediate waypoint counts as reached.
    pub waypoint_reach: f32,
    /// Distance at which the final waypoint counts as reached.
    pub arrival_reach: f32,
    /// Separation neighborhood expressed as a multiple of the collision radius.
    pub separation_radius_factor: f32,
    /// Strongest separation push as a fraction of normal speed.
    pub separation_strength: f32,
    /// Radius of the sampled collision ring as a fraction of the collision radius.
    pub collision_ring_factor: f32,
    /// Displacement below which the agent counts as standing still.
    pub standstill_epsilon: f32,
    /// Standing-still time after which the path is cancelled or a waypoint skipped.
    #[serde(with = "seconds")]
    pub standstill_threshold: Duration,
    /// Distance to the destination within which a standing-still agent counts as arrived.
    pub arrival_tolerance: f32,
    /// Minimum decrease in waypoint distance that counts as progress.
    pub stuck_epsilon: f32,
    /// Time without progress after which the current waypoint is skipped.
    #[serde(with = "seconds")]
    pub stuck_threshold: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 120.0,
            radius: 10.0,
            waypoint_reach: 8.0,
            arrival_reach: 2.0,
            separation_radius_factor: 2.5,
            separation_strength: 0.4,
            collision_ring_factor: 0.8,
            standstill_epsilon: 1.0,
            standstill_threshold: Duration::from_millis(1000),
            arrival_tolerance: 48.0,
            stuck_epsilon: 0.5,
            stuck_threshold: Duration::from_millis(1500),
        }
    }
}

impl MotionConfig {
    /// Radius of the neighborhood that contributes separation steering.
    #[must_use]
    pub fn separation_radius(&self) -> f32 {
        self.radius * self.separation_radius_factor
    }

    /// Radius of the ring sampled against the obstacle field.
    #[must_use]
    pub fn collision_ring_radius(&self) -> f32 {
        self.radius * self.collision_ring_factor
    }
}

/// Serialises durations as fractional seconds.
mod seconds {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_radii_scale_with_collision_radius() {
        let config = MotionConfig {
            radius: 8.0,
            ..MotionConfig::default()
        };

        assert!((config.separation_radius() - 20.0).abs() < f32::EPSILON);
        assert!((config.collision_ring_radius() - 6.4).abs() < 1e-5);
    }
}
