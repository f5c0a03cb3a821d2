//! Player configuration.

use serde::{Deserialize, Serialize};

/// Configuration for sync-profile sizing and playback-speed limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of distinct events a tree sync profile holds per tick.
    /// Submissions of further events are dropped with a warning.
    pub max_sync_points: usize,

    /// Lower bound applied to playback speeds produced by synchronization.
    /// Keeps a node that sits exactly on its sync point from freezing.
    pub min_playback_speed: f32,

    /// Upper bound applied to playback speeds produced by synchronization.
    pub max_playback_speed: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_sync_points: 32,
            min_playback_speed: 0.05,
            max_playback_speed: 8.0,
        }
    }
}

impl Config {
    /// Clamps a synchronized speed into the configured range. Never panics:
    /// a NaN bound is ignored and inverted bounds resolve to the upper one.
    #[inline]
    pub fn clamp_playback_speed(&self, speed: f32) -> f32 {
        if !speed.is_finite() {
            return 1.0;
        }
        speed
            .max(self.min_playback_speed)
            .min(self.max_playback_speed)
    }

    /// Whether the speed bounds are ordered and not NaN.
    pub fn has_valid_speed_range(&self) -> bool {
        self.min_playback_speed <= self.max_playback_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_speed_into_configured_range() {
        let cfg = Config::default();
        assert_eq!(cfg.clamp_playback_speed(0.0), 0.05);
        assert_eq!(cfg.clamp_playback_speed(100.0), 8.0);
        assert_eq!(cfg.clamp_playback_speed(1.25), 1.25);
        assert_eq!(cfg.clamp_playback_speed(f32::NAN), 1.0);
        assert!(cfg.has_valid_speed_range());
    }

    #[test]
    fn malformed_speed_range_does_not_panic() {
        let inverted = Config {
            min_playback_speed: 2.0,
            max_playback_speed: 1.0,
            ..Config::default()
        };
        assert!(!inverted.has_valid_speed_range());
        assert_eq!(inverted.clamp_playback_speed(1.5), 1.0);

        let nan_bounds = Config {
            min_playback_speed: f32::NAN,
            max_playback_speed: f32::NAN,
            ..Config::default()
        };
        assert!(!nan_bounds.has_valid_speed_range());
        assert_eq!(nan_bounds.clamp_playback_speed(1.5), 1.5);
    }
}
