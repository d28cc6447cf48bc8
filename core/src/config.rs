//! Game configuration
//!
//! Deserializable so host binaries can read it from a JSON file; every
//! field has a default matching the original game's tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::error::MazeError;
use crate::{
    DEFAULT_COLS, DEFAULT_ROWS, MAX_MAZE_DIMENSION, MIN_TICK_INTERVAL_MS, RANDOM_BASE_INTERVAL_MS,
    RESUME_DELAY_MS, SMART_BASE_INTERVAL_MS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Maze rows at startup
    pub rows: usize,
    /// Maze columns at startup
    pub cols: usize,
    /// Seed for maze and exploration randomness; entropy when absent
    pub seed: Option<u64>,
    pub timing: TimingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            seed: None,
            timing: TimingConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), MazeError> {
        validate_dimensions(self.rows, self.cols)?;
        self.timing.validate()
    }
}

/// Agent timing, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub random_base_interval_ms: u64,
    pub smart_base_interval_ms: u64,
    /// Floor applied after dividing by the speed multiplier
    pub min_interval_ms: u64,
    pub resume_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            random_base_interval_ms: RANDOM_BASE_INTERVAL_MS,
            smart_base_interval_ms: SMART_BASE_INTERVAL_MS,
            min_interval_ms: MIN_TICK_INTERVAL_MS,
            resume_delay_ms: RESUME_DELAY_MS,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), MazeError> {
        if self.min_interval_ms == 0 {
            return Err(MazeError::InvalidTiming("min_interval_ms must be positive"));
        }
        if self.random_base_interval_ms == 0 || self.smart_base_interval_ms == 0 {
            return Err(MazeError::InvalidTiming("base intervals must be positive"));
        }
        Ok(())
    }

    /// Base interval for an agent kind at speed 1.0
    pub fn base_interval(&self, kind: AgentKind) -> Duration {
        match kind {
            AgentKind::Smart => Duration::from_millis(self.smart_base_interval_ms),
            AgentKind::Random | AgentKind::None => {
                Duration::from_millis(self.random_base_interval_ms)
            }
        }
    }

    /// `max(base / speed, floor)`
    pub fn tick_interval(&self, kind: AgentKind, speed_multiplier: f64) -> Duration {
        let floor = Duration::from_millis(self.min_interval_ms);
        // `as` saturates, so absurdly slow speeds clamp to u64::MAX nanoseconds
        let nanos = (self.base_interval(kind).as_nanos() as f64 / speed_multiplier).round() as u64;
        Duration::from_nanos(nanos).max(floor)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
}

/// Reject zero dimensions and dimensions above `MAX_MAZE_DIMENSION`
pub fn validate_dimensions(rows: usize, cols: usize) -> Result<(), MazeError> {
    if rows == 0 || cols == 0 || rows > MAX_MAZE_DIMENSION || cols > MAX_MAZE_DIMENSION {
        return Err(MazeError::InvalidDimensions { rows, cols });
    }
    Ok(())
}

/// Reject speed multipliers that are not positive finite numbers
pub fn validate_speed(factor: f64) -> Result<(), MazeError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(MazeError::InvalidSpeed(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert_eq!(config.rows, 10);
        assert_eq!(config.cols, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_interval_scales_and_floors() {
        let timing = TimingConfig::default();
        assert_eq!(timing.tick_interval(AgentKind::Random, 1.0), Duration::from_millis(200));
        assert_eq!(timing.tick_interval(AgentKind::Smart, 1.0), Duration::from_millis(150));
        assert_eq!(timing.tick_interval(AgentKind::Random, 2.0), Duration::from_millis(100));
        assert_eq!(timing.tick_interval(AgentKind::Smart, 1000.0), Duration::from_millis(10));
    }

    #[test]
    fn test_validation() {
        assert!(validate_dimensions(1, 1).is_ok());
        assert!(validate_dimensions(0, 3).is_err());
        assert!(validate_dimensions(3, MAX_MAZE_DIMENSION + 1).is_err());
        assert!(validate_speed(0.5).is_ok());
        assert!(validate_speed(0.0).is_err());
        assert!(validate_speed(-1.0).is_err());
        assert!(validate_speed(f64::NAN).is_err());

        let timing = TimingConfig {
            min_interval_ms: 0,
            ..TimingConfig::default()
        };
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "rows": 20, "timing": { "resume_delay_ms": 500 } }"#;
        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.rows, 20);
        assert_eq!(config.cols, DEFAULT_COLS);
        assert_eq!(config.timing.resume_delay_ms, 500);
        assert_eq!(config.timing.smart_base_interval_ms, SMART_BASE_INTERVAL_MS);
    }
}
