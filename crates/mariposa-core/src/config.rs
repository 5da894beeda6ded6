//! Engine tunables.

use crate::snap::SnapMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Snap distance in world units. Not scaled by zoom.
pub const SNAP_THRESHOLD: f64 = 8.0;
/// Extra length added to both ends of a guide line.
pub const GUIDE_MARGIN: f64 = 20.0;
/// Maximum number of undo entries kept.
pub const HISTORY_CAPACITY: usize = 50;
/// Spacing between cells of a tidied grid.
pub const TIDY_GAP: f64 = 16.0;
/// Height of the coarse row buckets used to order items before tidying.
pub const TIDY_ROW_BUCKET: f64 = 100.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Allowed range of a numeric tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Range {
    Finite,
    NonNegative,
    Positive,
}

impl Range {
    fn accepts(self, value: f64) -> bool {
        value.is_finite()
            && match self {
                Range::Finite => true,
                Range::NonNegative => value >= 0.0,
                Range::Positive => value > 0.0,
            }
    }
}

/// Tunables for the canvas engine. Every field has a default so partial
/// JSON files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub snap_mode: SnapMode,
    pub snap_threshold: f64,
    pub guide_margin: f64,
    pub grid_size: f64,
    pub history_capacity: usize,
    pub tidy_gap: f64,
    pub tidy_row_bucket: f64,
    pub long_press_ms: u64,
    pub long_press_tolerance: f64,
    pub pinch_threshold: f64,
    pub two_finger_tap_ms: u64,
    pub text_debounce_ms: u64,
    /// Offset applied by "duplicate in place".
    pub duplicate_offset: f64,
    pub min_item_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snap_mode: SnapMode::Guides,
            snap_threshold: SNAP_THRESHOLD,
            guide_margin: GUIDE_MARGIN,
            grid_size: crate::snap::GRID_SIZE,
            history_capacity: HISTORY_CAPACITY,
            tidy_gap: TIDY_GAP,
            tidy_row_bucket: TIDY_ROW_BUCKET,
            long_press_ms: 500,
            long_press_tolerance: 10.0,
            pinch_threshold: 30.0,
            two_finger_tap_ms: 300,
            text_debounce_ms: 300,
            duplicate_offset: 20.0,
            min_item_size: 20.0,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults; out of
    /// range values are rejected.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn tunables_mut(&mut self) -> [(&'static str, &mut f64, Range); 9] {
        [
            ("snap_threshold", &mut self.snap_threshold, Range::NonNegative),
            ("guide_margin", &mut self.guide_margin, Range::NonNegative),
            ("grid_size", &mut self.grid_size, Range::Positive),
            ("tidy_gap", &mut self.tidy_gap, Range::NonNegative),
            ("tidy_row_bucket", &mut self.tidy_row_bucket, Range::Positive),
            ("long_press_tolerance", &mut self.long_press_tolerance, Range::NonNegative),
            ("pinch_threshold", &mut self.pinch_threshold, Range::NonNegative),
            ("duplicate_offset", &mut self.duplicate_offset, Range::Finite),
            ("min_item_size", &mut self.min_item_size, Range::NonNegative),
        ]
    }

    /// Check every numeric tunable against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut copy = self.clone();
        for (field, value, range) in copy.tunables_mut() {
            if !range.accepts(*value) {
                return Err(ConfigError::OutOfRange { field, value: *value });
            }
        }
        Ok(())
    }

    /// Replace out of range tunables with their defaults.
    pub fn sanitized(mut self) -> Self {
        let mut defaults = Self::default();
        for ((field, value, range), (_, default, _)) in self.tunables_mut().into_iter().zip(defaults.tunables_mut()) {
            if !range.accepts(*value) {
                log::warn!("Invalid {} {}, using {}", field, value, default);
                *value = *default;
            }
        }
        self
    }

    /// Read and parse a config file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn two_finger_tap(&self) -> Duration {
        Duration::from_millis(self.two_finger_tap_ms)
    }

    pub fn text_debounce(&self) -> Duration {
        Duration::from_millis(self.text_debounce_ms)
    }
}
