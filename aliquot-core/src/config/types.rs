//! Configuration type definitions

use aliquot_protocol::ApiVersion;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engines at or above this API level keep the last location per mount
pub const PER_MOUNT_LOCATION_SINCE: ApiVersion = ApiVersion::new(2, 10);

/// Default API level of a new engine
pub const DEFAULT_API_VERSION: ApiVersion = ApiVersion::new(2, 13);

/// Errors from configuration parsing and validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a config
    #[error("invalid engine config: {0}")]
    Parse(alloc::string::String),
    /// A clearance margin is negative or not finite
    #[error("motion margin `{0}` must be a finite, non-negative distance")]
    InvalidMargin(&'static str),
    /// The minimum margin exceeds one of the regular margins
    #[error("minimum labware margin exceeds the regular margins")]
    MinimumMarginTooLarge,
}

/// Clearance margins used by the motion planner, in mm
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct MotionConfig {
    /// Clearance when moving between wells of the same labware
    pub well_z_margin: f64,
    /// Clearance when moving between different labware
    pub labware_z_margin: f64,
    /// Smallest clearance accepted when the regular margin does not fit
    /// under the instrument's maximum height
    pub minimum_labware_z_margin: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            well_z_margin: 5.0,
            labware_z_margin: 10.0,
            minimum_labware_z_margin: 1.0,
        }
    }
}

impl MotionConfig {
    /// Check every margin is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let margins = [
            ("well_z_margin", self.well_z_margin),
            ("labware_z_margin", self.labware_z_margin),
            ("minimum_labware_z_margin", self.minimum_labware_z_margin),
        ];
        for (name, value) in margins {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidMargin(name));
            }
        }
        if self.minimum_labware_z_margin > self.well_z_margin.min(self.labware_z_margin) {
            return Err(ConfigError::MinimumMarginTooLarge);
        }
        Ok(())
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct EngineConfig {
    /// API level the engine runs at
    pub api_version: ApiVersion,
    /// Keep running after a failed command (resource exhaustion still halts)
    pub continue_on_error: bool,
    /// Pause the run when the door opens
    pub door_safety_enabled: bool,
    pub motion: MotionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION,
            continue_on_error: false,
            door_safety_enabled: true,
            motion: MotionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Whether the last-location cache is tracked per mount
    pub fn location_cache_per_mount(&self) -> bool {
        self.api_version >= PER_MOUNT_LOCATION_SINCE
    }

    /// Check the whole config is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motion.validate()
    }

    /// Parse and validate a TOML config
    ///
    /// Missing keys take their default values.
    #[cfg(feature = "serde")]
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        use alloc::string::ToString;

        let config: EngineConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
