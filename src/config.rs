use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_SIDEREAL_RATE_DEG_PER_HOUR: f64 = 15.04107;
pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;
pub const DEFAULT_STEP: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} = {value} is out of range, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("invalid station coordinates: {0:?}")]
    Coordinates(String),
}

/// Constants and scan settings shared by the propagator and the pass finder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_earth_radius_km")]
    pub earth_radius_km: f64,
    #[serde(default = "default_sidereal_rate")]
    pub sidereal_rate_deg_per_hour: f64,
    #[serde(default = "default_min_elevation")]
    pub min_elevation_deg: f64,
    #[serde(default = "default_step", deserialize_with = "deserialize_duration")]
    pub step: Duration,
    #[serde(default = "default_horizon", deserialize_with = "deserialize_duration")]
    pub horizon: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: DEFAULT_EARTH_RADIUS_KM,
            sidereal_rate_deg_per_hour: DEFAULT_SIDEREAL_RATE_DEG_PER_HOUR,
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
            step: DEFAULT_STEP,
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.earth_radius_km.is_finite() && self.earth_radius_km > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "earth_radius_km",
                value: self.earth_radius_km,
                expected: "> 0",
            });
        }
        if !self.sidereal_rate_deg_per_hour.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "sidereal_rate_deg_per_hour",
                value: self.sidereal_rate_deg_per_hour,
                expected: "a finite number",
            });
        }
        validate_min_elevation(self.min_elevation_deg)?;
        validate_positive("step_minutes", self.step_minutes())?;
        validate_positive("horizon_hours", self.horizon_hours())?;
        Ok(())
    }

    pub fn step_minutes(&self) -> f64 {
        self.step.as_secs_f64() / 60.0
    }

    pub fn horizon_hours(&self) -> f64 {
        self.horizon.as_secs_f64() / 3600.0
    }
}

pub(crate) fn validate_min_elevation(value: f64) -> Result<(), ConfigError> {
    if (-90.0..=90.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: "min_elevation_deg",
            value,
            expected: "[-90, 90]",
        })
    }
}

pub(crate) fn validate_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "> 0",
        })
    }
}

fn default_earth_radius_km() -> f64 {
    DEFAULT_EARTH_RADIUS_KM
}

fn default_sidereal_rate() -> f64 {
    DEFAULT_SIDEREAL_RATE_DEG_PER_HOUR
}

fn default_min_elevation() -> f64 {
    DEFAULT_MIN_ELEVATION_DEG
}

fn default_step() -> Duration {
    DEFAULT_STEP
}

fn default_horizon() -> Duration {
    DEFAULT_HORIZON
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: Option<StationConfig>,
    #[serde(default)]
    pub predict: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    /// "latitude,longitude" in degrees.
    pub coordinates: String,
    pub altitude_m: f64,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.predict.validate()?;
        Ok(config)
    }
}
