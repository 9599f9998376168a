use serde::Serialize;
use time::format_description::well_known::Rfc3339;

mod device;
mod direct;
mod reading;

pub use device::{parse_device_spec, BusType, DeviceSpec};
pub use direct::{render_direct, DirectLine, OutputStream};
pub use reading::{convert_temperature, DiskReading, ReadingStatus, TemperatureUnit};

pub const DEFAULT_PORT: u16 = 7634;
pub const DEFAULT_SEPARATOR: char = '|';
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 60;
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("separator must be exactly one character, got {0:?}")]
    Separator(String),
    #[error("unsupported temperature unit {0:?} (expected C or F)")]
    Unit(String),
    #[error("port must be between 1 and 65535")]
    Port,
    #[error("min-interval must be >= 1 second")]
    MinInterval,
}

/// Checks that a user supplied separator is a single character.
pub fn parse_separator(value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(ConfigError::Separator(value.to_string())),
    }
}

pub fn validate_port(port: u16) -> Result<u16, ConfigError> {
    if port == 0 {
        return Err(ConfigError::Port);
    }
    Ok(port)
}

pub fn validate_min_interval(secs: u64) -> Result<u64, ConfigError> {
    if secs < 1 {
        return Err(ConfigError::MinInterval);
    }
    Ok(secs)
}

/// JSON rendering of one direct-mode run.
#[derive(Debug, Serialize, Clone)]
pub struct ReadingReport {
    pub schema_version: String,
    pub generated_at_utc: String,
    pub unit: TemperatureUnit,
    pub readings: Vec<DiskReading>,
}

impl ReadingReport {
    pub fn new(unit: TemperatureUnit, readings: Vec<DiskReading>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at_utc: now_utc_rfc3339(),
            unit,
            readings,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.readings
            .iter()
            .any(|reading| reading.status() == ReadingStatus::Error)
    }
}

pub fn now_utc_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
