use crate::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadingStatus {
    #[serde(rename = "KNOWN")]
    Known,
    #[serde(rename = "NOS")]
    NoSensor,
    #[serde(rename = "UNK")]
    Unknown,
    #[serde(rename = "NA")]
    NotApplicable,
    #[serde(rename = "SLP")]
    Sleeping,
    #[serde(rename = "ERR")]
    Error,
}

impl ReadingStatus {
    pub fn code(self) -> &'static str {
        match self {
            ReadingStatus::Known => "KNOWN",
            ReadingStatus::NoSensor => "NOS",
            ReadingStatus::Unknown => "UNK",
            ReadingStatus::NotApplicable => "NA",
            ReadingStatus::Sleeping => "SLP",
            ReadingStatus::Error => "ERR",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One device's result from a single smartctl invocation.
///
/// A temperature is present exactly when the status is [`ReadingStatus::Known`];
/// the constructors are the only way to build a reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskReading {
    drive: String,
    model: String,
    status: ReadingStatus,
    temperature_c: Option<i32>,
    detail: String,
}

impl DiskReading {
    pub fn known(
        drive: impl Into<String>,
        model: impl Into<String>,
        temperature_c: i32,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            drive: drive.into(),
            model: model.into(),
            status: ReadingStatus::Known,
            temperature_c: Some(temperature_c),
            detail: detail.into(),
        }
    }

    /// A reading without a temperature. `Known` is downgraded to `Unknown`
    /// since there is no value to report.
    pub fn unavailable(
        drive: impl Into<String>,
        model: impl Into<String>,
        status: ReadingStatus,
        detail: impl Into<String>,
    ) -> Self {
        let status = match status {
            ReadingStatus::Known => ReadingStatus::Unknown,
            other => other,
        };
        Self {
            drive: drive.into(),
            model: model.into(),
            status,
            temperature_c: None,
            detail: detail.into(),
        }
    }

    /// Hard failure before any payload could be inspected; the model falls back to the path.
    pub fn failure(drive: impl Into<String>, detail: impl Into<String>) -> Self {
        let drive = drive.into();
        Self::unavailable(drive.clone(), drive, ReadingStatus::Error, detail)
    }

    pub fn drive(&self) -> &str {
        &self.drive
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn status(&self) -> ReadingStatus {
        self.status
    }

    pub fn temperature_c(&self) -> Option<i32> {
        self.temperature_c
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn code(self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Fahrenheit => 'F',
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "C" | "c" => Ok(TemperatureUnit::Celsius),
            "F" | "f" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(ConfigError::Unit(other.to_string())),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Converts a Celsius reading to the display unit, rounding to the nearest degree.
pub fn convert_temperature(temp_c: i32, unit: TemperatureUnit) -> i32 {
    match unit {
        TemperatureUnit::Celsius => temp_c,
        TemperatureUnit::Fahrenheit => (f64::from(temp_c) * 9.0 / 5.0 + 32.0).round() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(convert_temperature(30, TemperatureUnit::Fahrenheit), 86);
        assert_eq!(convert_temperature(0, TemperatureUnit::Fahrenheit), 32);
        assert_eq!(convert_temperature(-40, TemperatureUnit::Fahrenheit), -40);
        assert_eq!(convert_temperature(37, TemperatureUnit::Fahrenheit), 99);
        assert_eq!(convert_temperature(37, TemperatureUnit::Celsius), 37);
    }

    #[test]
    fn temperature_present_only_when_known() {
        let known = DiskReading::known("/dev/sda", "DiskA", 40, "");
        assert_eq!(known.status(), ReadingStatus::Known);
        assert_eq!(known.temperature_c(), Some(40));

        for status in [
            ReadingStatus::NoSensor,
            ReadingStatus::NotApplicable,
            ReadingStatus::Sleeping,
            ReadingStatus::Error,
        ] {
            let reading = DiskReading::unavailable("/dev/sda", "DiskA", status, "");
            assert_eq!(reading.status(), status);
            assert_eq!(reading.temperature_c(), None);
        }
    }

    #[test]
    fn known_without_value_becomes_unknown() {
        let reading = DiskReading::unavailable("/dev/sda", "DiskA", ReadingStatus::Known, "");
        assert_eq!(reading.status(), ReadingStatus::Unknown);
        assert_eq!(reading.temperature_c(), None);
    }

    #[test]
    fn failure_uses_drive_as_model() {
        let reading = DiskReading::failure("/dev/sdz", "smartctl timed out");
        assert_eq!(reading.model(), "/dev/sdz");
        assert_eq!(reading.status(), ReadingStatus::Error);
        assert_eq!(reading.detail(), "smartctl timed out");
    }

    #[test]
    fn parses_units() {
        assert_eq!("C".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Celsius));
        assert_eq!("f".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
        assert!(matches!("K".parse::<TemperatureUnit>(), Err(ConfigError::Unit(_))));
    }
}
