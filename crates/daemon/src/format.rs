use hddtemp_core::{convert_temperature, DiskReading, ReadingStatus, TemperatureUnit};
use std::fmt::Write;

/// Renders readings in the hddtemp daemon wire format:
/// `|drive|model|value|unit|` per device, concatenated without newlines.
/// Devices without a temperature report their status code and `*` as unit.
pub fn format_daemon_payload(
    readings: &[DiskReading],
    separator: char,
    unit: TemperatureUnit,
) -> String {
    let mut payload = String::new();
    for reading in readings {
        let (value, unit_field) = match reading.temperature_c() {
            Some(temp_c) => (
                convert_temperature(temp_c, unit).to_string(),
                unit.code().to_string(),
            ),
            None => (status_field(reading.status()).to_string(), "*".to_string()),
        };
        let _ = write!(
            payload,
            "{sep}{}{sep}{}{sep}{}{sep}{}{sep}",
            reading.drive(),
            reading.model(),
            value,
            unit_field,
            sep = separator,
        );
    }
    payload
}

fn status_field(status: ReadingStatus) -> &'static str {
    match status {
        ReadingStatus::NotApplicable
        | ReadingStatus::Unknown
        | ReadingStatus::NoSensor
        | ReadingStatus::Sleeping
        | ReadingStatus::Error => status.code(),
        ReadingStatus::Known => ReadingStatus::Error.code(),
    }
}
