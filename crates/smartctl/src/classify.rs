//! Turns a parsed `smartctl -j` report into a [`DiskReading`].
//!
//! Every lookup is optional: smartctl emits different sections per
//! transport, and older builds omit fields entirely.

use hddtemp_core::{DiskReading, ReadingStatus};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Values above this are taken to be Kelvin.
const KELVIN_THRESHOLD: i64 = 200;
const KELVIN_OFFSET: i64 = 273;
const MIN_PLAUSIBLE_C: i64 = -80;
const MAX_PLAUSIBLE_C: i64 = 200;

/// ATA attribute IDs carrying a temperature, highest priority first.
const ATA_TEMPERATURE_IDS: [i64; 3] = [194, 190, 231];

const MODEL_POINTERS: [&str; 6] = [
    "/model_name",
    "/nvme_model_name",
    "/scsi_model_name",
    "/product",
    "/device/model_name",
    "/device/name",
];

pub fn classify(drive: &str, payload: &Value, stderr: &str) -> DiskReading {
    let model = extract_model(payload, drive);
    let messages = gather_messages(payload, stderr);
    let detail = messages.trim();

    match extract_temperature_c(payload) {
        Some(temp_c) => DiskReading::known(drive, model, temp_c, detail),
        None => {
            let status = infer_status(&messages);
            tracing::debug!(drive, status = %status, "no temperature in report");
            DiskReading::unavailable(drive, model, status, detail)
        }
    }
}

pub fn extract_temperature_c(payload: &Value) -> Option<i32> {
    pointer_temp(payload, "/temperature/current")
        .or_else(|| pointer_temp(payload, "/scsi_temperature/current"))
        .or_else(|| pointer_temp(payload, "/nvme_smart_health_information_log/temperature"))
        .or_else(|| ata_attribute_temp(payload))
}

fn pointer_temp(payload: &Value, pointer: &str) -> Option<i32> {
    payload.pointer(pointer).and_then(normalize_temp_c)
}

fn ata_attribute_temp(payload: &Value) -> Option<i32> {
    let table = payload
        .pointer("/ata_smart_attributes/table")
        .and_then(Value::as_array)?;

    for id in ATA_TEMPERATURE_IDS {
        for row in table {
            // smartctl writes integer ids, but `194.0` names the same attribute.
            if row.get("id").and_then(Value::as_f64) != Some(id as f64) {
                continue;
            }
            let temp = row
                .pointer("/raw/value")
                .and_then(normalize_temp_c)
                .or_else(|| row.get("value").and_then(normalize_temp_c));
            if temp.is_some() {
                return temp;
            }
        }
    }
    None
}

/// Parses a candidate value and rejects anything that cannot be a drive temperature.
pub fn normalize_temp_c(value: &Value) -> Option<i32> {
    let mut parsed = parse_int(value)?;
    if parsed > KELVIN_THRESHOLD {
        parsed -= KELVIN_OFFSET;
    }
    if !(MIN_PLAUSIBLE_C..=MAX_PLAUSIBLE_C).contains(&parsed) {
        return None;
    }
    i32::try_from(parsed).ok()
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => leading_integer()?
            .find(text)
            .and_then(|found| found.as_str().parse::<i64>().ok()),
        _ => None,
    }
}

fn leading_integer() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+").ok()).as_ref()
}

pub fn extract_model(payload: &Value, drive: &str) -> String {
    MODEL_POINTERS
        .iter()
        .filter_map(|pointer| payload.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .find(|model| !model.is_empty())
        .unwrap_or(drive)
        .to_string()
}

/// Joins `smartctl.messages[].string` and the tool's stderr, one per line.
pub fn gather_messages(payload: &Value, stderr: &str) -> String {
    let mut messages: Vec<&str> = payload
        .pointer("/smartctl/messages")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("string").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if !stderr.is_empty() {
        messages.push(stderr);
    }
    messages.join("\n")
}

/// Status for a report that yielded no temperature. Markers are checked in
/// priority order against the lower-cased message text.
pub fn infer_status(messages: &str) -> ReadingStatus {
    let lowered = messages.to_lowercase();
    let has = |marker: &str| lowered.contains(marker);

    if has("standby") || has("sleep") {
        return ReadingStatus::Sleeping;
    }
    if has("permission denied") || has("unable to open device") {
        return ReadingStatus::Error;
    }
    if has("no such device") || has("cannot open") {
        return ReadingStatus::Error;
    }
    if has("smart support is: unavailable") || has("unknown usb bridge") {
        return ReadingStatus::NotApplicable;
    }
    // Explicit "temperature ... not ..." tier; resolves the same as the fallback.
    if has("temperature") && has("not") {
        return ReadingStatus::NoSensor;
    }
    ReadingStatus::NoSensor
}
