use serde::Serialize;

/// Transport hint forwarded to smartctl as `-d <code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    Sat,
    Ata,
    Scsi,
    Nvme,
}

impl BusType {
    /// Maps a user facing prefix (`SATA`, `PATA`, `ATA`, `SCSI`, `NVME`) to a bus type.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_uppercase().as_str() {
            "SATA" => Some(BusType::Sat),
            "PATA" | "ATA" => Some(BusType::Ata),
            "SCSI" => Some(BusType::Scsi),
            "NVME" => Some(BusType::Nvme),
            _ => None,
        }
    }

    pub fn smartctl_code(self) -> &'static str {
        match self {
            BusType::Sat => "sat",
            BusType::Ata => "ata",
            BusType::Scsi => "scsi",
            BusType::Nvme => "nvme",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSpec {
    pub raw: String,
    pub drive: String,
    pub bus_type: Option<BusType>,
}

/// Parses `[TYPE:]path`. Anything that is not a known prefix followed by a
/// non-empty path is kept verbatim, so `C:\...` style paths survive.
pub fn parse_device_spec(raw: &str) -> DeviceSpec {
    let verbatim = || DeviceSpec {
        raw: raw.to_string(),
        drive: raw.to_string(),
        bus_type: None,
    };

    let Some((prefix, drive)) = raw.split_once(':') else {
        return verbatim();
    };
    match BusType::from_prefix(prefix) {
        Some(bus_type) if !drive.is_empty() => DeviceSpec {
            raw: raw.to_string(),
            drive: drive.to_string(),
            bus_type: Some(bus_type),
        },
        _ => verbatim(),
    }
}
