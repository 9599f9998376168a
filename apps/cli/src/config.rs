use anyhow::Result;
use clap::{ArgAction, Parser};
use hddtemp_core::{
    parse_device_spec, parse_separator, validate_min_interval, validate_port, DeviceSpec,
    TemperatureUnit, DEFAULT_MIN_INTERVAL_SECS, DEFAULT_PORT,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hddtemp")]
#[command(version, about = "Minimal hddtemp-compatible utility using smartctl")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Drive paths, optional TYPE: prefix (SATA/PATA/ATA/SCSI/NVME)
    #[arg(required = true)]
    pub drives: Vec<String>,

    /// Run in TCP daemon mode (stays in the foreground)
    #[arg(short, long)]
    pub daemon: bool,

    /// Listen address in daemon mode
    #[arg(short, long, default_value = "0.0.0.0")]
    pub listen: String,

    /// TCP port in daemon mode
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Single-character field separator in daemon mode
    #[arg(short, long, default_value = "|")]
    pub separator: String,

    /// Print only the numeric temperature in direct mode
    #[arg(short, long)]
    pub numeric: bool,

    /// In numeric mode, print 0 for unreadable drives
    #[arg(short, long)]
    pub quiet: bool,

    /// Output unit (C or F)
    #[arg(short, long, default_value = "C")]
    pub unit: TemperatureUnit,

    /// Minimum seconds between drive polls in daemon mode
    #[arg(long, default_value_t = DEFAULT_MIN_INTERVAL_SECS)]
    pub min_interval: u64,

    /// Allow smartctl to wake sleeping drives
    #[arg(short, long)]
    pub wake_up: bool,

    /// Print a JSON report instead of text lines in direct mode
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum Mode {
    Direct(DirectSettings),
    Daemon(DaemonSettings),
}

#[derive(Debug, Clone)]
pub struct DirectSettings {
    pub numeric: bool,
    pub quiet: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub bind_addr: String,
    pub separator: char,
    pub min_interval: Duration,
}

/// Validated configuration handed to the run modes.
#[derive(Debug, Clone)]
pub struct Settings {
    pub devices: Vec<DeviceSpec>,
    pub unit: TemperatureUnit,
    pub wake_up: bool,
    pub mode: Mode,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let devices = cli.drives.iter().map(|raw| parse_device_spec(raw)).collect();
        let separator = parse_separator(&cli.separator)?;
        let port = validate_port(cli.port)?;
        let min_interval = validate_min_interval(cli.min_interval)?;

        let mode = if cli.daemon {
            if cli.numeric || cli.quiet || cli.json {
                tracing::warn!("--numeric, --quiet and --json only apply to direct mode; ignoring");
            }
            Mode::Daemon(DaemonSettings {
                bind_addr: bind_addr(&cli.listen, port),
                separator,
                min_interval: Duration::from_secs(min_interval),
            })
        } else {
            Mode::Direct(DirectSettings {
                numeric: cli.numeric,
                quiet: cli.quiet,
                json: cli.json,
            })
        };

        Ok(Self {
            devices,
            unit: cli.unit,
            wake_up: cli.wake_up,
            mode,
        })
    }
}

/// Joins host and port, bracketing bare IPv6 literals.
fn bind_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hddtemp_core::BusType;

    fn settings(args: &[&str]) -> Result<Settings> {
        let cli = Cli::try_parse_from(std::iter::once("hddtemp").chain(args.iter().copied()))?;
        Settings::from_cli(&cli)
    }

    #[test]
    fn direct_mode_defaults() {
        let settings = settings(&["SATA:/dev/sda", "/dev/sdb"]).unwrap();
        assert_eq!(settings.devices.len(), 2);
        assert_eq!(settings.devices[0].bus_type, Some(BusType::Sat));
        assert_eq!(settings.unit, TemperatureUnit::Celsius);
        assert!(!settings.wake_up);
        assert!(matches!(settings.mode, Mode::Direct(DirectSettings { numeric: false, .. })));
    }

    #[test]
    fn daemon_mode_collects_server_options() {
        let settings = settings(&[
            "-d", "-p", "7000", "-s", "#", "-u", "F", "--min-interval", "5", "/dev/sda",
        ])
        .unwrap();
        assert_eq!(settings.unit, TemperatureUnit::Fahrenheit);
        let Mode::Daemon(daemon) = settings.mode else {
            panic!("expected daemon mode");
        };
        assert_eq!(daemon.bind_addr, "0.0.0.0:7000");
        assert_eq!(daemon.separator, '#');
        assert_eq!(daemon.min_interval, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_daemon_options() {
        assert!(settings(&["-d", "-s", "||", "/dev/sda"]).is_err());
        assert!(settings(&["-d", "-p", "0", "/dev/sda"]).is_err());
        assert!(settings(&["-d", "--min-interval", "0", "/dev/sda"]).is_err());
        assert!(settings(&["-u", "K", "/dev/sda"]).is_err());
        assert!(settings(&[]).is_err());
    }

    #[test]
    fn rejects_invalid_options_in_direct_mode() {
        assert!(settings(&["-s", "||", "/dev/sda"]).is_err());
        assert!(settings(&["-p", "0", "/dev/sda"]).is_err());
        assert!(settings(&["--min-interval", "0", "/dev/sda"]).is_err());
        assert!(settings(&["-s", "||", "--min-interval", "0", "/dev/sda"]).is_err());
    }

    #[test]
    fn short_v_prints_version_and_verbose_is_long_only() {
        let err = Cli::try_parse_from(["hddtemp", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        let err = Cli::try_parse_from(["hddtemp", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let cli = Cli::try_parse_from(["hddtemp", "--verbose", "/dev/sda"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn direct_only_flags_are_ignored_in_daemon_mode() {
        let settings = settings(&["-d", "-n", "/dev/sda"]).unwrap();
        assert!(matches!(settings.mode, Mode::Daemon(_)));
    }

    #[test]
    fn ipv6_listen_address_is_bracketed() {
        assert_eq!(bind_addr("::", 7634), "[::]:7634");
        assert_eq!(bind_addr("[::1]", 7634), "[::1]:7634");
        assert_eq!(bind_addr("localhost", 7634), "localhost:7634");
    }
}
