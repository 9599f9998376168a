use hddtemp_core::{DeviceSpec, DiskReading};
use serde_json::Value;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

pub mod classify;

pub use classify::{
    classify, extract_model, extract_temperature_c, gather_messages, infer_status,
    normalize_temp_c,
};

pub const DEFAULT_PROGRAM: &str = "smartctl";
pub const PROGRAM_ENV: &str = "HDDTEMP_SMARTCTL";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const NOT_FOUND_DETAIL: &str = "smartctl not found (install smartmontools)";
const TIMED_OUT_DETAIL: &str = "smartctl timed out";
const INVALID_OUTPUT_DETAIL: &str = "invalid smartctl output";

/// Outcome of one smartctl run, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Report { payload: Value, stderr: String },
    NotFound,
    TimedOut,
    Unparseable(String),
    Failed(String),
}

impl Invocation {
    pub fn into_reading(self, drive: &str) -> DiskReading {
        match self {
            Invocation::Report { payload, stderr } => classify(drive, &payload, &stderr),
            Invocation::NotFound => DiskReading::failure(drive, NOT_FOUND_DETAIL),
            Invocation::TimedOut => DiskReading::failure(drive, TIMED_OUT_DETAIL),
            Invocation::Unparseable(detail) | Invocation::Failed(detail) => {
                DiskReading::failure(drive, detail)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Smartctl {
    program: PathBuf,
    timeout: Duration,
}

impl Default for Smartctl {
    fn default() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }
}

impl Smartctl {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Uses `HDDTEMP_SMARTCTL` when set, otherwise `smartctl` from `PATH`.
    pub fn from_env() -> Self {
        match std::env::var_os(PROGRAM_ENV) {
            Some(program) if !program.is_empty() => Self::with_program(program),
            _ => Self::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn args(spec: &DeviceSpec, wake_up: bool) -> Vec<String> {
        let mut args = vec!["-a".to_string(), "-j".to_string()];
        if let Some(bus_type) = spec.bus_type {
            args.push("-d".to_string());
            args.push(bus_type.smartctl_code().to_string());
        }
        if !wake_up {
            args.push("-n".to_string());
            args.push("standby".to_string());
        }
        args.push(spec.drive.clone());
        args
    }

    pub fn read(&self, spec: &DeviceSpec, wake_up: bool) -> DiskReading {
        self.invoke(spec, wake_up).into_reading(&spec.drive)
    }

    pub fn invoke(&self, spec: &DeviceSpec, wake_up: bool) -> Invocation {
        let args = Self::args(spec, wake_up);
        tracing::debug!(program = %self.program.display(), ?args, "running smartctl");

        let output = match self.execute(&args) {
            Ok(Some(output)) => output,
            Ok(None) => {
                tracing::warn!(drive = %spec.drive, timeout = ?self.timeout, "smartctl timed out");
                return Invocation::TimedOut;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(program = %self.program.display(), "smartctl not found");
                return Invocation::NotFound;
            }
            Err(err) => {
                tracing::warn!(drive = %spec.drive, error = %err, "failed to run smartctl");
                return Invocation::Failed(format!("failed to run smartctl: {}", err));
            }
        };

        parse_report(&output.stdout, output.stderr)
    }

    /// Runs the tool to completion or until the deadline. `Ok(None)` means timed out.
    fn execute(&self, args: &[String]) -> io::Result<Option<CapturedOutput>> {
        let deadline = Instant::now() + self.timeout;
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout_rx = child.stdout.take().map(drain_in_background);
        let stderr_rx = child.stderr.take().map(drain_in_background);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "smartctl exited");
                    break;
                }
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(None);
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(err);
                }
            }
        }

        // A grandchild may still hold the pipes open; never wait past the deadline.
        let Some(stdout) = collect(stdout_rx, deadline) else {
            return Ok(None);
        };
        let Some(stderr) = collect(stderr_rx, deadline) else {
            return Ok(None);
        };
        Ok(Some(CapturedOutput { stdout, stderr }))
    }
}

#[derive(Debug)]
struct CapturedOutput {
    stdout: String,
    stderr: String,
}

fn drain_in_background<R: Read + Send + 'static>(mut reader: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(rx: Option<mpsc::Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = rx else {
        return Some(String::new());
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(text) => Some(text),
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
    }
}

/// Parses smartctl's JSON stdout. Blank output is an empty report.
fn parse_report(stdout: &str, stderr: String) -> Invocation {
    if stdout.trim().is_empty() {
        return Invocation::Report {
            payload: Value::Object(Default::default()),
            stderr,
        };
    }
    match serde_json::from_str::<Value>(stdout) {
        Ok(payload) if payload.is_object() => Invocation::Report { payload, stderr },
        Ok(_) | Err(_) => {
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|text| !text.is_empty())
                .unwrap_or(INVALID_OUTPUT_DETAIL)
                .to_string();
            tracing::warn!(%detail, "unparseable smartctl output");
            Invocation::Unparseable(detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hddtemp_core::{parse_device_spec, ReadingStatus};

    fn init_test_logging() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn args_include_type_and_standby_guard() {
        let spec = parse_device_spec("SATA:/dev/sda");
        assert_eq!(
            Smartctl::args(&spec, false),
            vec!["-a", "-j", "-d", "sat", "-n", "standby", "/dev/sda"]
        );
        let plain = parse_device_spec("/dev/nvme0");
        assert_eq!(Smartctl::args(&plain, true), vec!["-a", "-j", "/dev/nvme0"]);
    }

    #[test]
    fn blank_stdout_is_an_empty_report() {
        let invocation = parse_report("  \n", "Device is in STANDBY mode".to_string());
        let reading = invocation.into_reading("/dev/sda");
        assert_eq!(reading.status(), ReadingStatus::Sleeping);
        assert_eq!(reading.model(), "/dev/sda");
    }

    #[test]
    fn unparseable_output_prefers_stderr_then_stdout() {
        assert_eq!(
            parse_report("garbage", " boom \n".to_string()),
            Invocation::Unparseable("boom".to_string())
        );
        assert_eq!(
            parse_report("garbage", String::new()),
            Invocation::Unparseable("garbage".to_string())
        );
        assert_eq!(
            parse_report("[1, 2]", String::new()),
            Invocation::Unparseable("[1, 2]".to_string())
        );
    }

    #[test]
    fn failures_become_error_readings() {
        let reading = Invocation::NotFound.into_reading("/dev/sda");
        assert_eq!(reading.status(), ReadingStatus::Error);
        assert_eq!(reading.detail(), NOT_FOUND_DETAIL);

        let reading = Invocation::TimedOut.into_reading("/dev/sda");
        assert_eq!(reading.detail(), TIMED_OUT_DETAIL);
        assert_eq!(reading.temperature_c(), None);
    }

    #[test]
    fn missing_program_reports_not_found() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let smartctl = Smartctl::with_program(dir.path().join("no-such-smartctl"));
        let spec = parse_device_spec("/dev/sda");
        assert_eq!(smartctl.invoke(&spec, false), Invocation::NotFound);
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn write_script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("smartctl");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path
        }

        #[test]
        fn reads_temperature_from_tool_output() {
            init_test_logging();
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(
                dir.path(),
                r#"echo '{"model_name": "DiskA", "temperature": {"current": 36}}'
exit 4"#,
            );
            let reading = Smartctl::with_program(script).read(&parse_device_spec("/dev/sda"), false);
            assert_eq!(reading.status(), ReadingStatus::Known);
            assert_eq!(reading.temperature_c(), Some(36));
            assert_eq!(reading.model(), "DiskA");
        }

        #[test]
        fn forwards_device_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(
                dir.path(),
                r#"printf '{"smartctl": {"messages": [{"string": "%s"}]}}' "$*""#,
            );
            let reading = Smartctl::with_program(script).read(&parse_device_spec("NVME:/dev/nvme0"), true);
            assert_eq!(reading.status(), ReadingStatus::NoSensor);
            assert_eq!(reading.detail(), "-a -j -d nvme /dev/nvme0");
        }

        #[test]
        fn slow_tool_is_killed_at_timeout() {
            init_test_logging();
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "sleep 5");
            let smartctl = Smartctl::with_program(script).with_timeout(Duration::from_millis(200));
            let started = Instant::now();
            let reading = smartctl.read(&parse_device_spec("/dev/sda"), false);
            assert!(started.elapsed() < Duration::from_secs(3));
            assert_eq!(reading.status(), ReadingStatus::Error);
            assert_eq!(reading.detail(), TIMED_OUT_DETAIL);
        }

        #[test]
        fn background_child_holding_pipes_cannot_outlast_timeout() {
            init_test_logging();
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(
                dir.path(),
                r#"sleep 3 &
echo '{"temperature": {"current": 36}}'"#,
            );
            let smartctl = Smartctl::with_program(script).with_timeout(Duration::from_millis(300));
            let started = Instant::now();
            let reading = smartctl.read(&parse_device_spec("/dev/sda"), false);
            assert!(started.elapsed() < Duration::from_secs(1));
            assert_eq!(reading.status(), ReadingStatus::Error);
            assert_eq!(reading.detail(), TIMED_OUT_DETAIL);
        }

        #[test]
        fn garbage_output_uses_stderr_as_detail() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "echo 'not json'; echo 'Smartctl open device failed' >&2");
            let reading = Smartctl::with_program(script).read(&parse_device_spec("/dev/sdb"), false);
            assert_eq!(reading.status(), ReadingStatus::Error);
            assert_eq!(reading.detail(), "Smartctl open device failed");
        }
    }
}
