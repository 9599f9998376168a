use crate::reading::{convert_temperature, DiskReading, ReadingStatus, TemperatureUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One rendered line of direct-mode output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectLine {
    pub text: String,
    pub stream: OutputStream,
    /// Set for `ERR` readings; the process exits non-zero if any line has it.
    pub hard_error: bool,
}

impl DirectLine {
    fn stdout(text: String) -> Self {
        Self {
            text,
            stream: OutputStream::Stdout,
            hard_error: false,
        }
    }

    fn stderr(text: String, hard_error: bool) -> Self {
        Self {
            text,
            stream: OutputStream::Stderr,
            hard_error,
        }
    }
}

pub fn render_direct(
    reading: &DiskReading,
    numeric: bool,
    quiet: bool,
    unit: TemperatureUnit,
) -> DirectLine {
    let drive = reading.drive();
    let model = reading.model();

    if let Some(temp_c) = reading.temperature_c() {
        let value = convert_temperature(temp_c, unit);
        if numeric {
            return DirectLine::stdout(format!("{}\n", value));
        }
        return DirectLine::stdout(format!("{}: {}: {}\u{00B0}{}\n", drive, model, value, unit));
    }

    if numeric && quiet {
        return DirectLine::stdout("0\n".to_string());
    }

    match reading.status() {
        ReadingStatus::Sleeping => {
            DirectLine::stderr(format!("{}: {}: drive is sleeping\n", drive, model), false)
        }
        ReadingStatus::NoSensor | ReadingStatus::Unknown => {
            DirectLine::stderr(format!("{}: {}: no sensor\n", drive, model), false)
        }
        ReadingStatus::NotApplicable => {
            DirectLine::stderr(format!("{}: {}: not supported\n", drive, model), false)
        }
        ReadingStatus::Known | ReadingStatus::Error => {
            let detail = if reading.detail().is_empty() {
                "temperature query failed"
            } else {
                reading.detail()
            };
            DirectLine::stderr(format!("{}: {}: {}\n", drive, model, detail), true)
        }
    }
}
