use hddtemp_core::{DeviceSpec, DiskReading};
use hddtemp_smartctl::Smartctl;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod cache;
mod format;
mod server;

pub use cache::{ReadingCache, Snapshot};
pub use format::format_daemon_payload;
pub use server::Server;

/// Produces one reading per device. The daemon polls through this so the
/// cache never depends on smartctl directly.
pub trait ReadingSource: Send + Sync {
    fn read(&self, spec: &DeviceSpec, wake_up: bool) -> DiskReading;
}

impl ReadingSource for Smartctl {
    fn read(&self, spec: &DeviceSpec, wake_up: bool) -> DiskReading {
        Smartctl::read(self, spec, wake_up)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("listener setup failed: {0}")]
    Listener(#[source] std::io::Error),
}

/// Cancellation flag observed by the accept loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
