use crate::ReadingSource;
use hddtemp_core::{DeviceSpec, DiskReading};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A complete batch of readings in device order. Never mutated once shared.
pub type Snapshot = Arc<[DiskReading]>;

struct CacheState {
    last_refresh: Option<Instant>,
    readings: Snapshot,
}

/// Latest readings for every configured device, refreshed as one batch at
/// most once per `min_interval`.
///
/// The refresh runs while the lock is held, so callers arriving during a
/// refresh wait for it and then share its result instead of polling the
/// drives again.
pub struct ReadingCache<S> {
    source: S,
    devices: Vec<DeviceSpec>,
    wake_up: bool,
    min_interval: Duration,
    state: Mutex<CacheState>,
}

impl<S: ReadingSource> ReadingCache<S> {
    pub fn new(source: S, devices: Vec<DeviceSpec>, wake_up: bool, min_interval: Duration) -> Self {
        Self {
            source,
            devices,
            wake_up,
            min_interval,
            state: Mutex::new(CacheState {
                last_refresh: None,
                readings: Arc::from(Vec::new()),
            }),
        }
    }

    pub fn devices(&self) -> &[DeviceSpec] {
        &self.devices
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn get(&self) -> Snapshot {
        // A panic inside a source leaves the previous batch in place, so a
        // poisoned lock still guards a complete snapshot.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let due = match state.last_refresh {
            None => true,
            Some(at) => now.duration_since(at) >= self.min_interval,
        };
        if due {
            state.readings = self.poll_all();
            state.last_refresh = Some(now);
            tracing::info!(
                devices = self.devices.len(),
                elapsed_ms = now.elapsed().as_millis() as u64,
                "refreshed disk readings"
            );
        }
        Arc::clone(&state.readings)
    }

    fn poll_all(&self) -> Snapshot {
        self.devices
            .iter()
            .map(|device| self.source.read(device, self.wake_up))
            .collect()
    }
}
