use crate::{format_daemon_payload, ReadingCache, ReadingSource, ServerError, ShutdownToken};
use hddtemp_core::TemperatureUnit;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP front of the daemon. Every connection gets the current payload and
/// is closed; nothing is read from the client.
pub struct Server<S> {
    listener: TcpListener,
    cache: Arc<ReadingCache<S>>,
    separator: char,
    unit: TemperatureUnit,
}

impl<S: ReadingSource + 'static> Server<S> {
    pub fn bind(
        addr: &str,
        cache: Arc<ReadingCache<S>>,
        separator: char,
        unit: TemperatureUnit,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        if let Ok(local) = listener.local_addr() {
            tracing::info!(%local, devices = cache.devices().len(), "listening");
        }
        Ok(Self {
            listener,
            cache,
            separator,
            unit,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` is cancelled, then waits for
    /// in-flight connections to finish.
    pub fn serve(&self, shutdown: &ShutdownToken) -> Result<(), ServerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(ServerError::Listener)?;

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        while !shutdown.is_cancelled() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    workers.retain(|worker| !worker.is_finished());
                    let cache = Arc::clone(&self.cache);
                    let separator = self.separator;
                    let unit = self.unit;
                    workers.push(thread::spawn(move || {
                        if let Err(err) = handle_connection(stream, &cache, separator, unit) {
                            tracing::debug!(%peer, error = %err, "client write failed");
                        }
                    }));
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!(in_flight = workers.len(), "shutting down");
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }
}

fn handle_connection<S: ReadingSource>(
    mut stream: TcpStream,
    cache: &ReadingCache<S>,
    separator: char,
    unit: TemperatureUnit,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    let snapshot = cache.get();
    let payload = format_daemon_payload(&snapshot, separator, unit);
    tracing::debug!(bytes = payload.len(), "serving payload");
    stream.write_all(payload.as_bytes())?;
    stream.flush()?;
    stream.shutdown(Shutdown::Write)
}
