// Server loop module
// Owns the listening socket and runs the accept loop until shutdown

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::listener::create_reusable_listener;
use crate::config::{AppState, Config};
use crate::logger;

/// How often the drain loop re-checks the active connection count
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A bound upload server
///
/// The socket is acquired by [`Server::bind`] and released when
/// [`Server::run_until`] returns, so a process can start, stop and start
/// again on the same port.
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the configured address. Must be called from within a Tokio runtime.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let addr = config
            .get_socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = create_reusable_listener(addr, config.server.reuse_port)?;

        Ok(Self {
            listener,
            state: Arc::new(AppState::new(config)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// On shutdown the listener is closed immediately; in-flight
    /// connections get up to `performance.shutdown_grace` seconds to finish
    /// before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            state,
            active_connections,
        } = self;
        let addr = listener.local_addr()?;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            accept_connection(stream, peer_addr, &state, &active_connections);
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = &mut shutdown => break,
            }
        }

        // Stop accepting before waiting on in-flight work
        drop(listener);

        let grace = Duration::from_secs(state.config.performance.shutdown_grace);
        drain_connections(&active_connections, grace).await;
        logger::log_server_stopped(&addr);
        Ok(())
    }
}

/// Wait until no connections remain or `grace` has elapsed
async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) {
    let active = active_connections.load(Ordering::SeqCst);
    if active == 0 {
        return;
    }
    logger::log_shutdown_requested(active);

    let deadline = tokio::time::Instant::now() + grace;
    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown grace period elapsed with {} connection(s) still open",
                active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
