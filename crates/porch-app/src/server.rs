//! The connection manager.
//!
//! Accepts inbound TCP connections, enforces the concurrency ceiling,
//! and runs one session per connection on its own named OS thread.
//! The accept loop polls so a stop signal can interrupt it; the
//! active-connection counter is the only state shared across sessions
//! and is only ever touched inside a short lock.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use porch_commands::Registry;
use porch_term::Session;
use porch_text::Text;

use crate::transport::Transport;

/// Maximum concurrent sessions.
pub const CONNECTION_LIMIT: usize = 20;

const ACCEPT_POLL: Duration = Duration::from_secs(1);

/// Errors from the listener itself. Per-connection failures are
/// contained in their session thread and never reach here.
#[derive(Debug)]
pub enum ServerError {
    Bind(io::Error),
    Accept(io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(err) => write!(f, "failed to bind listener: {err}"),
            ServerError::Accept(err) => write!(f, "listener failed: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind(err) | ServerError::Accept(err) => Some(err),
        }
    }
}

/// Decrements the active-connection counter when a session thread
/// exits, however it exits.
struct ConnectionGuard {
    active: Arc<Mutex<usize>>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            *active = active.saturating_sub(1);
        }
    }
}

/// Accepts connections and spawns sessions.
pub struct Server {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    welcome: Option<Text>,
    port: u16,
    limit: usize,
    active: Arc<Mutex<usize>>,
}

impl Server {
    pub fn new(
        registry: Arc<Registry>,
        transport: Arc<dyn Transport>,
        welcome: Option<Text>,
        port: u16,
    ) -> Self {
        Self {
            registry,
            transport,
            welcome,
            port,
            limit: CONNECTION_LIMIT,
            active: Arc::new(Mutex::new(0)),
        }
    }

    /// Override the connection ceiling.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sessions currently running or mid-handshake.
    pub fn active_connections(&self) -> usize {
        self.active.lock().map(|a| *a).unwrap_or(0)
    }

    /// Bind the listening socket on all interfaces.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener =
            TcpListener::bind(("0.0.0.0", self.port)).map_err(ServerError::Bind)?;
        // Nonblocking accept, polled, so the stop signal gets a look-in.
        listener
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        log::info!(
            "listening for connections on {}",
            listener.local_addr().map_err(ServerError::Bind)?
        );
        Ok(listener)
    }

    /// Accept until the stop channel fires or closes.
    pub fn serve(
        &self,
        listener: TcpListener,
        mut stop_rx: mpsc::Receiver<()>,
    ) -> Result<(), ServerError> {
        loop {
            // Checked every iteration so a steady stream of inbound
            // connections cannot starve shutdown.
            match stop_rx.try_recv() {
                Ok(()) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    log::info!("stop requested, closing listener");
                    return Ok(());
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
            }
            match listener.accept() {
                Ok((stream, addr)) => self.handle_client(stream, addr),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(err) => {
                    log::warn!("error accepting connection: {err}");
                }
            }
        }
    }

    /// Bind and serve; the usual entry point.
    pub fn run(&self, stop_rx: mpsc::Receiver<()>) -> Result<(), ServerError> {
        let listener = self.bind()?;
        self.serve(listener, stop_rx)
    }

    fn handle_client(&self, stream: TcpStream, addr: SocketAddr) {
        // The listener is nonblocking; the session's reads must not be.
        if let Err(err) = stream.set_nonblocking(false) {
            log::warn!("dropping connection from {addr}: {err}");
            return;
        }
        {
            let mut active = match self.active.lock() {
                Ok(active) => active,
                Err(_) => return,
            };
            if *active >= self.limit {
                log::warn!("connection limit reached, closing connection from {addr}");
                // Dropping the stream is the whole rejection; the
                // client never gets a handshake.
                return;
            }
            *active += 1;
        }
        log::info!("got a connection from {addr}");

        let guard = ConnectionGuard {
            active: Arc::clone(&self.active),
        };
        let transport = Arc::clone(&self.transport);
        let registry = Arc::clone(&self.registry);
        let welcome = self.welcome.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("session-{addr}"))
            .spawn(move || {
                // Counter decrement rides on this thread's exit.
                let _guard = guard;
                match transport.establish(stream, addr) {
                    Ok(channel) => {
                        let mut session = Session::new(channel, registry);
                        if let Some(welcome) = welcome {
                            session = session.with_welcome(welcome);
                        }
                        if let Err(err) = session.run() {
                            log::debug!("session from {addr} ended with error: {err}");
                        }
                        log::info!("connection from {addr} closed");
                    }
                    Err(err) => {
                        log::warn!("abandoning connection from {addr}: {err}");
                    }
                }
            });
        if let Err(err) = spawned {
            // The closure (and its guard) is dropped, undoing the count.
            log::error!("failed to spawn session thread for {addr}: {err}");
        }
    }
}
