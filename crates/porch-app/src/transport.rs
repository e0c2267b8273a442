//! The secure-transport seam.
//!
//! The session engine only ever sees a [`Channel`]. How that channel
//! comes to exist (key exchange, authentication, the client's
//! shell/pty request) is the transport's business. A failed or
//! timed-out handshake abandons that one connection and nothing else.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use porch_term::{Channel, TcpChannel};

/// Longest we wait for the secure channel to open.
pub const HANDSHAKE_WAIT: Duration = Duration::from_secs(20);
/// Longest we wait for the client's shell request after the channel opens.
pub const SHELL_REQUEST_WAIT: Duration = Duration::from_secs(10);

/// Transport failures. [`TransportError::KeyMaterial`] surfaces at
/// construction and aborts startup; the others abandon the one
/// connection being established and are never surfaced to other
/// sessions.
#[derive(Debug)]
pub enum TransportError {
    KeyMaterial(PathBuf, io::Error),
    Handshake(String),
    ShellRequestTimeout,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::KeyMaterial(path, err) => {
                write!(f, "cannot read key file {}: {err}", path.display())
            }
            TransportError::Handshake(msg) => write!(f, "handshake failed: {msg}"),
            TransportError::ShellRequestTimeout => {
                write!(f, "client never asked for a shell")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Turns an accepted TCP stream into a session channel.
///
/// Implementations must bound their own waits: [`HANDSHAKE_WAIT`] for
/// the channel to open, [`SHELL_REQUEST_WAIT`] for the shell request.
pub trait Transport: Send + Sync {
    fn establish(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> Result<Box<dyn Channel>, TransportError>;
}

/// Transport with no encryption and no handshake: the TCP stream is
/// the channel.
///
/// Useful behind a separate TLS/SSH terminator or on a trusted
/// network. The configured key material is verified readable at
/// construction and held so a secure binding can take this
/// transport's place without touching the configuration surface.
pub struct PlainTransport {
    key_file: PathBuf,
}

impl PlainTransport {
    pub fn new(key_file: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let key_file = key_file.into();
        std::fs::metadata(&key_file)
            .map_err(|err| TransportError::KeyMaterial(key_file.clone(), err))?;
        Ok(Self { key_file })
    }

    /// Path to the host key this transport was built around.
    pub fn key_file(&self) -> &Path {
        &self.key_file
    }
}

impl Transport for PlainTransport {
    fn establish(
        &self,
        stream: TcpStream,
        _addr: SocketAddr,
    ) -> Result<Box<dyn Channel>, TransportError> {
        Ok(Box::new(TcpChannel::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_readable_key_material() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa");
        std::fs::write(&key, "key material").unwrap();

        let transport = PlainTransport::new(&key).unwrap();
        assert_eq!(transport.key_file(), key.as_path());

        let missing = dir.path().join("absent");
        let err = PlainTransport::new(&missing).err().unwrap();
        match err {
            TransportError::KeyMaterial(path, _) => assert_eq!(path, missing),
            other => panic!("expected key-material error, got {other:?}"),
        }
    }

    #[test]
    fn errors_name_the_failure() {
        let err = TransportError::Handshake("no common cipher".into());
        assert_eq!(err.to_string(), "handshake failed: no common cipher");
        assert_eq!(
            TransportError::ShellRequestTimeout.to_string(),
            "client never asked for a shell"
        );
    }

    #[test]
    fn handshake_wait_covers_shell_request_wait() {
        assert!(HANDSHAKE_WAIT > SHELL_REQUEST_WAIT);
    }
}
