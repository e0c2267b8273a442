use std::io::{self, Read, Write};
use std::net::{SocketAddr, Shutdown, TcpStream};

/// A duplex byte channel between one visitor and their session.
///
/// The secure-transport layer produces one of these after its
/// handshake; the session engine is the only consumer. Reads block
/// until at least one byte arrives or the peer hangs up.
pub trait Channel: Send {
    /// Blocking read. Returns the number of bytes read; 0 means the
    /// peer closed the channel.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data` to the peer.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the channel. Safe to call more than once.
    fn close(&mut self);

    /// The peer address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// A raw TCP stream as a channel.
///
/// Used directly by the plain transport and wrapped by secure
/// transports that decrypt into the same shape.
pub struct TcpChannel {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

impl TcpChannel {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        Self { stream, peer }
    }
}

impl Channel for TcpChannel {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    fn close(&mut self) {
        // The peer may already be gone; nothing to do about it here.
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

/// Scripted in-memory channel for exercising the engine in tests.
///
/// The session owns the channel for its whole run, so the transcript
/// of sent bytes is shared out through a [`MockTranscript`] handle.
#[cfg(test)]
pub(crate) struct MockChannel {
    input: std::collections::VecDeque<u8>,
    transcript: MockTranscript,
}

#[cfg(test)]
#[derive(Clone)]
pub(crate) struct MockTranscript {
    sent: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    closed: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MockTranscript {
    pub(crate) fn string(&self) -> String {
        String::from_utf8_lossy(&self.sent.lock().unwrap()).into_owned()
    }

    pub(crate) fn closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl MockChannel {
    pub(crate) fn new(script: &[u8]) -> (Self, MockTranscript) {
        let transcript = MockTranscript {
            sent: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            closed: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        };
        let channel = Self {
            input: script.iter().copied().collect(),
            transcript: transcript.clone(),
        };
        (channel, transcript)
    }
}

#[cfg(test)]
impl Channel for MockChannel {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.input.pop_front() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            // Script exhausted: the peer hung up.
            None => Ok(0),
        }
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.transcript.sent.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.transcript
            .closed
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        "127.0.0.1:9".parse().ok()
    }
}
