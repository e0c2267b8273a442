//! porch-term: The terminal session engine for Porch.
//!
//! This crate owns one connection's interactive lifecycle once the
//! secure transport has handed over a duplex byte channel: the prompt
//! loop, raw character intake with line editing, command dispatch, and
//! chunked styled output.
//!
//! # Architecture
//!
//! - [`Channel`] — The duplex byte channel a transport hands us.
//! - [`OutputSink`] — CRLF-normalizing, escape-aware chunked writer.
//! - [`Session`] — The per-connection state machine.

pub mod channel;
pub mod output;
pub mod session;

pub use channel::{Channel, TcpChannel};
pub use output::{OutputSink, DEFAULT_MAX_CHUNK};
pub use session::Session;
