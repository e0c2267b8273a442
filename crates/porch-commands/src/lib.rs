//! porch-commands: The command contract and registry for Porch.
//!
//! A command is a named, pluggable unit of behavior invocable from the
//! prompt. Commands are built once at startup, frozen into a
//! [`Registry`], and shared read-only by every session.
//!
//! # Architecture
//!
//! - [`Command`] / [`Console`] — The contract between a command body
//!   and the session that runs it.
//! - [`builtin`] — The stock command kinds (text, image, message).
//! - [`Registry`] — Manifest-driven discovery and frozen lookup.

pub mod builtin;
pub mod command;
pub mod registry;

pub use builtin::{ImageCommand, MessageCommand, TextCommand};
pub use command::{Command, CommandError, Console};
pub use registry::{Registry, RegistryBuilder, RegistryError};
