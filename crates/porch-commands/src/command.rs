use std::io;
use std::net::SocketAddr;

use porch_text::Text;

/// Errors from a command body.
///
/// The session engine treats every variant the same way: log it, show
/// the visitor a generic failure notice, keep the session alive.
#[derive(Debug)]
pub enum CommandError {
    Io(io::Error),
    Failed(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Io(err) => write!(f, "command I/O error: {err}"),
            CommandError::Failed(msg) => write!(f, "command failed: {msg}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Io(err) => Some(err),
            CommandError::Failed(_) => None,
        }
    }
}

impl From<io::Error> for CommandError {
    fn from(err: io::Error) -> Self {
        CommandError::Io(err)
    }
}

/// What a command may do with the session that invoked it.
///
/// Implemented by the session engine. Commands that only return a
/// renderable never need it; interactive commands use it for immediate
/// output and raw line capture.
pub trait Console {
    /// Print styled content to the visitor immediately.
    fn print(&mut self, text: &Text) -> io::Result<()>;

    /// Read one raw line from the visitor with local echo and
    /// backspace editing, after printing `prompt`.
    ///
    /// Returns `None` if the visitor interrupted (Ctrl-C) or the
    /// channel closed before the line was submitted.
    fn prompt_line(&mut self, prompt: &Text) -> io::Result<Option<String>>;

    /// The peer address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// A named, pluggable unit of behavior invocable from the prompt.
///
/// Instantiated once at registry build time and shared read-only
/// across all concurrent sessions; any per-session data flows through
/// the `Console` argument.
pub trait Command: Send + Sync {
    /// Dispatch key. Compared case-insensitively against user input.
    fn name(&self) -> &str;

    /// One-line description shown in the help listing.
    fn description(&self) -> &str;

    /// Run the command for one session and return the content to render.
    fn execute(&self, console: &mut dyn Console) -> Result<Text, CommandError>;
}
