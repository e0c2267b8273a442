//! The per-connection session state machine.
//!
//! A session greets the visitor, then loops: prompt, accumulate one
//! raw line character by character (with backspace editing and local
//! echo), dispatch it against the shared registry, and report the
//! result. Command failures are contained; only an explicit `exit`,
//! an interrupt, a hangup, or too many consecutive unknown commands
//! end the session. The channel is closed on every exit path.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use porch_commands::{Console, Registry};
use porch_text::{Color, Style, Text, TextSink};

use crate::channel::Channel;
use crate::output::OutputSink;

/// Consecutive unknown commands tolerated before forced disconnect.
pub const MAX_ERRORS: u32 = 3;

const CTRL_C: char = '\x03';
const BACKSPACE: char = '\x7f';
const ERASE: &[u8] = b"\x08 \x08";

const DEFAULT_WELCOME: &str = "Welcome to my home terminal!\n";

const NAME_STYLE: Style = Style::new().fg(Color::Blue).bold();
const PROMPT_STYLE: Style = Style::new().fg(Color::Green).bold();
const ERROR_STYLE: Style = Style::new().fg(Color::Red).bold();

/// What a raw line read ended with.
enum LineRead {
    /// CR or LF submitted the pending line.
    Line(String),
    /// Ctrl-C: the visitor wants out, immediately.
    Interrupted,
    /// The peer closed the channel.
    Closed,
}

/// Outcome of dispatching one submitted line.
enum Dispatch {
    Continue,
    Terminate,
}

/// One visitor's interactive session.
pub struct Session {
    channel: Box<dyn Channel>,
    registry: Arc<Registry>,
    welcome: Text,
    peer: Option<SocketAddr>,
    consecutive_errors: u32,
    /// Byte read past the end of a malformed UTF-8 sequence, held for
    /// the next read.
    pushback: Option<u8>,
}

impl Session {
    /// Bind a session to an established channel and the shared registry.
    pub fn new(channel: Box<dyn Channel>, registry: Arc<Registry>) -> Self {
        let peer = channel.peer_addr();
        Self {
            channel,
            registry,
            welcome: Text::plain(DEFAULT_WELCOME),
            peer,
            consecutive_errors: 0,
            pushback: None,
        }
    }

    /// Replace the default greeting, e.g. with a welcome file's contents.
    pub fn with_welcome(mut self, welcome: Text) -> Self {
        self.welcome = welcome;
        self
    }

    /// Run the session to completion. The channel is closed before
    /// this returns, whatever the outcome.
    pub fn run(&mut self) -> io::Result<()> {
        let result = self.run_loop();
        self.channel.close();
        result
    }

    fn run_loop(&mut self) -> io::Result<()> {
        let welcome = self.welcome.clone();
        self.emit(&welcome)?;
        let help = self.help_text();
        self.emit(&help)?;

        loop {
            self.prompt()?;
            let line = match self.read_raw_line()? {
                LineRead::Line(line) => line,
                LineRead::Interrupted | LineRead::Closed => return Ok(()),
            };
            // Move to a fresh line before any command output.
            self.channel.send(b"\r\n")?;
            match self.dispatch(&line)? {
                Dispatch::Continue => {}
                Dispatch::Terminate => return Ok(()),
            }
        }
    }

    fn prompt(&mut self) -> io::Result<()> {
        self.emit(&Text::styled("\r\n\u{03bb} ", PROMPT_STYLE))
    }

    /// Accumulate one line, one character at a time, with local echo.
    fn read_raw_line(&mut self) -> io::Result<LineRead> {
        let mut pending = String::new();
        loop {
            let c = match self.read_char()? {
                Some(c) => c,
                None => return Ok(LineRead::Closed),
            };
            match c {
                CTRL_C => return Ok(LineRead::Interrupted),
                BACKSPACE => {
                    // No-op on an empty pending line: nothing to erase.
                    if pending.pop().is_some() {
                        self.channel.send(ERASE)?;
                    }
                }
                '\r' | '\n' => return Ok(LineRead::Line(pending)),
                c => {
                    pending.push(c);
                    let mut buf = [0u8; 4];
                    self.channel.send(c.encode_utf8(&mut buf).as_bytes())?;
                }
            }
        }
    }

    /// Read one UTF-8 character from the channel, blocking.
    ///
    /// Returns `None` on hangup. An invalid byte sequence decodes to
    /// the replacement character rather than killing the session.
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let first = match self.recv_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        if first.is_ascii() {
            return Ok(Some(first as char));
        }

        let total = match first {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            // Stray continuation or invalid lead byte.
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };
        let mut bytes = vec![first];
        for _ in 1..total {
            match self.recv_byte()? {
                // Only 0b10xxxxxx bytes continue the sequence; anything
                // else starts the next character and must survive.
                Some(b) if b & 0xc0 == 0x80 => bytes.push(b),
                Some(b) => {
                    self.pushback = Some(b);
                    break;
                }
                None => return Ok(None),
            }
        }
        // A truncated sequence decodes to the replacement character.
        Ok(String::from_utf8_lossy(&bytes).chars().next())
    }

    fn recv_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        match self.channel.recv(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    /// Normalize and dispatch one submitted line.
    fn dispatch(&mut self, line: &str) -> io::Result<Dispatch> {
        let cmd = line.trim().to_lowercase();

        if cmd.is_empty() {
            return Ok(Dispatch::Continue);
        } else if cmd == "exit" {
            return Ok(Dispatch::Terminate);
        } else if cmd == "help" {
            self.consecutive_errors = 0;
            let help = self.help_text();
            self.emit(&help)?;
        } else {
            // Keep the Arc alive locally so the command may borrow the
            // session mutably during execute().
            let registry = Arc::clone(&self.registry);
            match registry.find(&cmd) {
                Some(command) => {
                    self.consecutive_errors = 0;
                    match command.execute(self) {
                        Ok(result) => self.emit_line(&result)?,
                        Err(err) => {
                            log::error!("error executing command {cmd}: {err}");
                            self.emit_line(&Text::styled("Oops. Error!", ERROR_STYLE))?;
                        }
                    }
                }
                None => {
                    self.consecutive_errors += 1;
                    // Unknown commands are how scanners announce themselves.
                    log::info!("invalid command '{cmd}' by {:?}", self.peer);
                    self.emit_line(&Text::plain(format!(
                        "Invalid command '{cmd}'. Type `help` to see available commands.\n"
                    )))?;
                }
            }
        }

        if self.consecutive_errors > MAX_ERRORS {
            self.emit_line(&Text::styled("Too many errors. Exiting...", ERROR_STYLE))?;
            return Ok(Dispatch::Terminate);
        }
        Ok(Dispatch::Continue)
    }

    /// The help listing: reserved words first, then every registered
    /// command in registry order.
    fn help_text(&self) -> Text {
        let mut text = Text::plain("\nAvailable commands:\n");
        text.append(
            Text::new()
                .push("exit\t\t", NAME_STYLE)
                .push_plain("Exit the terminal\n"),
        );
        text.append(
            Text::new()
                .push("help\t\t", NAME_STYLE)
                .push_plain("Show this help text\n"),
        );
        for command in self.registry.iter() {
            text.append(
                Text::new()
                    .push(format!("{}\t\t", command.name()), NAME_STYLE)
                    .push_plain(format!("{}\n", command.description())),
            );
        }
        text
    }

    fn emit(&mut self, text: &Text) -> io::Result<()> {
        let mut sink = OutputSink::new(self.channel.as_mut());
        text.render_to(&mut sink)
    }

    fn emit_line(&mut self, text: &Text) -> io::Result<()> {
        self.emit(text)?;
        let mut sink = OutputSink::new(self.channel.as_mut());
        sink.write("\n")
    }
}

impl Console for Session {
    fn print(&mut self, text: &Text) -> io::Result<()> {
        self.emit(text)
    }

    fn prompt_line(&mut self, prompt: &Text) -> io::Result<Option<String>> {
        self.emit(prompt)?;
        match self.read_raw_line()? {
            LineRead::Line(line) => Ok(Some(line)),
            LineRead::Interrupted | LineRead::Closed => Ok(None),
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}
