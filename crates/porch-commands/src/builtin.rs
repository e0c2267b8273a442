//! The stock command kinds.
//!
//! These cover the original deployment's plugins: static text or
//! markdown pages, ANSI image renders, and a guest-book style message
//! drop. Site-specific content comes entirely from the manifest files
//! that declare instances of these kinds.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use porch_text::{markdown, pixels, Color, Style, Text};

use crate::command::{Command, CommandError, Console};

/// Default pixel size for image renders.
pub const DEFAULT_IMAGE_SIZE: (u32, u32) = (50, 50);

/// Renders a text file; `.md` files go through the markdown renderer.
pub struct TextCommand {
    name: String,
    description: String,
    path: PathBuf,
}

impl TextCommand {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            path: path.into(),
        }
    }
}

impl Command for TextCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, _console: &mut dyn Console) -> Result<Text, CommandError> {
        let body = std::fs::read_to_string(&self.path)?;
        let is_markdown = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if is_markdown {
            Ok(markdown::render(&body))
        } else {
            Ok(Text::plain(body))
        }
    }
}

/// Renders an image file as ANSI half-block pixels.
pub struct ImageCommand {
    name: String,
    description: String,
    path: PathBuf,
    width: u32,
    height: u32,
}

impl ImageCommand {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            path: path.into(),
            width,
            height,
        }
    }
}

impl Command for ImageCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, console: &mut dyn Console) -> Result<Text, CommandError> {
        let rendered = pixels::render(&self.path, self.width, self.height)
            .map_err(|e| CommandError::Failed(e.to_string()))?;
        // Print immediately rather than returning: large renders go out
        // as soon as they are ready.
        console.print(&rendered)?;
        Ok(Text::new())
    }
}

/// Captures one line from the visitor and appends it to a log file.
///
/// The log is append-only free text, one message per line, created on
/// first write.
pub struct MessageCommand {
    name: String,
    description: String,
    log_path: PathBuf,
}

impl MessageCommand {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            log_path: log_path.into(),
        }
    }
}

impl Command for MessageCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, console: &mut dyn Console) -> Result<Text, CommandError> {
        console.print(&Text::plain(
            "Enter your message (Press enter when done):",
        ))?;
        let prompt = Text::styled("\r\n> ", Style::new().fg(Color::Yellow).bold());

        let message = match console.prompt_line(&prompt)? {
            Some(line) => line,
            None => return Ok(Text::new()),
        };

        if message.is_empty() {
            return Ok(Text::plain("\nNo message entered."));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{message}")?;
        Ok(Text::plain("\nMessage saved successfully!"))
    }
}

/// Resolve a manifest-relative file path.
///
/// Bare file names resolve against `base` (the directory of the
/// manifest that declared the command); absolute paths are kept as-is.
pub fn resolve_path(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
