//! Manifest-driven command discovery and the frozen registry.
//!
//! Discovery walks a directory tree for `*.json` plugin units. Each
//! unit holds an array of command specs instantiated through a fixed
//! kind table; native Rust commands register through the builder
//! directly. Per-file and per-entry failures are logged and skipped so
//! a broken plugin only shrinks the command set; a missing root is the
//! one fatal condition.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::builtin::{
    resolve_path, ImageCommand, MessageCommand, TextCommand, DEFAULT_IMAGE_SIZE,
};
use crate::command::Command;

/// Fatal registry errors. Everything non-fatal is logged instead.
#[derive(Debug)]
pub enum RegistryError {
    BadRoot(PathBuf, io::Error),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::BadRoot(path, err) => {
                write!(f, "command directory {} unusable: {err}", path.display())
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::BadRoot(_, err) => Some(err),
        }
    }
}

/// One declarative command entry in a plugin manifest.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum CommandSpec {
    Text {
        name: String,
        description: String,
        file: String,
    },
    Image {
        name: String,
        description: String,
        file: String,
        width: Option<u32>,
        height: Option<u32>,
    },
    Message {
        name: String,
        description: String,
        file: Option<String>,
    },
}

impl CommandSpec {
    /// Instantiate the command, resolving file paths against the
    /// directory of the manifest that declared it.
    fn instantiate(self, base: &Path) -> Box<dyn Command> {
        match self {
            CommandSpec::Text {
                name,
                description,
                file,
            } => Box::new(TextCommand::new(name, description, resolve_path(base, &file))),
            CommandSpec::Image {
                name,
                description,
                file,
                width,
                height,
            } => Box::new(ImageCommand::new(
                name,
                description,
                resolve_path(base, &file),
                width.unwrap_or(DEFAULT_IMAGE_SIZE.0),
                height.unwrap_or(DEFAULT_IMAGE_SIZE.1),
            )),
            CommandSpec::Message {
                name,
                description,
                file,
            } => Box::new(MessageCommand::new(
                name,
                description,
                file.as_deref().unwrap_or("messages.txt"),
            )),
        }
    }
}

/// Accumulates commands from code registration and manifest discovery.
#[derive(Default)]
pub struct RegistryBuilder {
    commands: Vec<Box<dyn Command>>,
    skipped_files: usize,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one ready-made command.
    pub fn register(mut self, command: Box<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    /// Register a batch of ready-made commands, e.g. from a crate's
    /// command factory.
    pub fn register_all(mut self, commands: Vec<Box<dyn Command>>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Walk `root` recursively and load every `*.json` plugin unit.
    ///
    /// A file that fails to parse contributes zero commands and the
    /// scan continues. Fails only if `root` is missing or unreadable.
    pub fn load_dir(mut self, root: &Path) -> Result<Self, RegistryError> {
        let mut files = Vec::new();
        collect_manifests(root, &mut files)
            .map_err(|e| RegistryError::BadRoot(root.to_path_buf(), e))?;
        // Directory iteration order is unspecified; sort for a stable
        // registry order across restarts.
        files.sort();

        for file in files {
            match load_manifest(&file) {
                Ok(mut commands) => self.commands.append(&mut commands),
                Err(err) => {
                    log::warn!("skipping plugin file {}: {err}", file.display());
                    self.skipped_files += 1;
                }
            }
        }
        Ok(self)
    }

    /// Freeze the command list.
    ///
    /// Duplicate names (case-insensitive) resolve first-registered
    /// wins; later duplicates are logged and dropped so lookup order
    /// can never reach them.
    pub fn build(self) -> Registry {
        let mut seen: HashSet<String> = HashSet::new();
        let mut commands = Vec::with_capacity(self.commands.len());
        for command in self.commands {
            let key = command.name().to_lowercase();
            if seen.insert(key) {
                commands.push(command);
            } else {
                log::warn!(
                    "duplicate command '{}' ignored (first registration wins)",
                    command.name()
                );
            }
        }
        if self.skipped_files > 0 {
            log::warn!("{} plugin file(s) failed to load", self.skipped_files);
        }
        log::info!("registry built with {} command(s)", commands.len());
        Registry { commands }
    }
}

fn collect_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            // Errors below the root are per-file, not fatal.
            if let Err(err) = collect_manifests(&path, out) {
                log::warn!("skipping directory {}: {err}", path.display());
            }
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Vec<Box<dyn Command>>, String> {
    let body = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let specs: Vec<serde_json::Value> =
        serde_json::from_str(&body).map_err(|e| e.to_string())?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut commands: Vec<Box<dyn Command>> = Vec::new();
    for spec in specs {
        // A bad entry is skipped without abandoning its siblings.
        match serde_json::from_value::<CommandSpec>(spec) {
            Ok(spec) => commands.push(spec.instantiate(base)),
            Err(err) => {
                log::warn!("skipping command entry in {}: {err}", path.display());
            }
        }
    }
    Ok(commands)
}

/// The immutable, ordered collection of loaded commands.
///
/// Built once before any connection is accepted and shared read-only
/// by all sessions; lookups take no lock.
pub struct Registry {
    commands: Vec<Box<dyn Command>>,
}

impl Registry {
    /// Case-insensitive lookup. First match in registration order.
    pub fn find(&self, input: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(input))
            .map(|c| c.as_ref())
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porch_text::Text;

    use crate::command::{CommandError, Console};

    struct NamedCommand(&'static str);

    impl Command for NamedCommand {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test command"
        }

        fn execute(&self, _console: &mut dyn Console) -> Result<Text, CommandError> {
            Ok(Text::plain(self.0))
        }
    }

    #[test]
    fn test_register_and_find_case_insensitive() {
        let registry = RegistryBuilder::new()
            .register(Box::new(NamedCommand("about")))
            .build();
        assert!(registry.find("about").is_some());
        assert!(registry.find("ABOUT").is_some());
        assert!(registry.find("xyzzy").is_none());
    }

    #[test]
    fn test_duplicates_first_wins() {
        struct Described(&'static str, &'static str);
        impl Command for Described {
            fn name(&self) -> &str {
                self.0
            }
            fn description(&self) -> &str {
                self.1
            }
            fn execute(&self, _c: &mut dyn Console) -> Result<Text, CommandError> {
                Ok(Text::new())
            }
        }

        let registry = RegistryBuilder::new()
            .register(Box::new(Described("about", "first")))
            .register(Box::new(Described("ABOUT", "second")))
            .build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("about").unwrap().description(), "first");
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = RegistryBuilder::new()
            .register_all(vec![
                Box::new(NamedCommand("zulu")),
                Box::new(NamedCommand("alpha")),
            ])
            .build();
        let names: Vec<&str> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["zulu", "alpha"]);
    }

    #[test]
    fn test_load_dir_missing_root_is_fatal() {
        let result = RegistryBuilder::new().load_dir(Path::new("/nonexistent/porch-commands"));
        assert!(matches!(result, Err(RegistryError::BadRoot(_, _))));
    }

    #[test]
    fn test_load_dir_parses_manifests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("about.md"), "# hi\n").unwrap();
        std::fs::write(
            dir.path().join("site.json"),
            r#"[
                {"kind": "text", "name": "about", "description": "About me", "file": "about.md"},
                {"kind": "message", "name": "message", "description": "Send me a message"}
            ]"#,
        )
        .unwrap();

        let registry = RegistryBuilder::new()
            .load_dir(dir.path())
            .unwrap()
            .build();
        assert_eq!(registry.len(), 2);
        assert!(registry.find("about").is_some());
        assert!(registry.find("message").is_some());
    }

    #[test]
    fn test_load_dir_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("extra");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(
            sub.join("z.json"),
            r#"[{"kind": "message", "name": "guestbook", "description": "d"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"kind": "message", "name": "message", "description": "d"}]"#,
        )
        .unwrap();

        let registry = RegistryBuilder::new()
            .load_dir(dir.path())
            .unwrap()
            .build();
        let names: Vec<&str> = registry.iter().map(|c| c.name()).collect();
        // Lexicographic file order: a.json before extra/z.json.
        assert_eq!(names, vec!["message", "guestbook"]);
    }

    #[test]
    fn test_broken_manifest_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            r#"[{"kind": "message", "name": "message", "description": "d"}]"#,
        )
        .unwrap();

        let registry = RegistryBuilder::new()
            .load_dir(dir.path())
            .unwrap()
            .build();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bad_entry_skipped_within_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("site.json"),
            r#"[
                {"kind": "teleport", "name": "nope", "description": "unknown kind"},
                {"kind": "message", "name": "message", "description": "d"}
            ]"#,
        )
        .unwrap();

        let registry = RegistryBuilder::new()
            .load_dir(dir.path())
            .unwrap()
            .build();
        assert_eq!(registry.len(), 1);
        assert!(registry.find("message").is_some());
    }

    #[test]
    fn test_non_json_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a manifest").unwrap();

        let registry = RegistryBuilder::new()
            .load_dir(dir.path())
            .unwrap()
            .build();
        assert!(registry.is_empty());
    }
}
