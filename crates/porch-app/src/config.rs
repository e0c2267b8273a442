//! Environment-style configuration for the server process.
//!
//! All knobs come from environment variables, matching how the server
//! is deployed (a unit file sets them). Values are parsed here; the
//! key-material path is verified by the transport that consumes it.

use std::io;
use std::path::PathBuf;

use porch_text::Text;

const DEFAULT_COMMANDS_DIR: &str = "./commands";
const DEFAULT_KEYFILE: &str = "./id_rsa";
const DEFAULT_PORT: u16 = 22;

/// Fatal configuration errors; these abort startup.
#[derive(Debug)]
pub enum ConfigError {
    BadPort(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::BadPort(value) => write!(f, "invalid port '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the command-manifest tree (`TERM_COMMANDS_DIR`).
    pub commands_dir: PathBuf,
    /// Host key material handed to the secure transport (`TERM_KEYFILE`).
    pub key_file: PathBuf,
    /// Optional welcome-banner file (`TERM_WELCOME`).
    pub welcome_file: Option<PathBuf>,
    /// Listening port (`SSH_PORT`).
    pub port: u16,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a lookup function (testable seam).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let commands_dir = lookup("TERM_COMMANDS_DIR")
            .unwrap_or_else(|| DEFAULT_COMMANDS_DIR.to_string())
            .into();
        let key_file: PathBuf = lookup("TERM_KEYFILE")
            .unwrap_or_else(|| DEFAULT_KEYFILE.to_string())
            .into();
        let welcome_file = lookup("TERM_WELCOME").map(PathBuf::from);
        let port = match lookup("SSH_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::BadPort(value))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            commands_dir,
            key_file,
            welcome_file,
            port,
        })
    }

    /// Load the welcome banner, verbatim (it may carry its own escape
    /// sequences). `None` when no banner file is configured.
    pub fn load_welcome(&self) -> io::Result<Option<Text>> {
        match &self.welcome_file {
            Some(path) => {
                let banner = std::fs::read_to_string(path)?;
                Ok(Some(Text::plain(banner)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.commands_dir, PathBuf::from("./commands"));
        assert_eq!(config.key_file, PathBuf::from("./id_rsa"));
        assert_eq!(config.welcome_file, None);
        assert_eq!(config.port, 22);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TERM_COMMANDS_DIR", "/srv/commands"),
            ("TERM_KEYFILE", "/srv/host_key"),
            ("TERM_WELCOME", "/srv/welcome.ans"),
            ("SSH_PORT", "2022"),
        ]))
        .unwrap();
        assert_eq!(config.commands_dir, PathBuf::from("/srv/commands"));
        assert_eq!(config.key_file, PathBuf::from("/srv/host_key"));
        assert_eq!(config.welcome_file, Some(PathBuf::from("/srv/welcome.ans")));
        assert_eq!(config.port, 2022);
    }

    #[test]
    fn test_bad_port_is_fatal() {
        let result = Config::from_lookup(lookup(&[("SSH_PORT", "not-a-port")]));
        assert!(matches!(result, Err(ConfigError::BadPort(_))));
    }

    #[test]
    fn test_load_welcome_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let banner = dir.path().join("welcome.ans");
        std::fs::write(&banner, "\x1b[35mhello\x1b[0m\n").unwrap();

        let banner_str = banner.to_string_lossy().into_owned();
        let config =
            Config::from_lookup(lookup(&[("TERM_WELCOME", banner_str.as_str())])).unwrap();
        let text = config.load_welcome().unwrap().unwrap();
        assert_eq!(text.render_ansi(), "\x1b[35mhello\x1b[0m\n");
    }

    #[test]
    fn test_load_welcome_unconfigured() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.load_welcome().unwrap().is_none());
    }
}
