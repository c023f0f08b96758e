use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use cross_xdg::BaseDirs;

use crate::parser::ParseOptions;
use crate::runtime::{DEFAULT_TAPE_LEN, MAX_TAPE_LEN};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "BF_CONFIG";

/// A single bad setting. These are reported and skipped, never fatal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown setting `{key}`")]
    UnknownKey { key: String },

    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Settings shared by the parser and the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of tape cells.
    pub tape_len: usize,
    /// Print a line per executed node to stderr.
    pub trace: bool,
    /// Treat a `[` left open at end of input as a syntax error.
    pub strict_brackets: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tape_len: DEFAULT_TAPE_LEN,
            trace: false,
            strict_brackets: false,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then `BF_*` environment variables.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Some(path) = config_path() {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    tracing::debug!(path = %path.display(), "loading config file");
                    cfg.apply_file(&content);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read config file")
                }
            }
        }

        cfg.apply_env(|key| env::var(key).ok());
        cfg
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { strict_brackets: self.strict_brackets }
    }

    /// Apply the `[runtime]` section of a `bf.toml` file.
    ///
    /// Only flat `key = value` pairs are understood; values may be quoted.
    pub fn apply_file(&mut self, content: &str) {
        let mut in_runtime = false;
        let mut map: HashMap<String, String> = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_runtime = line[1..line.len() - 1].trim() == "runtime";
                continue;
            }
            if !in_runtime {
                continue;
            }
            if let Some((key, raw)) = line.split_once('=') {
                let raw = raw.trim();
                let value = raw
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(raw);
                map.insert(key.trim().to_string(), value.to_string());
            }
        }

        for (key, value) in map {
            if let Err(e) = self.set(&key, &value) {
                tracing::warn!(error = %e, "ignoring config file setting");
            }
        }
    }

    /// Apply `BF_TAPE_SIZE`, `BF_TRACE` and `BF_STRICT` through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in [
            ("BF_TAPE_SIZE", "tape_size"),
            ("BF_TRACE", "trace"),
            ("BF_STRICT", "strict_brackets"),
        ] {
            let Some(value) = lookup(var) else { continue };
            if let Err(e) = self.set(key, value.trim()) {
                tracing::warn!(var, error = %e, "ignoring environment setting");
            }
        }
    }

    /// Set one named option from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "tape_size" => self.tape_len = parse_tape_len(value).ok_or_else(invalid)?,
            "trace" => self.trace = parse_bool(value).ok_or_else(invalid)?,
            "strict_brackets" => self.strict_brackets = parse_bool(value).ok_or_else(invalid)?,
            _ => return Err(ConfigError::UnknownKey { key: key.to_string() }),
        }
        Ok(())
    }
}

/// Parse a tape length in `1..=MAX_TAPE_LEN`. Zero is rejected since the
/// cursor starts on cell 0.
pub fn parse_tape_len(value: &str) -> Option<usize> {
    let digits: String = value.chars().filter(|&c| c != '_').collect();
    digits
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_TAPE_LEN).contains(n))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_VAR) {
        return Some(PathBuf::from(explicit));
    }

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().into_iter().next()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bf.toml");
    Some(path)
}
