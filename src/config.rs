//! Configuration loading for `redline.toml`.
//!
//! The file is looked up in the working directory first and then in the
//! platform config directory. A missing or unparsable file yields defaults;
//! unknown keys are ignored.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

use crate::editor::undo::UNDO_HISTORY_MAX;
use crate::surface::DEFAULT_PLACEHOLDER;

pub const CONFIG_FILE_NAME: &str = "redline.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub separator: SeparatorConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Blank lines inserted between rewritten user text and a quote boundary.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorConfig {
    #[serde(default = "SeparatorConfig::default_blank_lines")]
    pub blank_lines: usize,
    #[serde(default = "SeparatorConfig::default_blank_lines_signature_with_quote")]
    pub blank_lines_signature_with_quote: usize,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            blank_lines: Self::default_blank_lines(),
            blank_lines_signature_with_quote: Self::default_blank_lines_signature_with_quote(),
        }
    }
}

impl SeparatorConfig {
    const fn default_blank_lines() -> usize {
        2
    }
    const fn default_blank_lines_signature_with_quote() -> usize {
        1
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// Zero-width glyph that keeps a hidden newline selectable.
    #[serde(default = "SurfaceConfig::default_placeholder")]
    pub placeholder: char,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            placeholder: Self::default_placeholder(),
        }
    }
}

impl SurfaceConfig {
    const fn default_placeholder() -> char {
        DEFAULT_PLACEHOLDER
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct UndoConfig {
    #[serde(default = "UndoConfig::default_history_max")]
    pub history_max: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            history_max: Self::default_history_max(),
        }
    }
}

impl UndoConfig {
    const fn default_history_max() -> usize {
        UNDO_HISTORY_MAX
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "LogConfig::default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

impl LogConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

/// Best-effort config path: local `redline.toml`, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("redline").join(CONFIG_FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(config)
        }
        Err(err) => {
            warn!(target: "config", path = %path.display(), error = %err, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BufferWriter;
    use tracing::Level;
    use tracing::subscriber::with_default;

    #[test]
    fn defaults_when_file_missing() {
        let cfg = load_from(Some(PathBuf::from("__redline_missing__.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.separator.blank_lines, 2);
        assert_eq!(cfg.separator.blank_lines_signature_with_quote, 1);
        assert_eq!(cfg.surface.placeholder, '\u{200B}');
        assert_eq!(cfg.undo.history_max, 200);
        assert_eq!(cfg.log.filter, "info");
    }

    #[test]
    fn parses_partial_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[separator]\nblank_lines = 3\n\n[undo]\nhistory_max = 10\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.separator.blank_lines, 3);
        assert_eq!(cfg.separator.blank_lines_signature_with_quote, 1);
        assert_eq!(cfg.undo.history_max, 10);
        assert_eq!(cfg.surface, SurfaceConfig::default());
    }

    #[test]
    fn parses_placeholder_escape() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[surface]\nplaceholder = \"\\u2060\"\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.surface.placeholder, '\u{2060}');
    }

    #[test]
    fn parse_error_falls_back_and_logs() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[separator\nblank_lines = ").unwrap();
        let writer = BufferWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer.clone())
            .finish();

        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf())).unwrap());

        assert_eq!(cfg, Config::default());
        let log_output = writer.output();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("config_parse_failed_using_defaults"));
    }
}
