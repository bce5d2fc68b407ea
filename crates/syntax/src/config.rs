// Chunk: docs/chunks/highlighter_config - TOML configuration

//! Highlighter configuration.
//!
//! Parsed from a `[highlighter]` TOML table. Every field has a default, unknown
//! fields are ignored, and a missing file means defaults. A file that exists
//! but does not parse is an error: the caller decides whether to fall back.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{HighlightError, Result};
use crate::highlighter::BurstBudget;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Run tokenization on a background thread.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "WorkerConfig::default_thread_name")]
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            thread_name: Self::default_thread_name(),
        }
    }
}

impl WorkerConfig {
    fn default_thread_name() -> String {
        "lumen-highlight".to_string()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HighlighterConfig {
    /// Wall-clock budget of one reformatting burst.
    #[serde(default = "HighlighterConfig::default_burst_budget_ms")]
    pub burst_budget_ms: u64,
    /// Maximum blocks per burst; 0 means no limit.
    #[serde(default)]
    pub burst_block_limit: usize,
    /// Apply the visual whitespace style inside tokens.
    #[serde(default = "HighlighterConfig::default_visual_whitespace")]
    pub visual_whitespace: bool,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            burst_budget_ms: Self::default_burst_budget_ms(),
            burst_block_limit: 0,
            visual_whitespace: Self::default_visual_whitespace(),
            worker: WorkerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    highlighter: HighlighterConfig,
}

impl HighlighterConfig {
    const fn default_burst_budget_ms() -> u64 {
        20
    }
    const fn default_visual_whitespace() -> bool {
        true
    }

    /// Parses the `[highlighter]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.highlighter)
    }

    /// Loads configuration from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                info!(
                    target: "config",
                    path = %path.display(),
                    burst_budget_ms = config.burst_budget_ms,
                    burst_block_limit = config.burst_block_limit,
                    worker = config.worker.enabled,
                    "highlighter_config_loaded"
                );
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(HighlightError::ConfigRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// The burst budget these settings describe.
    pub fn burst_budget(&self) -> BurstBudget {
        BurstBudget {
            time: Duration::from_millis(self.burst_budget_ms),
            max_blocks: (self.burst_block_limit > 0).then_some(self.burst_block_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = HighlighterConfig::from_toml_str("").expect("parse");
        assert_eq!(config, HighlighterConfig::default());
        assert_eq!(config.burst_budget_ms, 20);
        assert_eq!(config.burst_budget().max_blocks, None);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let config = HighlighterConfig::from_toml_str(
            "[highlighter]\nburst_block_limit = 50\n[highlighter.worker]\nenabled = true\n",
        )
        .expect("parse");
        assert_eq!(config.burst_block_limit, 50);
        assert_eq!(config.burst_budget().max_blocks, Some(50));
        assert!(config.worker.enabled);
        assert_eq!(config.worker.thread_name, "lumen-highlight");
        assert_eq!(config.burst_budget_ms, 20);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config =
            HighlighterConfig::from_toml_str("[highlighter]\nfuture_knob = 3\n[other]\nx = 1\n")
                .expect("parse");
        assert_eq!(config, HighlighterConfig::default());
    }

    #[test]
    fn bad_type_is_a_parse_error() {
        let err = HighlighterConfig::from_toml_str("[highlighter]\nburst_budget_ms = \"fast\"\n")
            .expect_err("should fail");
        assert!(matches!(err, HighlightError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("lumen-missing-config-does-not-exist.toml");
        let config = HighlighterConfig::load(&path).expect("defaults");
        assert_eq!(config, HighlighterConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("lumen-config-{}.toml", std::process::id()));
        fs::write(&path, "[highlighter]\nburst_budget_ms = 5\n").expect("write");
        let config = HighlighterConfig::load(&path).expect("load");
        let _ = fs::remove_file(&path);
        assert_eq!(config.burst_budget().time, Duration::from_millis(5));
    }
}
