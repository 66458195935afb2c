//! Engine settings, loaded from an optional JSON file.
//!
//! Every field has a default, so a partial file such as `{"hash_mb": 256}`
//! is valid. Command-line flags are applied on top by the binary.

use crate::error::EngineResult;
use crate::search::MAX_PLY;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transposition table size in megabytes
    pub hash_mb: usize,
    /// Depth used by `go` when no limit is given
    pub max_depth: u32,
    /// Subtracted from every clock-based time budget
    pub move_overhead_ms: u64,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: 64,
            max_depth: MAX_PLY as u32,
            move_overhead_ms: 0,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Unrecognised level names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.hash_mb, 64);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.move_overhead_ms, 0);
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"hash_mb": 16, "log_level": "debug"}"#).unwrap();
        assert_eq!(config.hash_mb, 16);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.level_filter(), LevelFilter::Debug);

        let config = EngineConfig::from_json(r#"{"log_level": "loud"}"#).unwrap();
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            EngineConfig::from_json("{\"hash_mb\": \"big\"}"),
            Err(EngineError::ConfigParse(_))
        ));
        assert!(matches!(
            EngineConfig::load("/nonexistent/rookery.json"),
            Err(EngineError::ConfigIo(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("rookery-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"move_overhead_ms": 30, "max_depth": 12}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.move_overhead_ms, 30);
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.hash_mb, 64);
    }
}
