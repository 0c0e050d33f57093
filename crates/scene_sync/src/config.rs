// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synchronization settings.
//!
//! Stored as RON; every field has a default so partial files are accepted.

use crate::engine::{CommandSource, InsertionPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Errors loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Hierarchy tree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Collapsing a row also forgets expand state of its descendants
    pub prune_descendants_on_collapse: bool,
    /// Show every surviving row expanded while a search is active
    pub auto_expand_on_search: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            prune_descendants_on_collapse: true,
            auto_expand_on_search: true,
        }
    }
}

/// Command gateway behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Tag attached to UI-originated add/remove commands
    pub source: CommandSource,
    /// Where a dropped node lands under its target
    pub reparent_policy: InsertionPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            source: CommandSource::Editor,
            reparent_policy: InsertionPolicy::AppendLast,
        }
    }
}

/// Asset progress indicators and task queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Delay before a finished or failed indicator is dismissed (ms)
    pub dismiss_delay_ms: u64,
    /// Fail entries that stay silent this long (ms); `None` disables
    pub stall_timeout_ms: Option<u64>,
    /// Tasks the queue runs at once
    pub max_concurrent_tasks: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dismiss_delay_ms: 2_000,
            stall_timeout_ms: None,
            max_concurrent_tasks: 4,
        }
    }
}

impl AssetConfig {
    /// Dismiss delay as a duration
    pub fn dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.dismiss_delay_ms)
    }

    /// Stall timeout as a duration
    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }
}

/// All synchronization settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Tree settings
    pub tree: TreeConfig,
    /// Gateway settings
    pub gateway: GatewayConfig,
    /// Asset settings
    pub assets: AssetConfig,
}

impl SyncConfig {
    /// Parse from a RON string
    pub fn from_ron(ron_str: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(ron_str)?)
    }

    /// Serialize to a pretty RON string
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded sync config from {:?}", path);
        Ok(config)
    }

    /// Write to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved sync config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert!(config.tree.prune_descendants_on_collapse);
        assert_eq!(config.gateway.source, CommandSource::Editor);
        assert_eq!(config.gateway.reparent_policy, InsertionPolicy::AppendLast);
        assert_eq!(config.assets.dismiss_delay(), Duration::from_secs(2));
        assert_eq!(config.assets.stall_timeout(), None);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = SyncConfig::from_ron("(assets: (stall_timeout_ms: Some(30000)))").unwrap();
        assert_eq!(config.assets.stall_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.assets.max_concurrent_tasks, 4);
        assert_eq!(config.tree, TreeConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = SyncConfig::default();
        config.tree.auto_expand_on_search = false;
        config.gateway.reparent_policy = InsertionPolicy::Prepend;
        let loaded = SyncConfig::from_ron(&config.to_ron().unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_ron_is_parse_error() {
        assert!(matches!(
            SyncConfig::from_ron("(tree: 42)"),
            Err(ConfigError::Parse(_))
        ));
    }
}
