use anyhow::Context;
use scened_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "scened.config.json";

/// Content root configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Undo steps kept per open document
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Globs of resource paths skipped by `check`
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Template text per extension, replacing the built-in template
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

fn default_undo_levels() -> usize {
    EditorConfig::default().undo_levels
}

impl Config {
    /// Load the config of a content root; a missing file gives the defaults
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let config_path = root.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn editor(&self) -> EditorConfig {
        EditorConfig {
            undo_levels: self.undo_levels,
        }
    }

    /// Compiled `ignore` globs
    pub fn ignore_patterns(&self) -> anyhow::Result<Vec<glob::Pattern>> {
        self.ignore
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).with_context(|| format!("Invalid ignore pattern '{}'", pattern))
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_levels: default_undo_levels(),
            ignore: Vec::new(),
            templates: BTreeMap::new(),
        }
    }
}
