use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::MosaicConfig;
use crate::sprite::InputGroup;

/// A loaded configuration file with its associated directory.
///
/// Paths in the config are relative to the config file location,
/// so we need to track where the config was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed configuration
    pub config: MosaicConfig,
    /// The directory containing the config file
    pub config_dir: PathBuf,
}

impl LoadedConfig {
    /// Load and validate a config file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: MosaicConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;

        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self { config, config_dir })
    }

    /// Resolve each configured input to a group of paths.
    ///
    /// Glob patterns are expanded, and all paths are resolved relative
    /// to the config file directory.
    pub fn resolve_input_groups(&self) -> Result<Vec<InputGroup>> {
        let mut groups = Vec::with_capacity(self.config.inputs.len());

        for input in &self.config.inputs {
            let pattern = &input.pattern;
            let paths = if is_glob_pattern(pattern) {
                // Resolve glob pattern relative to config dir
                let full_pattern = self.config_dir.join(pattern);
                let pattern_str = full_pattern.to_string_lossy();

                let entries = glob::glob(&pattern_str)
                    .with_context(|| format!("invalid glob pattern: {}", pattern))?;

                let mut paths = Vec::new();
                for entry in entries {
                    paths.push(
                        entry.with_context(|| format!("failed to read glob entry: {}", pattern))?,
                    );
                }
                paths
            } else {
                vec![self.config_dir.join(pattern)]
            };

            groups.push(InputGroup {
                paths,
                priority: input.priority,
            });
        }

        Ok(groups)
    }

    /// Resolve the cache directory relative to the config file directory.
    pub fn resolve_cache_dir(&self) -> Option<PathBuf> {
        self.config
            .cache_dir
            .as_ref()
            .map(|dir| self.config_dir.join(dir))
    }
}

/// Check if a pattern contains glob characters.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}
