//! Loading `RetrievalConfig` from TOML plus command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clearpath_retrieval::RetrievalConfig;
use tracing::debug;

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub docs_dir: Option<PathBuf>,
    pub top_k: Option<usize>,
}

/// Parse a configuration from TOML text. Missing keys take defaults.
pub fn parse_config(contents: &str) -> Result<RetrievalConfig> {
    toml::from_str(contents).context("invalid configuration")
}

/// Read the configuration file if one was given, then apply overrides.
pub async fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<RetrievalConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            debug!("Loaded configuration from {}", path.display());
            parse_config(&contents)?
        }
        None => RetrievalConfig::default(),
    };

    if let Some(dir) = &overrides.docs_dir {
        config.docs_dir = dir.clone();
    }
    if let Some(top_k) = overrides.top_k {
        config.query.top_k = top_k;
    }

    config.validate()?;
    Ok(config)
}
