//! `berth.toml` loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::deployer::DeployerConfig;
use crate::registry::FileRegistry;
use crate::substitute::DATADIR;

/// Deployment environment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Root directory for every generated artifact
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// JSON file backing the offer registry; offers are rejected without it
    #[serde(default)]
    pub registry: Option<PathBuf>,

    /// Extra variables available to descriptors
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Settings {
    /// `<config_dir>/berth/berth.toml`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dir.join("berth").join("berth.toml"))
    }

    /// Load settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::parse_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.variables.contains_key(DATADIR) {
            anyhow::bail!("'{DATADIR}' is reserved; set data_dir instead");
        }
        if let Some(ref dir) = self.data_dir
            && dir.as_os_str().is_empty()
        {
            anyhow::bail!("data_dir must not be empty");
        }
        Ok(())
    }

    /// Configured data directory, or `<data_dir>/berth` from the platform.
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(base.join("berth"))
    }

    pub fn deployer_config(&self) -> anyhow::Result<DeployerConfig> {
        let mut config = DeployerConfig::new(self.data_dir()?);
        if let Some(ref path) = self.registry {
            config = config.with_registry(Arc::new(FileRegistry::new(path.clone())));
        }
        for (name, value) in &self.variables {
            config = config.with_variable(name.as_str(), value.as_str());
        }
        Ok(config)
    }
}
