use anyhow::{Context, Result, bail};
use budgetkit::ClientConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::ProviderArgs;
use crate::resource::ApiKeyModel;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("budgeteer"))
}

/// Default manifest location
pub fn default_manifest_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("keys.toml"))
}

/// Build the client configuration from flags and environment
pub fn client_config(args: &ProviderArgs) -> Result<ClientConfig> {
    let Some(host) = args.host.as_deref() else {
        bail!("No service host configured (use --host or BUDGETEER_HOST)");
    };
    let Some(api_key) = args.api_key.as_deref() else {
        bail!("No API key configured (use --api-key or BUDGETEER_API_KEY)");
    };

    ClientConfig::new(host, api_key).context("Invalid provider configuration")
}

// ============================================================================
// Manifest
// ============================================================================

/// Desired keys, one `[[api_key]]` table each
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "api_key")]
    pub api_keys: Vec<KeySpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeySpec {
    pub name: String,
    #[serde(default)]
    pub budget: Option<i64>,
}

impl KeySpec {
    pub fn to_model(&self) -> ApiKeyModel {
        ApiKeyModel::desired(self.name.clone(), self.budget)
    }
}

impl Manifest {
    /// Load a manifest; `~` and `$VARS` in the path are expanded
    pub fn load(path: &Path) -> Result<Self> {
        let raw = path.to_string_lossy();
        let expanded = shellexpand::full(&raw)
            .with_context(|| format!("Could not expand {}", path.display()))?;
        let path = PathBuf::from(expanded.as_ref());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Names must be non-empty and unique; they are the adoption key
    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.api_keys {
            if spec.name.trim().is_empty() {
                bail!("api_key entry with empty name");
            }
            if !seen.insert(spec.name.as_str()) {
                bail!("duplicate api_key name '{}'", spec.name);
            }
        }
        Ok(())
    }
}
