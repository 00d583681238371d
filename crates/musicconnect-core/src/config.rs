use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use musicconnect_memory::{validate_key, STORAGE_KEY};
use musicconnect_provider::ProviderConfig;
use serde::{Deserialize, Serialize};

fn default_app_name() -> String {
    "musicconnect".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

fn default_provider() -> ProviderConfig {
    ProviderConfig::default().with_api_key("${GEMINI_API_KEY}")
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_storage_key() -> String {
    STORAGE_KEY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Relative paths resolve against the config root.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            key: default_storage_key(),
        }
    }
}

impl StorageConfig {
    pub fn data_path(&self, root: &Path) -> PathBuf {
        let dir = Path::new(&self.data_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            root.join(dir)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MusicConnectConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default = "default_provider")]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for MusicConnectConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            provider: default_provider(),
            storage: StorageConfig::default(),
        }
    }
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Loads `<config_dir>/main.yaml`, falling back to defaults when the file is absent.
pub fn load_config(config_dir: &Path) -> Result<MusicConnectConfig> {
    let path = config_dir.join("main.yaml");
    let mut config = if path.exists() {
        read_yaml_file::<MusicConnectConfig>(&path)?
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        MusicConnectConfig::default()
    };

    resolve_config_env(&mut config);
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &MusicConnectConfig) -> Result<()> {
    if config.provider.model.trim().is_empty() {
        return Err(anyhow!("provider.model must not be empty"));
    }
    if config.provider.timeout_secs == 0 {
        return Err(anyhow!("provider.timeout_secs must be greater than zero"));
    }
    if config.provider.max_output_tokens == 0 {
        return Err(anyhow!("provider.max_output_tokens must be greater than zero"));
    }
    if config.storage.key.trim().is_empty() {
        return Err(anyhow!("storage.key must not be empty"));
    }
    validate_key(&config.storage.key).context("storage.key")?;
    Ok(())
}

fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

fn resolve_config_env(config: &mut MusicConnectConfig) {
    config.app.name = resolve_env_var(&config.app.name);

    let provider = &mut config.provider;
    if let Some(key) = &mut provider.api_key {
        *key = resolve_env_var(key);
    }
    provider.model = resolve_env_var(&provider.model);
    if let Some(base_url) = &mut provider.base_url {
        *base_url = resolve_env_var(base_url);
    }

    config.storage.data_dir = resolve_env_var(&config.storage.data_dir);
    config.storage.key = resolve_env_var(&config.storage.key);
}
