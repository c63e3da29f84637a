use crate::classify::DEFAULT_VENDOR_TOKEN;
use crate::resolve::generic_driver::DEFAULT_ENVIRONMENT_FILE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level gfxprep configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GfxprepConfig {
    pub vendor: VendorConfig,
    pub environment: EnvironmentConfig,
    pub boot: BootConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Case-insensitive substring the DMI vendor string must contain.
    pub token: String,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_VENDOR_TOKEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// File that receives the session environment block.
    pub file: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_ENVIRONMENT_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    /// Program and arguments that rebuild the initramfs.
    pub command: Vec<String>,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            command: vec!["dracut".to_string(), "--force".to_string()],
        }
    }
}

const SYSTEM_CONFIG: &str = "/etc/gfxprep/config.toml";

fn read_value(path: &Path) -> Option<toml::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("ignoring unparsable config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Load the system config file if it exists.
fn load_system() -> Option<toml::Value> {
    read_value(Path::new(SYSTEM_CONFIG))
}

/// Load the user config file (~/.config/gfxprep/config.toml) if it exists.
fn load_user() -> Option<toml::Value> {
    let dir = dirs::config_dir()?;
    read_value(&dir.join("gfxprep").join("config.toml"))
}

/// Recursively merge two TOML values. Tables are merged key-by-key;
/// all other types in `overlay` replace `base`.
fn merge_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load config from a specific path, ignoring system/user files.
fn load_from_path(path: &Path) -> GfxprepConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("failed to parse config at {}: {}", path.display(), e);
            GfxprepConfig::default()
        }),
        Err(e) => {
            tracing::warn!("failed to read config at {}: {}", path.display(), e);
            GfxprepConfig::default()
        }
    }
}

/// Load the merged config: system defaults, then user overrides.
/// If `override_path` is provided, use only that file instead.
pub fn load(override_path: Option<&PathBuf>) -> GfxprepConfig {
    if let Some(path) = override_path {
        return load_from_path(path);
    }

    let merged = match (load_system(), load_user()) {
        (Some(s), Some(u)) => Some(merge_values(s, u)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    };

    match merged {
        Some(value) => value.try_into().unwrap_or_else(|e| {
            tracing::warn!("failed to deserialize config: {}", e);
            GfxprepConfig::default()
        }),
        None => GfxprepConfig::default(),
    }
}
