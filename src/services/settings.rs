use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const SETTINGS_VERSION: u32 = 1;
pub const DEFAULT_ENDPOINT: &str = "https://control.steward.dev";
pub const DEFAULT_TOKEN_ENV: &str = "STEWARD_TOKEN";
pub const DEFAULT_ENGINE_BINARY: &str = "machine-config";

/// Resolved once at startup; every optional capability is an explicit field
/// here instead of a per-call probe.
#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_settings_version")]
    pub version: u32,
    #[serde(default)]
    pub cloud: CloudSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

#[derive(Debug, Deserialize)]
pub struct CloudSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub storage_account: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub binary: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ToolSettings {
    #[serde(default)]
    pub index_url: Option<String>,
    #[serde(default)]
    pub registry: Option<PathBuf>,
}

fn default_settings_version() -> u32 {
    SETTINGS_VERSION
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            cloud: CloudSettings::default(),
            engine: EngineSettings::default(),
            tools: ToolSettings::default(),
        }
    }
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            timeout_ms: default_timeout_ms(),
            storage_account: None,
        }
    }
}

impl Settings {
    /// Load from an explicit `--config` path (which must exist) or from
    /// `~/.config/steward/config.toml`, falling back to defaults when the
    /// default file is absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Settings> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let p = default_config_path()?;
                if !p.exists() {
                    return Ok(Settings::default());
                }
                p
            }
        };

        let raw = std::fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&raw)?;
        if settings.version != SETTINGS_VERSION {
            anyhow::bail!(
                "unsupported config version {} in {} (expected {})",
                settings.version,
                path.display(),
                SETTINGS_VERSION
            );
        }
        Ok(settings)
    }

    pub fn engine_root(&self) -> anyhow::Result<PathBuf> {
        match &self.engine.root {
            Some(root) => Ok(root.clone()),
            None => Ok(data_dir()?.join("engine")),
        }
    }

    pub fn engine_binary(&self) -> PathBuf {
        self.engine
            .binary
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_BINARY))
    }

    pub fn tools_registry(&self) -> anyhow::Result<PathBuf> {
        match &self.tools.registry {
            Some(registry) => Ok(registry.clone()),
            None => Ok(data_dir()?.join("tools")),
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".config/steward/config.toml"))
}

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("steward"))
}

#[cfg(test)]
mod tests {
    use super::{Settings, DEFAULT_ENDPOINT, DEFAULT_TOKEN_ENV};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn explicit_file_overrides_defaults() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"version = 1

[cloud]
endpoint = "https://control.example.test"
storage_account = "opsartifacts"

[engine]
root = "/opt/machine-config"
"#,
        )
        .expect("write config");

        let settings = Settings::load(Some(&path)).expect("load config");
        assert_eq!(settings.cloud.endpoint, "https://control.example.test");
        assert_eq!(settings.cloud.token_env, DEFAULT_TOKEN_ENV);
        assert_eq!(
            settings.cloud.storage_account.as_deref(),
            Some("opsartifacts")
        );
        assert_eq!(
            settings.engine_root().expect("engine root"),
            PathBuf::from("/opt/machine-config")
        );
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        assert!(Settings::load(Some(&PathBuf::from("/nonexistent/config.toml"))).is_err());
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("config.toml");
        fs::write(&path, "version = 9\n").expect("write config");
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.cloud.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.cloud.timeout_ms, 30_000);
        assert!(settings.cloud.storage_account.is_none());
    }
}
