//! Application configuration for chatdesk.
//!
//! User config lives at `~/.chatdesk/chatdesk.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! Credentials are never stored in the file — the config holds the *names* of
//! the environment variables that carry them, resolved at client build time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChatdeskError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "chatdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".chatdesk";

// ---------------------------------------------------------------------------
// Config structs (matching chatdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend endpoint settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Chat session behavior.
    #[serde(default)]
    pub session: SessionConfig,

    /// Scrape/upload ingestion behavior.
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

/// `[backend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the support backend API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the tenant API key (widget calls).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the administrator bearer token.
    #[serde(default = "default_bearer_token_env")]
    pub bearer_token_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            bearer_token_env: default_bearer_token_env(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_api_key_env() -> String {
    "CHATDESK_API_KEY".into()
}
fn default_bearer_token_env() -> String {
    "CHATDESK_ADMIN_TOKEN".into()
}

/// `[session]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pause before the greeting lands after an explicit department
    /// selection, in milliseconds (simulated pacing).
    #[serde(default = "default_greeting_delay_ms")]
    pub greeting_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting_delay_ms: default_greeting_delay_ms(),
        }
    }
}

fn default_greeting_delay_ms() -> u64 {
    600
}

/// `[ingestion]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Optional timeout for scrape/upload calls, in seconds.
    ///
    /// `None` means no timeout: a hung request leaves the loading flag set
    /// until the process exits, matching the backend's contract of having no
    /// cancellation protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.chatdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChatdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.chatdesk/chatdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChatdeskError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ChatdeskError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChatdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChatdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChatdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve a credential from the env var named in the config.
pub fn resolve_credential(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ChatdeskError::config(format!(
            "credential not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("CHATDESK_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.session.greeting_delay_ms, 600);
        assert_eq!(parsed.backend.api_key_env, "CHATDESK_API_KEY");
        assert!(parsed.ingestion.timeout_secs.is_none());
    }

    #[test]
    fn ingestion_timeout_is_configurable() {
        let toml_str = r#"
[backend]
base_url = "https://support.example.com/api"

[ingestion]
timeout_secs = 45
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ingestion.timeout_secs, Some(45));
        assert_eq!(config.backend.base_url, "https://support.example.com/api");
    }

    #[test]
    fn credential_resolution_fails_when_unset() {
        // Use a unique env var name to avoid interfering with other tests
        let result = resolve_credential("CHATDESK_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("credential not found")
        );
    }
}
