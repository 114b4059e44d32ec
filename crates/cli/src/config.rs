//! `.mission/config.toml` loading.
//!
//! Precedence, lowest first: file, `MISSION_API_URL` / `MISSION_API_TOKEN`,
//! command-line flags.

use anyhow::{Context, Result};
use mission_client::ClientConfig;
use mission_core::ReceiptLinks;
use orchestrator::{OrchestratorConfig, PollConfig, ReceiptConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MISSION_DIR: &str = ".mission";
pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_API_URL: &str = "MISSION_API_URL";
pub const ENV_API_TOKEN: &str = "MISSION_API_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub api: ApiConfig,
    pub mission: MissionSettings,
    pub receipts: ReceiptSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionSettings {
    pub require_simulation: bool,
    pub send_history: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert: Option<bool>,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for MissionSettings {
    fn default() -> Self {
        let poll = PollConfig::default();
        Self {
            require_simulation: true,
            send_history: true,
            expert: None,
            poll_interval_ms: poll.interval.as_millis() as u64,
            max_attempts: poll.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptSettings {
    pub max_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Directory holding the receipt history. Defaults to `.mission/` when
    /// present, else the user data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        let links = OrchestratorConfig::default().links;
        Self {
            max_entries: ReceiptConfig::default().max_entries,
            gateway_url: links.gateway_url,
            explorer_url: links.explorer_url,
            dir: None,
        }
    }
}

impl MissionConfig {
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(MISSION_DIR).join(CONFIG_FILE)
    }

    /// Read the config under `root`, or defaults when there is none.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Overlay environment variables, then explicit flags.
    pub fn apply_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
        url: Option<String>,
        token: Option<String>,
    ) {
        if let Some(value) = env(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.url = Some(value);
        }
        if let Some(value) = env(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.api.token = Some(value);
        }
        if url.is_some() {
            self.api.url = url;
        }
        if token.is_some() {
            self.api.token = token;
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default().with_timeout(Duration::from_secs(self.api.timeout_secs));
        config.base_url = self.api.url.clone();
        config.auth_token = self.api.token.clone();
        config
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let settings = &self.mission;
        let mut config = OrchestratorConfig::default()
            .with_simulation_gate(settings.require_simulation)
            .with_history(settings.send_history)
            .with_poll(
                Duration::from_millis(settings.poll_interval_ms),
                settings.max_attempts,
            )
            .with_links(ReceiptLinks::new(
                self.receipts.gateway_url.clone(),
                self.receipts.explorer_url.clone(),
            ));
        if let Some(expert) = settings.expert {
            config = config.with_expert(expert);
        }
        config
    }

    pub fn receipt_config(&self) -> ReceiptConfig {
        ReceiptConfig {
            max_entries: self.receipts.max_entries,
            ..Default::default()
        }
    }

    /// Where receipt history lives for a project rooted at `root`.
    pub fn receipts_dir(&self, root: &Path) -> PathBuf {
        if let Some(dir) = &self.receipts.dir {
            return root.join(dir);
        }

        let local = root.join(MISSION_DIR);
        if local.exists() {
            return local;
        }

        dirs::data_local_dir()
            .map(|dir| dir.join("mission"))
            .unwrap_or(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = MissionConfig::load(temp_dir.path()).await.unwrap();

        assert!(config.api.url.is_none());
        assert!(config.mission.require_simulation);
        assert_eq!(config.mission.poll_interval_ms, 1500);
        assert_eq!(config.receipts.max_entries, 5);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(MISSION_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(CONFIG_FILE),
            "[api]\nurl = \"https://api.example\"\n\n[mission]\nrequire_simulation = false\n",
        )
        .unwrap();

        let config = MissionConfig::load(temp_dir.path()).await.unwrap();
        assert_eq!(config.api.url.as_deref(), Some("https://api.example"));
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.orchestrator_config().require_simulation);
        assert_eq!(config.orchestrator_config().poll.max_attempts, 40);
        assert_eq!(config.receipts_dir(temp_dir.path()), dir);
        assert_eq!(config.receipt_config().max_entries, 5);
    }

    #[test]
    fn test_overrides_precedence() {
        let mut config = MissionConfig::default();
        config.api.url = Some("https://file.example".to_string());

        let env = |key: &str| match key {
            ENV_API_URL => Some("https://env.example".to_string()),
            ENV_API_TOKEN => Some("env-token".to_string()),
            _ => None,
        };
        config.apply_overrides(env, None, Some("flag-token".to_string()));

        assert_eq!(config.api.url.as_deref(), Some("https://env.example"));
        assert_eq!(config.api.token.as_deref(), Some("flag-token"));

        let client = config.client_config();
        assert!(client.is_configured());
    }

    #[test]
    fn test_default_config_serializes() {
        let content = toml::to_string_pretty(&MissionConfig::default()).unwrap();
        let parsed: MissionConfig = toml::from_str(&content).unwrap();
        assert_eq!(
            parsed.receipts.gateway_url,
            OrchestratorConfig::default().links.gateway_url
        );
    }
}
