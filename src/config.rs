use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub slack: SlackConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub standup: StandupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlackConfig {
    /// App-level token (`xapp-...`) used for Socket Mode connections.
    pub app_token: String,
    /// Bot token (`xoxb-...`) used for Web API calls.
    pub bot_token: String,
    /// If non-empty, only these user IDs can trigger a standup.
    #[serde(default)]
    pub allowed_user_ids: Vec<String>,
    #[serde(default = "default_use_threads")]
    pub use_threads: bool,
}

fn default_use_threads() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: String,
    /// "owner/name" slug. Leave empty to run without GitHub enrichment.
    #[serde(default)]
    pub repository: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

fn default_base_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    "standup-cache".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StandupConfig {
    /// How many recent channel messages to pull in as context.
    #[serde(default = "default_history_limit")]
    pub history_limit: u64,
    #[serde(default = "default_true")]
    pub include_channel_history: bool,
    #[serde(default = "default_true")]
    pub include_repo_activity: bool,
    /// Upper bound on model round-trips when the model keeps calling tools.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
}

impl Default for StandupConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            include_channel_history: default_true(),
            include_repo_activity: default_true(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_history_limit() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_max_tool_iterations() -> u32 {
    8
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check required credentials up front. The daemon must not serve
    /// traffic with an incomplete configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider.api_key.trim().is_empty() {
            anyhow::bail!("provider.api_key is missing. Set it in config.toml.");
        }
        if self.slack.app_token.trim().is_empty() {
            anyhow::bail!("slack.app_token is missing. Create an app-level token with the connections:write scope.");
        }
        if self.slack.bot_token.trim().is_empty() {
            anyhow::bail!("slack.bot_token is missing. Install the app to your workspace to get one.");
        }
        if !self.github.repository.is_empty() {
            if self.github.token.trim().is_empty() {
                anyhow::bail!(
                    "github.repository is set but github.token is missing. \
                     Provide a token or clear the repository to disable GitHub enrichment."
                );
            }
            let parts: Vec<&str> = self.github.repository.split('/').collect();
            if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
                anyhow::bail!(
                    "github.repository '{}' is not an owner/name slug.",
                    self.github.repository
                );
            }
        }
        if self.standup.max_tool_iterations == 0 {
            anyhow::bail!("standup.max_tool_iterations must be at least 1.");
        }
        Ok(())
    }
}
