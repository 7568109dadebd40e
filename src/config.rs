//! Configuration loading and management for pagebrief.
//!
//! Loads settings from `pagebrief.toml`. Provider credentials are never stored in the
//! file itself: each provider names the environment variable holding its key.

use crate::providers::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = "pagebrief.toml";
const PROMPTS_FILE: &str = "prompts.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Page retrieval and extraction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub user_agent: String,
    /// Requested fetch timeout in seconds; capped at 10 when fetching
    pub timeout_secs: u64,
    /// Maximum number of response body bytes read before parsing
    pub max_content_size: usize,
    /// Maximum number of characters of extracted text handed to the model
    pub max_text_chars: usize,
}

/// Model invocation settings shared by all providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub request_timeout_secs: u64,
    /// Number of past exchanges sent along with a follow-up question
    pub memory_window: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on live sessions; unbounded when absent
    #[serde(default)]
    pub max_sessions: Option<usize>,
}

/// Per-provider settings, keyed by provider name in `[providers.<name>]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub models: Vec<String>,
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the endpoint (Azure OpenAI only)
    #[serde(default)]
    pub endpoint_env: Option<String>,
    /// API version query parameter (Azure OpenAI only)
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Cosmetic settings for the terminal client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub page_title: String,
    pub page_icon: String,
    /// Base URL of the API the client talks to
    pub api_url: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<ProviderKind, ProviderConfig>,
    #[serde(default)]
    pub ui: UiConfig,
    /// Path to the prompt document, relative to the config file
    #[serde(default)]
    pub prompts_file: Option<PathBuf>,
    /// Directory the config was loaded from
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// A system prompt entry in the prompt document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSection {
    pub system: String,
}

/// Prompt text used to instruct the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompts {
    pub summarize: PromptSection,
    pub conversation: PromptSection,
}

impl Config {
    /// Load configuration from the default location (pagebrief.toml in cwd or home).
    ///
    /// Falls back to built-in defaults when no config file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::info!("no {} found, using built-in defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("pagebrief")
            .join(CONFIG_FILE);
        home_config.exists().then_some(home_config)
    }

    /// Resolve the prompt document path against the config directory
    fn prompts_path(&self) -> PathBuf {
        let file = self
            .prompts_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(PROMPTS_FILE));
        match &self.base_dir {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file,
        }
    }

    /// Load the prompt document, using the built-in prompts when it is missing
    pub fn prompts(&self) -> Result<Prompts, ConfigError> {
        let path = self.prompts_path();
        if !path.exists() {
            return Ok(Prompts::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Provider settings by kind, if configured
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.get(&kind)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scraping: ScrapingConfig::default(),
            llm: LlmConfig::default(),
            sessions: SessionConfig::default(),
            providers: default_providers(),
            ui: UiConfig::default(),
            prompts_file: None,
            base_dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("pagebrief/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            max_content_size: 1024 * 1024,
            max_text_chars: 8000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            memory_window: 3,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_title: "Webpage Summarizer".to_string(),
            page_icon: "📄".to_string(),
            api_url: "http://localhost:8000".to_string(),
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            summarize: PromptSection {
                system: "You are an expert analyst who writes thorough, factual summaries of web content. \
                         Identify the main topic in 3-6 descriptive words and write a comprehensive summary \
                         of 8-10 substantial paragraphs covering specific facts, dates, numbers and quotes."
                    .to_string(),
            },
            conversation: PromptSection {
                system: "The following is a friendly conversation between a human and an AI. \
                         The AI answers questions about a webpage it has summarized, using specific \
                         details from the summary. If the AI does not know the answer, it says so."
                    .to_string(),
            },
        }
    }
}

fn default_temperature() -> f32 {
    0.3
}

fn provider(api_key_env: &str, models: &[&str]) -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        api_key_env: api_key_env.to_string(),
        models: models.iter().map(|m| m.to_string()).collect(),
        default_model: models[0].to_string(),
        temperature: default_temperature(),
        base_url: None,
        endpoint_env: None,
        api_version: None,
    }
}

fn default_providers() -> BTreeMap<ProviderKind, ProviderConfig> {
    let mut azure = provider("AZURE_OPENAI_API_KEY", &["gpt-4o-mini", "gpt-4o"]);
    azure.endpoint_env = Some("AZURE_OPENAI_ENDPOINT".to_string());
    azure.api_version = Some("2024-02-15-preview".to_string());

    BTreeMap::from([
        (
            ProviderKind::OpenAi,
            provider("OPENAI_API_KEY", &["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini"]),
        ),
        (ProviderKind::AzureOpenAi, azure),
        (
            ProviderKind::Anthropic,
            provider(
                "ANTHROPIC_API_KEY",
                &["claude-3-5-haiku-latest", "claude-3-5-sonnet-latest"],
            ),
        ),
        (
            ProviderKind::Google,
            provider(
                "GOOGLE_API_KEY",
                &["gemini-2.0-flash", "gemini-2.5-flash", "gemini-2.5-pro"],
            ),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_every_provider() {
        let config = Config::default();
        assert_eq!(config.providers.len(), 4);
        assert_eq!(config.llm.memory_window, 3);
        assert_eq!(config.server.port, 8000);
        let azure = config.provider(ProviderKind::AzureOpenAi).unwrap();
        assert_eq!(azure.endpoint_env.as_deref(), Some("AZURE_OPENAI_ENDPOINT"));
    }

    #[test]
    fn loads_partial_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[scraping]
user_agent = "test-agent"
timeout_secs = 5
max_content_size = 2048
max_text_chars = 500

[providers.openai]
enabled = true
api_key_env = "TEST_OPENAI_KEY"
models = ["gpt-4o-mini"]
default_model = "gpt-4o-mini"
temperature = 0.0
base_url = "http://localhost:9999/v1"
"#
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.scraping.user_agent, "test-agent");
        assert_eq!(config.scraping.max_text_chars, 500);
        assert_eq!(config.providers.len(), 1);
        let openai = config.provider(ProviderKind::OpenAi).unwrap();
        assert_eq!(openai.base_url.as_deref(), Some("http://localhost:9999/v1"));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[server]\nport = 9100\n\n[scraping]\nmax_text_chars = 4000\n\n[llm]\nmemory_window = 5\n\n[ui]\napi_url = \"http://api:9100\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, defaults.server.host);
        assert_eq!(config.scraping.max_text_chars, 4000);
        assert_eq!(config.scraping.user_agent, defaults.scraping.user_agent);
        assert_eq!(config.scraping.timeout_secs, 30);
        assert_eq!(config.scraping.max_content_size, 1024 * 1024);
        assert_eq!(config.llm.memory_window, 5);
        assert_eq!(config.llm.request_timeout_secs, 300);
        assert_eq!(config.ui.api_url, "http://api:9100");
        assert_eq!(config.ui.page_title, defaults.ui.page_title);
    }

    #[test]
    fn prompts_fall_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            base_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let prompts = config.prompts().unwrap();
        assert!(prompts.summarize.system.contains("3-6 descriptive words"));
    }

    #[test]
    fn prompts_read_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROMPTS_FILE),
            "[summarize]\nsystem = \"Summarize.\"\n\n[conversation]\nsystem = \"Chat.\"\n",
        )
        .unwrap();
        let config = Config {
            base_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let prompts = config.prompts().unwrap();
        assert_eq!(prompts.summarize.system, "Summarize.");
        assert_eq!(prompts.conversation.system, "Chat.");
    }

    #[test]
    fn rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
