//! Application state shared across all request handlers.

use crate::config::{Config, ConfigError};
use crate::providers::CredentialSource;
use crate::session::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the configuration comes from on each request
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Re-read from disk on every request; `None` searches the default locations
    File(Option<PathBuf>),
    /// A fixed, in-memory configuration
    Fixed(Config),
}

impl ConfigSource {
    pub fn load(&self) -> Result<Config, ConfigError> {
        match self {
            ConfigSource::File(Some(path)) => Config::load_from(path),
            ConfigSource::File(None) => Config::load(),
            ConfigSource::Fixed(config) => Ok(config.clone()),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub config: ConfigSource,
    pub credentials: CredentialSource,
    pub sessions: SessionStore,
    /// Client used for page fetches
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The session store takes its prompt, memory window and capacity from the
    /// configuration as it is at startup.
    ///
    /// # Errors
    /// Returns an error if the configuration or prompts cannot be read, or the HTTP
    /// client cannot be built.
    pub fn new(
        config: ConfigSource,
        credentials: CredentialSource,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let initial = config.load()?;
        let prompts = initial.prompts()?;
        let sessions = SessionStore::new(prompts.conversation.system)
            .with_window(initial.llm.memory_window)
            .with_max_sessions(initial.sessions.max_sessions);
        let http = crate::scraper::create_client()?;

        Ok(Arc::new(Self {
            config,
            credentials,
            sessions,
            http,
        }))
    }
}
