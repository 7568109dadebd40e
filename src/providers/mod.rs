//! LLM provider abstraction.
//!
//! Every backend is reached through the [`ChatModel`] trait: send a batch of
//! role-tagged messages, receive text. The [`registry`] decides which providers are
//! usable and builds handles for them.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod registry;

pub use registry::{
    available_providers, create, is_usable_credential, select, ProviderDescriptor,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unsupported provider: {0}")]
    UnknownProvider(String),
    #[error("API key not found for {0}")]
    MissingCredential(ProviderKind),
    #[error("no LLM provider is available; add an API key for at least one provider")]
    NoProviderAvailable,
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected LLM response: {0}")]
    InvalidResponse(String),
}

/// Known provider backends, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "azure_openai")]
    AzureOpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "google")]
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::AzureOpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::AzureOpenAi => "azure_openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProviderError::UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = ProviderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A model bound to a provider, model name and temperature
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages and return the model's reply text
    async fn invoke(&self, messages: &[Message]) -> Result<String, ProviderError>;

    fn provider(&self) -> ProviderKind;

    fn model(&self) -> &str;
}

pub type ModelHandle = Arc<dyn ChatModel>;

/// Where provider credentials are looked up
#[derive(Debug, Clone, Default)]
pub enum CredentialSource {
    /// Process environment variables
    #[default]
    Environment,
    /// A fixed set of variables
    Fixed(HashMap<String, String>),
}

impl CredentialSource {
    pub fn lookup(&self, key: &str) -> Option<String> {
        match self {
            CredentialSource::Environment => std::env::var(key).ok(),
            CredentialSource::Fixed(vars) => vars.get(key).cloned(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CredentialSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        CredentialSource::Fixed(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Send a prepared request and decode a JSON body, turning non-2xx statuses into errors
async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}
