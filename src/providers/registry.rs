//! Provider availability and model handle construction.
//!
//! Availability is recomputed from configuration and credentials on every call, so
//! adding or removing an API key takes effect without a restart.

use super::anthropic::AnthropicModel;
use super::gemini::GeminiChat;
use super::openai::{OpenAiModel, DEFAULT_AZURE_API_VERSION};
use super::{CredentialSource, ModelHandle, ProviderError, ProviderKind};
use crate::config::{Config, ProviderConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Values starting with this are unfilled templates, not real credentials
const PLACEHOLDER_PREFIX: &str = "your_";
const MIN_CREDENTIAL_CHARS: usize = 10;

/// A provider that is configured, enabled and has credentials
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDescriptor {
    pub name: ProviderKind,
    pub models: Vec<String>,
    pub default_model: String,
    pub temperature: f32,
}

struct Credentials {
    api_key: String,
    endpoint: Option<String>,
}

/// Whether a credential value looks real rather than empty or a template placeholder
pub fn is_usable_credential(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !value.starts_with(PLACEHOLDER_PREFIX)
        && value.chars().count() >= MIN_CREDENTIAL_CHARS
}

fn is_usable_endpoint(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with(PLACEHOLDER_PREFIX)
}

/// Resolve the credentials a provider needs, if all of them are present
fn resolve(
    kind: ProviderKind,
    provider: &ProviderConfig,
    credentials: &CredentialSource,
) -> Option<Credentials> {
    let api_key = credentials
        .lookup(&provider.api_key_env)
        .map(|key| key.trim().to_string())
        .filter(|key| is_usable_credential(key))?;

    let endpoint = match kind {
        ProviderKind::AzureOpenAi => {
            let endpoint = provider
                .endpoint_env
                .as_deref()
                .and_then(|env| credentials.lookup(env))
                .map(|endpoint| endpoint.trim().to_string())
                .filter(|endpoint| is_usable_endpoint(endpoint))?;
            Some(endpoint)
        }
        _ => None,
    };

    Some(Credentials { api_key, endpoint })
}

/// Providers that are enabled and have usable credentials, in registry order
pub fn available_providers(
    config: &Config,
    credentials: &CredentialSource,
) -> BTreeMap<ProviderKind, ProviderDescriptor> {
    config
        .providers
        .iter()
        .filter(|(_, provider)| provider.enabled)
        .filter(|(kind, provider)| resolve(**kind, provider, credentials).is_some())
        .map(|(kind, provider)| {
            (
                *kind,
                ProviderDescriptor {
                    name: *kind,
                    models: provider.models.clone(),
                    default_model: provider.default_model.clone(),
                    temperature: provider.temperature,
                },
            )
        })
        .collect()
}

/// Pick the provider and model for a request.
///
/// A requested provider is honoured when available; its requested model is used when
/// supported, otherwise its default. Without a usable request the first available
/// provider and its default model are used.
pub fn select(
    available: &BTreeMap<ProviderKind, ProviderDescriptor>,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<(ProviderKind, String), ProviderError> {
    let requested = provider
        .and_then(|name| name.parse::<ProviderKind>().ok())
        .and_then(|kind| available.get(&kind));

    if let Some(descriptor) = requested {
        let model = model
            .filter(|m| descriptor.models.iter().any(|supported| supported.as_str() == *m))
            .unwrap_or(&descriptor.default_model);
        return Ok((descriptor.name, model.to_string()));
    }

    available
        .values()
        .next()
        .map(|descriptor| (descriptor.name, descriptor.default_model.clone()))
        .ok_or(ProviderError::NoProviderAvailable)
}

/// Build a model handle for a provider and model name
pub fn create(
    provider_name: &str,
    model_name: &str,
    config: &Config,
    credentials: &CredentialSource,
) -> Result<ModelHandle, ProviderError> {
    let kind: ProviderKind = provider_name.parse()?;
    let provider = config
        .provider(kind)
        .ok_or_else(|| ProviderError::UnknownProvider(provider_name.to_string()))?;
    let creds =
        resolve(kind, provider, credentials).ok_or(ProviderError::MissingCredential(kind))?;

    let timeout = Duration::from_secs(config.llm.request_timeout_secs);
    let temperature = provider.temperature;
    let base_url = provider.base_url.as_deref();

    let handle: ModelHandle = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiModel::new(
            &creds.api_key,
            model_name,
            temperature,
            base_url,
            timeout,
        )?),
        ProviderKind::AzureOpenAi => {
            let endpoint = creds
                .endpoint
                .ok_or(ProviderError::MissingCredential(kind))?;
            Arc::new(OpenAiModel::azure(
                &creds.api_key,
                &endpoint,
                provider
                    .api_version
                    .as_deref()
                    .unwrap_or(DEFAULT_AZURE_API_VERSION),
                model_name,
                temperature,
                timeout,
            )?)
        }
        ProviderKind::Anthropic => Arc::new(AnthropicModel::new(
            &creds.api_key,
            model_name,
            temperature,
            base_url,
            timeout,
        )?),
        ProviderKind::Google => Arc::new(GeminiChat::new(&creds.api_key, model_name, temperature)?),
    };

    tracing::info!(provider = %kind, model = model_name, "created model handle");
    Ok(handle)
}
