//! Backend selection and request/response translation
//!
//! Both servers are driven through the same contract: a
//! [`GenerationRequest`] goes in, plain text comes out. This module owns the
//! two JSON shapes on either side of that contract.

use crate::error::BridgeError;
use crate::{lmstudio, ollama};
use core_formulas::{AddinConfig, GenerationRequest, Service};
use reqwest::Url;

/// Port LM Studio's local server listens on by default
pub const LM_STUDIO_PORT: u16 = 1234;

/// Wire protocol spoken by the configured server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Ollama,
    LmStudio,
}

impl Backend {
    /// Pick the protocol for a configuration
    ///
    /// LM Studio is chosen when configured explicitly or when the URL points
    /// at its default port; everything else is treated as Ollama.
    pub fn select(config: &AddinConfig) -> Self {
        if config.service == Service::LmStudio || targets_lm_studio_port(&config.api_url) {
            Backend::LmStudio
        } else {
            Backend::Ollama
        }
    }

    pub fn service(&self) -> Service {
        match self {
            Backend::Ollama => Service::Ollama,
            Backend::LmStudio => Service::LmStudio,
        }
    }

    pub fn generate_url(&self, base_url: &str) -> String {
        let path = match self {
            Backend::Ollama => ollama::GENERATE_PATH,
            Backend::LmStudio => lmstudio::CHAT_COMPLETIONS_PATH,
        };
        join(base_url, path)
    }

    pub fn models_url(&self, base_url: &str) -> String {
        let path = match self {
            Backend::Ollama => ollama::TAGS_PATH,
            Backend::LmStudio => lmstudio::MODELS_PATH,
        };
        join(base_url, path)
    }

    /// Build the backend-specific request body
    pub fn encode(&self, req: &GenerationRequest) -> Result<serde_json::Value, BridgeError> {
        let value = match self {
            Backend::Ollama => serde_json::to_value(ollama::GenerateRequest::from(req)),
            Backend::LmStudio => serde_json::to_value(lmstudio::ChatCompletionRequest::from(req)),
        };
        value.map_err(|e| BridgeError::Client(e.to_string()))
    }

    /// Extract generated text from a successful response body
    pub fn decode(&self, body: &str) -> Result<String, BridgeError> {
        let empty = BridgeError::EmptyResponse {
            service: self.service(),
        };

        match self {
            Backend::Ollama => {
                let Ok(parsed) = serde_json::from_str::<ollama::GenerateResponse>(body) else {
                    return Err(empty);
                };
                match (parsed.response, parsed.error) {
                    (Some(text), _) => Ok(text),
                    (None, Some(message)) => Err(BridgeError::Backend(message)),
                    (None, None) => Err(empty),
                }
            }
            Backend::LmStudio => {
                let Ok(parsed) = serde_json::from_str::<lmstudio::ChatCompletionResponse>(body)
                else {
                    return Err(empty);
                };
                let error = parsed.error.clone().and_then(|e| e.message);
                match (parsed.first_content(), error) {
                    (Some(text), _) => Ok(text),
                    (None, Some(message)) => Err(BridgeError::Backend(message)),
                    (None, None) => Err(empty),
                }
            }
        }
    }

    /// Model names from a listing response; malformed bodies list nothing
    pub fn decode_models(&self, body: &str) -> Vec<String> {
        match self {
            Backend::Ollama => serde_json::from_str::<ollama::TagsResponse>(body)
                .map(|tags| tags.models.into_iter().map(|m| m.name).collect())
                .unwrap_or_default(),
            Backend::LmStudio => serde_json::from_str::<lmstudio::ModelsResponse>(body)
                .map(|models| models.data.into_iter().map(|m| m.id).collect())
                .unwrap_or_default(),
        }
    }
}

fn targets_lm_studio_port(api_url: &str) -> bool {
    let api_url = api_url.trim();
    match Url::parse(api_url) {
        Ok(url) if url.host().is_some() => url.port() == Some(LM_STUDIO_PORT),
        // "localhost:1234" parses with "localhost" as the scheme
        _ => bare_authority_port(api_url) == Some(LM_STUDIO_PORT),
    }
}

/// Port of a scheme-less `host:port[/path]` address
fn bare_authority_port(api_url: &str) -> Option<u16> {
    let authority = api_url.split('/').next()?;
    let (_, port) = authority.rsplit_once(':')?;
    port.parse().ok()
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim().trim_end_matches('/'), path)
}
