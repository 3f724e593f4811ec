//! Ollama HTTP API wire types
//!
//! `POST /api/generate` for completions, `GET /api/tags` for installed models.

use core_formulas::GenerationRequest;
use serde::{Deserialize, Serialize};

pub const GENERATE_PATH: &str = "/api/generate";
pub const TAGS_PATH: &str = "/api/tags";

/// Generate request to Ollama
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Sampling options
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
}

impl From<&GenerationRequest> for GenerateRequest {
    fn from(req: &GenerationRequest) -> Self {
        Self {
            model: req.model.clone(),
            prompt: req.prompt.clone(),
            stream: false,
            options: GenerateOptions {
                temperature: req.temperature,
            },
        }
    }
}

/// Generate response from Ollama
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Installed models listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}
