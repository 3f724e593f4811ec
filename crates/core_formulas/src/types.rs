//! Core types shared by the formula layer and the LLM bridge

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default temperature for `AI.CHAT` when none is given
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Local language-model server flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Ollama (`/api/generate`, `/api/tags`)
    #[default]
    Ollama,
    /// LM Studio, OpenAI-compatible (`/v1/chat/completions`, `/v1/models`)
    LmStudio,
}

impl Service {
    /// Token written to the config file
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Ollama => "ollama",
            Service::LmStudio => "lmstudio",
        }
    }

    /// Human-readable product name
    pub fn label(&self) -> &'static str {
        match self {
            Service::Ollama => "Ollama",
            Service::LmStudio => "LM Studio",
        }
    }

    /// Where the service listens out of the box
    pub fn default_url(&self) -> &'static str {
        match self {
            Service::Ollama => "http://localhost:11434",
            Service::LmStudio => "http://localhost:1234",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a service name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service '{0}' (expected 'ollama' or 'lmstudio')")]
pub struct UnknownService(pub String);

impl FromStr for Service {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Service::Ollama),
            "lmstudio" => Ok(Service::LmStudio),
            other => Err(UnknownService(other.to_string())),
        }
    }
}

/// A single generation call, backend independent
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    /// Always within `0.0..=1.0`
    pub temperature: f64,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, temperature: f64) -> Self {
        let temperature = if temperature.is_finite() {
            temperature.clamp(0.0, 1.0)
        } else {
            DEFAULT_TEMPERATURE
        };

        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature,
        }
    }
}

/// Value of one cell in a data range
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Parse a raw field: blank, number, boolean, otherwise text
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return CellValue::Number(n);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => CellValue::Bool(true),
            "false" => CellValue::Bool(false),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    /// True when the rendered value reads as a number
    pub fn is_numeric(&self) -> bool {
        match self {
            CellValue::Number(_) => true,
            CellValue::Text(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

/// Rectangular block of cells handed to `AI.ANALYZE`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
    pub rows: Vec<Vec<CellValue>>,
}

impl Range {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_parse_is_case_insensitive() {
        assert_eq!("LMStudio".parse::<Service>().unwrap(), Service::LmStudio);
        assert_eq!(" ollama ".parse::<Service>().unwrap(), Service::Ollama);
        assert!("openai".parse::<Service>().is_err());
    }

    #[test]
    fn test_service_serialization() {
        let json = serde_json::to_string(&Service::LmStudio).unwrap();
        assert_eq!(json, "\"lmstudio\"");
        let back: Service = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Service::LmStudio);
    }

    #[test]
    fn test_generation_request_clamps_temperature() {
        assert_eq!(GenerationRequest::new("p", "m", 1.7).temperature, 1.0);
        assert_eq!(GenerationRequest::new("p", "m", -0.2).temperature, 0.0);
        assert_eq!(
            GenerationRequest::new("p", "m", f64::NAN).temperature,
            DEFAULT_TEMPERATURE
        );
        assert_eq!(GenerationRequest::new("p", "m", 0.4).temperature, 0.4);
    }

    #[test]
    fn test_cell_value_parse() {
        assert_eq!(CellValue::parse("  "), CellValue::Empty);
        assert_eq!(CellValue::parse("42"), CellValue::Number(42.0));
        assert_eq!(CellValue::parse("True"), CellValue::Bool(true));
        assert_eq!(CellValue::parse("Region"), CellValue::Text("Region".into()));
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
    }
}
