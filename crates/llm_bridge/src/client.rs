//! Local AI HTTP client
//!
//! One `reqwest::Client` is shared by every call. Generation and model
//! probing use different per-request timeouts on that same client.

use crate::backend::Backend;
use crate::error::BridgeError;
use async_trait::async_trait;
use core_formulas::{AddinConfig, GenerationRequest, Service};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the local AI client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service, base URL and default model
    pub addin: AddinConfig,
    /// Timeout for generation calls in seconds (default: 120)
    pub generate_timeout_secs: u64,
    /// Timeout for connectivity probes in seconds (default: 10)
    pub probe_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_addin(AddinConfig::default())
    }
}

impl ClientConfig {
    pub fn from_addin(addin: AddinConfig) -> Self {
        Self {
            addin,
            generate_timeout_secs: 120,
            probe_timeout_secs: 10,
        }
    }
}

/// Anything that can turn a generation request into text
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BridgeError>;
}

/// Result of probing the configured server
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReport {
    pub service: Service,
    pub url: String,
    pub models: Vec<String>,
}

/// Client for a local Ollama or LM Studio server
pub struct LocalAiClient {
    config: ClientConfig,
    backend: Backend,
    client: reqwest::Client,
}

impl LocalAiClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self, BridgeError> {
        // targets are local servers, never route them through a proxy
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;
        let backend = Backend::select(&config.addin);

        Ok(Self {
            config,
            backend,
            client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    fn connection_error(&self) -> impl Fn(reqwest::Error) -> BridgeError + '_ {
        move |e| {
            debug!(error = %e, "request to {} failed", self.config.addin.api_url);
            BridgeError::from_reqwest(e, self.config.addin.service, &self.config.addin.api_url)
        }
    }

    /// Send one generation request; no retries
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, BridgeError> {
        let url = self.backend.generate_url(&self.config.addin.api_url);
        let body = self.backend.encode(request)?;

        debug!(
            backend = ?self.backend,
            url = %url,
            model = %request.model,
            temperature = request.temperature,
            "sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.generate_timeout_secs))
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(self.connection_error())?;

        let text = response.text().await.map_err(self.connection_error())?;
        let result = self.backend.decode(&text);

        if let Err(e) = &result {
            warn!(backend = ?self.backend, "generation returned no text: {}", e);
        }
        result
    }

    /// List models the server currently offers
    pub async fn list_models(&self) -> Result<Vec<String>, BridgeError> {
        let url = self.backend.models_url(&self.config.addin.api_url);
        debug!(url = %url, "listing models");

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.probe_timeout_secs))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(self.connection_error())?;

        let text = response.text().await.map_err(self.connection_error())?;
        Ok(self.backend.decode_models(&text))
    }

    /// Probe the configured server and report what it serves
    pub async fn test_connection(&self) -> Result<ConnectionReport, BridgeError> {
        let models = self.list_models().await?;

        Ok(ConnectionReport {
            service: self.config.addin.service,
            url: self.config.addin.api_url.clone(),
            models,
        })
    }
}

#[async_trait]
impl Generator for LocalAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BridgeError> {
        LocalAiClient::generate(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(service: Service, api_url: &str) -> LocalAiClient {
        let mut config = ClientConfig::from_addin(AddinConfig {
            service,
            api_url: api_url.to_string(),
            default_model: "llama3".to_string(),
        });
        config.generate_timeout_secs = 1;
        config.probe_timeout_secs = 1;
        LocalAiClient::new(config).unwrap()
    }

    /// Accepts connections and never answers
    async fn stalled_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    /// Address nothing is listening on
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.addin.api_url, "http://localhost:11434");
        assert_eq!(config.generate_timeout_secs, 120);
        assert_eq!(config.probe_timeout_secs, 10);
    }

    #[tokio::test]
    async fn test_ollama_generate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(json!({
                "model": "llama3",
                "prompt": "Capital of France?",
                "stream": false,
                "options": { "temperature": 0.7 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"llama3","response":"Paris","done":true}"#)
            .create_async()
            .await;

        let client = client_for(Service::Ollama, &server.url());
        let text = client
            .generate(&GenerationRequest::new("Capital of France?", "llama3", 0.7))
            .await
            .unwrap();

        assert_eq!(text, "Paris");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lm_studio_generate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "model": "qwen2.5-7b",
                "messages": [{ "role": "user", "content": "Hola" }],
                "max_tokens": 1000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hello"},"finish_reason":"stop"}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(Service::LmStudio, &server.url());
        let text = client
            .generate(&GenerationRequest::new("Hola", "qwen2.5-7b", 0.3))
            .await
            .unwrap();

        assert_eq!(text, "Hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lm_studio_port_overrides_ollama_service() {
        let opts = mockito::ServerOpts {
            host: "127.0.0.1",
            port: 1234,
            ..Default::default()
        };
        let mut server = mockito::Server::new_with_opts_async(opts).await;
        let chat = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{ "role": "user", "content": "Ping" }]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Pong"}}]}"#)
            .create_async()
            .await;
        let generate = server
            .mock("POST", "/api/generate")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(Service::Ollama, "http://127.0.0.1:1234");
        assert_eq!(client.backend(), Backend::LmStudio);

        let text = client
            .generate(&GenerationRequest::new("Ping", "llama3", 0.7))
            .await
            .unwrap();

        assert_eq!(text, "Pong");
        chat.assert_async().await;
        generate.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_connection_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(Service::Ollama, &server.url());
        let err = client
            .generate(&GenerationRequest::new("Hi", "llama3", 0.7))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BridgeError::Connection {
                service: Service::Ollama,
                url: server.url(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_field_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"done":true}"#)
            .create_async()
            .await;

        let client = client_for(Service::Ollama, &server.url());
        let err = client
            .generate(&GenerationRequest::new("Hi", "llama3", 0.7))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No response received from Ollama");
    }

    #[tokio::test]
    async fn test_connection_refused_names_service_and_url() {
        let url = closed_port_url();
        let client = client_for(Service::LmStudio, &url);

        let err = client
            .generate(&GenerationRequest::new("Hi", "llama3", 0.7))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("lmstudio"), "{}", message);
        assert!(message.contains(&url), "{}", message);
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let url = stalled_server().await;
        let client = client_for(Service::Ollama, &url);

        let err = client
            .generate(&GenerationRequest::new("Hi", "llama3", 0.7))
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "{:?}", err);
        assert!(err.to_string().starts_with("Timeout:"));
    }

    #[tokio::test]
    async fn test_list_models_ollama() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3:latest"},{"name":"phi3:mini"}]}"#)
            .create_async()
            .await;

        let client = client_for(Service::Ollama, &server.url());
        let report = client.test_connection().await.unwrap();

        assert_eq!(report.service, Service::Ollama);
        assert_eq!(report.url, server.url());
        assert_eq!(report.models, vec!["llama3:latest", "phi3:mini"]);
    }

    #[tokio::test]
    async fn test_list_models_lm_studio() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/models")
            .with_status(200)
            .with_body(r#"{"object":"list","data":[{"id":"qwen2.5-7b-instruct","object":"model"}]}"#)
            .create_async()
            .await;

        let client = client_for(Service::LmStudio, &server.url());
        let models = client.list_models().await.unwrap();

        assert_eq!(models, vec!["qwen2.5-7b-instruct"]);
    }
}
