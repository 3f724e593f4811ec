//! LLM Bridge for local AI servers
//!
//! Normalizes two local HTTP APIs, Ollama (`/api/generate`) and LM Studio's
//! OpenAI-compatible chat completions, behind one generate contract, and
//! evaluates spreadsheet formulas against it.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod backend;
pub mod client;
pub mod error;
pub mod functions;
pub mod lmstudio;
pub mod ollama;

pub use backend::Backend;
pub use client::{ClientConfig, ConnectionReport, Generator, LocalAiClient};
pub use error::BridgeError;
pub use functions::FormulaRunner;
