//! Core formula layer for Local AI
//!
//! Defines the formula functions exposed to spreadsheets, the data types
//! they operate on, and the add-in configuration. Nothing here touches the
//! network; see `llm_bridge` for the backend adapter.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod config;
pub mod formulas;
pub mod range;
pub mod types;

pub use config::{AddinConfig, ConfigStore};
pub use formulas::{Formula, FormulaError, SummaryStyle};
pub use types::*;
