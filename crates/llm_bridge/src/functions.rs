//! Formula evaluation
//!
//! Glues the formula layer to a [`Generator`]: validate, generate, and
//! flatten every failure into the text shown in the cell.

use crate::client::Generator;
use core_formulas::Formula;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Requests in flight at once during [`FormulaRunner::evaluate_all`]
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Evaluates formulas against a shared generator
pub struct FormulaRunner<G: Generator + 'static> {
    generator: Arc<G>,
    default_model: String,
    max_concurrent: usize,
}

impl<G: Generator + 'static> Clone for FormulaRunner<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            default_model: self.default_model.clone(),
            max_concurrent: self.max_concurrent,
        }
    }
}

impl<G: Generator + 'static> FormulaRunner<G> {
    pub fn new(generator: Arc<G>, default_model: impl Into<String>) -> Self {
        Self {
            generator,
            default_model: default_model.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Limit concurrent requests in batch evaluation (at least one)
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Evaluate a formula to its cell text
    pub async fn evaluate(&self, formula: &Formula) -> String {
        let request = match formula.prepare(&self.default_model) {
            Ok(request) => request,
            Err(e) => return e.to_string(),
        };

        debug!(function = formula.name(), model = %request.model, "evaluating");

        match self.generator.generate(&request).await {
            Ok(text) => text,
            Err(e) => e.to_string(),
        }
    }

    /// Evaluate on the runtime's worker pool, off the caller's task
    pub fn spawn(&self, formula: Formula) -> JoinHandle<String> {
        let runner = self.clone();
        tokio::spawn(async move { runner.evaluate(&formula).await })
    }

    /// Evaluate many formulas concurrently, results in input order
    ///
    /// At most `max_concurrent` requests reach the server at once; the rest
    /// wait for a permit.
    pub async fn evaluate_all(&self, formulas: Vec<Formula>) -> Vec<String> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let handles: Vec<_> = formulas
            .into_iter()
            .map(|formula| {
                let runner = self.clone();
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    runner.evaluate(&formula).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let text = match handle.await {
                Ok(text) => text,
                Err(e) => {
                    error!("formula task failed: {}", e);
                    format!("Error: {}", e)
                }
            };
            results.push(text);
        }
        results
    }
}
