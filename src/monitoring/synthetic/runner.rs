//! Synthetic transaction runner

use super::scripts::{Variables, builtin_script, capture_value, render, render_value};
use super::types::{
    BUILTIN_TRANSACTION_TYPES, ScriptStep, StepResult, SyntheticSummary, SyntheticTransaction,
    TransactionFilter, TransactionStatus,
};
use crate::config::SyntheticConfig;
use crate::utils::error::{ResilienceError, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct History {
    /// Newest first
    transactions: VecDeque<SyntheticTransaction>,
    summary: SyntheticSummary,
}

/// Executes scripted multi-step flows against the public API
#[derive(Debug)]
pub struct SyntheticRunner {
    client: reqwest::Client,
    base_url: String,
    variables: Variables,
    step_timeout: Duration,
    capacity: usize,
    scripts: RwLock<BTreeMap<String, Vec<ScriptStep>>>,
    history: RwLock<History>,
}

/// Outcome of one request, before it becomes a [`StepResult`]
struct StepFailure {
    status: TransactionStatus,
    error: String,
    http_status: Option<u16>,
}

impl StepFailure {
    fn new(status: TransactionStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            http_status: None,
        }
    }
}

impl SyntheticRunner {
    pub fn new(config: &SyntheticConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("caregrid-synthetic/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut scripts: BTreeMap<String, Vec<ScriptStep>> = BUILTIN_TRANSACTION_TYPES
            .iter()
            .filter_map(|kind| builtin_script(kind).map(|script| (kind.to_string(), script)))
            .collect();
        for (kind, script) in &config.scripts {
            debug!("Using configured script for {} transactions", kind);
            scripts.insert(kind.clone(), script.clone());
        }

        let variables = Variables::from([
            ("email".to_string(), config.email.clone()),
            ("password".to_string(), config.password.clone()),
            ("search_location".to_string(), config.search_location.clone()),
        ]);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            variables,
            step_timeout: config.step_timeout(),
            capacity: config.history_capacity,
            scripts: RwLock::new(scripts),
            history: RwLock::new(History::default()),
        })
    }

    /// Known transaction types
    pub fn transaction_types(&self) -> Vec<String> {
        self.scripts.read().keys().cloned().collect()
    }

    pub fn has_script(&self, transaction_type: &str) -> bool {
        self.scripts.read().contains_key(transaction_type)
    }

    pub fn script(&self, transaction_type: &str) -> Result<Vec<ScriptStep>> {
        self.scripts.read().get(transaction_type).cloned().ok_or_else(|| {
            ResilienceError::not_found(format!("transaction type {}", transaction_type))
        })
    }

    /// Add or replace the script of a transaction type
    pub fn set_script(&self, transaction_type: impl Into<String>, steps: Vec<ScriptStep>) -> Result<()> {
        if steps.is_empty() {
            return Err(ResilienceError::validation("a script needs at least one step"));
        }
        let transaction_type = transaction_type.into();
        info!(
            "Script for {} transactions set ({} steps)",
            transaction_type,
            steps.len()
        );
        self.scripts.write().insert(transaction_type, steps);
        Ok(())
    }

    /// Run one transaction to completion and record it
    ///
    /// Steps run strictly in order; the first step that does not succeed ends
    /// the run and decides the transaction status.
    pub async fn run(&self, transaction_type: &str) -> Result<SyntheticTransaction> {
        let script = self.script(transaction_type)?;
        let id = uuid::Uuid::new_v4().to_string();

        let mut context = self.variables.clone();
        let run_id = id.split('-').next().unwrap_or(&id).to_string();
        context.insert("run_id".to_string(), run_id);

        let start_time = Utc::now();
        let started = Instant::now();
        let mut steps = Vec::with_capacity(script.len());
        let mut status = TransactionStatus::Success;
        let mut error = None;

        for step in &script {
            let result = self.run_step(step, &mut context).await;
            let failed = !result.status.is_success();
            if failed {
                status = result.status;
                error = result.error.clone();
            }
            steps.push(result);
            if failed {
                break;
            }
        }

        let transaction = SyntheticTransaction {
            id,
            transaction_type: transaction_type.to_string(),
            start_time,
            end_time: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
            status,
            steps,
            error,
        };

        match &transaction.error {
            None => info!(
                "Synthetic {} transaction succeeded in {}ms",
                transaction_type, transaction.duration_ms
            ),
            Some(e) => warn!(
                "Synthetic {} transaction {} after {} steps: {}",
                transaction_type,
                transaction.status,
                transaction.steps.len(),
                e
            ),
        }

        self.record(transaction.clone());
        Ok(transaction)
    }

    /// Run several types concurrently
    pub async fn run_types(&self, transaction_types: &[String]) -> Vec<Result<SyntheticTransaction>> {
        futures::future::join_all(transaction_types.iter().map(|kind| self.run(kind))).await
    }

    async fn run_step(&self, step: &ScriptStep, context: &mut Variables) -> StepResult {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.step_timeout, self.send_step(step, context)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StepFailure::new(
                TransactionStatus::Timeout,
                format!("step timed out after {}ms", self.step_timeout.as_millis()),
            )),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((http_status, captured)) => {
                let metadata = captured
                    .into_iter()
                    .map(|(variable, value)| {
                        let entry = (variable.clone(), Value::String(value.clone()));
                        context.insert(variable, value);
                        entry
                    })
                    .collect();
                debug!("Step {} succeeded in {}ms", step.name, duration_ms);
                StepResult {
                    name: step.name.clone(),
                    status: TransactionStatus::Success,
                    duration_ms,
                    http_status: Some(http_status),
                    error: None,
                    metadata,
                }
            }
            Err(failure) => StepResult {
                name: step.name.clone(),
                status: failure.status,
                duration_ms,
                http_status: failure.http_status,
                error: Some(format!("{}: {}", step.name, failure.error)),
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Issue the request of one step and collect its captures
    async fn send_step(
        &self,
        step: &ScriptStep,
        context: &Variables,
    ) -> std::result::Result<(u16, Vec<(String, String)>), StepFailure> {
        let path = render(&step.path, context)
            .map_err(|e| StepFailure::new(TransactionStatus::Failure, e))?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(step.method.into(), &url);
        if let Some(body) = &step.body {
            let body = render_value(body, context)
                .map_err(|e| StepFailure::new(TransactionStatus::Failure, e))?;
            request = request.json(&body);
        }
        if step.auth {
            let token = context.get("token").ok_or_else(|| {
                StepFailure::new(TransactionStatus::Failure, "no token captured for an authenticated step")
            })?;
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let status = if e.is_timeout() {
                TransactionStatus::Timeout
            } else {
                TransactionStatus::Error
            };
            StepFailure::new(status, e.to_string())
        })?;

        let http_status = response.status().as_u16();
        if !step.expect_status.contains(&http_status) {
            return Err(StepFailure {
                status: TransactionStatus::Failure,
                error: format!("expected status {:?}, got {}", step.expect_status, http_status),
                http_status: Some(http_status),
            });
        }

        if step.capture.is_empty() {
            return Ok((http_status, Vec::new()));
        }

        let body: Value = response.json().await.map_err(|e| StepFailure {
            status: TransactionStatus::Failure,
            error: format!("response is not JSON: {}", e),
            http_status: Some(http_status),
        })?;

        let mut captured = Vec::with_capacity(step.capture.len());
        for (variable, pointer) in &step.capture {
            let value = capture_value(&body, pointer).ok_or_else(|| StepFailure {
                status: TransactionStatus::Failure,
                error: format!("missing {} at {}", variable, pointer),
                http_status: Some(http_status),
            })?;
            captured.push((variable.clone(), value));
        }

        Ok((http_status, captured))
    }

    fn record(&self, transaction: SyntheticTransaction) {
        let mut history = self.history.write();
        history.summary.record(&transaction);
        history.transactions.push_front(transaction);
        history.transactions.truncate(self.capacity);
    }

    /// Retained transactions, newest first
    pub fn history(&self, filter: &TransactionFilter) -> Vec<SyntheticTransaction> {
        let history = self.history.read();
        history
            .transactions
            .iter()
            .filter(|transaction| filter.matches(transaction))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn get_transaction(&self, id: &str) -> Result<SyntheticTransaction> {
        self.history
            .read()
            .transactions
            .iter()
            .find(|transaction| transaction.id == id)
            .cloned()
            .ok_or_else(|| ResilienceError::not_found(format!("transaction {}", id)))
    }

    pub fn summary(&self) -> SyntheticSummary {
        self.history.read().summary.clone()
    }

    /// Drop every retained transaction and reset the summary
    pub fn clear_history(&self) -> usize {
        let mut history = self.history.write();
        let cleared = history.transactions.len();
        *history = History::default();
        info!("Cleared {} synthetic transactions", cleared);
        cleared
    }
}
