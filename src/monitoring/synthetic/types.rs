//! Synthetic transaction types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Transaction types with a built-in script
pub const BUILTIN_TRANSACTION_TYPES: &[&str] = &[
    "health",
    "login",
    "search",
    "booking",
    "registration",
    "contact",
];

/// Outcome of a step, and of the transaction it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    /// Unexpected HTTP status or a missing capture
    Failure,
    /// The step exceeded its timeout
    Timeout,
    /// Transport error
    Error,
}

impl TransactionStatus {
    pub fn is_success(self) -> bool {
        self == TransactionStatus::Success
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Failure => "failure",
            TransactionStatus::Timeout => "timeout",
            TransactionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// HTTP method of a script step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

fn default_expect_status() -> Vec<u16> {
    vec![200]
}

/// One request of a transaction script
///
/// `path` and string values inside `body` may reference run variables as
/// `{{name}}`. Each `capture` entry stores the value at a JSON pointer of the
/// response body under a variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub name: String,
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Send `Authorization: Bearer {{token}}`
    #[serde(default)]
    pub auth: bool,
    #[serde(default = "default_expect_status")]
    pub expect_status: Vec<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capture: BTreeMap<String, String>,
}

impl ScriptStep {
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            body: None,
            auth: false,
            expect_status: default_expect_status(),
            capture: BTreeMap::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.auth = true;
        self
    }

    pub fn expect(mut self, statuses: &[u16]) -> Self {
        self.expect_status = statuses.to_vec();
        self
    }

    pub fn capture(mut self, variable: &str, pointer: &str) -> Self {
        self.capture.insert(variable.to_string(), pointer.to_string());
        self
    }
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub status: TransactionStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// One finalized transaction execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: TransactionStatus,
    /// Executed steps in order; nothing after the first failing one
    pub steps: Vec<StepResult>,
    /// Error of the first failing step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyntheticTransaction {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Running aggregate of every run since the last clear
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSummary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub average_duration_ms: f64,
    pub last_run: Option<DateTime<Utc>>,
}

impl SyntheticSummary {
    /// Success percentage; 100 when nothing has run
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    pub(super) fn record(&mut self, transaction: &SyntheticTransaction) {
        let previous = self.total as f64;
        self.total += 1;
        if transaction.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.average_duration_ms = (self.average_duration_ms * previous
            + transaction.duration_ms as f64)
            / self.total as f64;
        self.last_run = Some(transaction.end_time);
    }
}

/// History query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    #[serde(default, rename = "type")]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &SyntheticTransaction) -> bool {
        self.transaction_type
            .as_ref()
            .is_none_or(|kind| *kind == transaction.transaction_type)
            && self.status.is_none_or(|status| status == transaction.status)
    }
}
