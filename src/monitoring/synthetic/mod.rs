//! Synthetic transactions
//!
//! Scripted multi-step user flows run against the public API on independent
//! timers, with a bounded history and a running summary.

mod runner;
mod scheduler;
mod scripts;
mod types;

pub use runner::SyntheticRunner;
pub use scheduler::SyntheticScheduler;
pub use scripts::{Variables, builtin_script, render};
pub use types::{
    BUILTIN_TRANSACTION_TYPES, HttpMethod, ScriptStep, StepResult, SyntheticSummary,
    SyntheticTransaction, TransactionFilter, TransactionStatus,
};
