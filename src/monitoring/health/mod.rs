//! Health probe scheduler
//!
//! Every probe runs on its own timer. A probe turns unhealthy after a streak of
//! failures, which raises an alert and triggers its recovery action once; the
//! next success brings it back.

mod probes;
mod recovery;
mod scheduler;
mod types;

pub use probes::{
    CheckFn, DependencyCheck, FnCheck, HealthCheck, LivenessCheck, SystemResourceCheck,
    build_check,
};
pub use recovery::{BreakerResetRecovery, FnRecovery, RecoveryAction, RecoveryFn, build_recovery};
pub use scheduler::ProbeScheduler;
pub use types::{CheckOutput, ProbeReport, ProbeRun, ProbeState, ProbeStatus, ProbeTransition};
