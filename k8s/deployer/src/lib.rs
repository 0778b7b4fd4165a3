/// Contains constants, the error type and the Kubernetes and log file plumbing.
pub mod common;
/// Sequential apply/remove loop over the manifest's chart entries.
pub mod deploy;
/// Helm argument building and execution.
pub mod helm;
/// Loads the chart manifest and resolves per-chart defaults.
pub mod manifest;
/// Waits for the Pods of an installed release to reach the Running phase.
pub mod readiness;
