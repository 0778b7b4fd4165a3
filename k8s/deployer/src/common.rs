/// Contains constant values which are used as arguments to functions and in log messages.
pub mod constants;

/// Contains the error handling tooling.
pub mod error;

/// Contains tools to work with Kubernetes APIs.
pub mod kube_client;

/// Contains the run log setup and the archival of previous run logs.
pub mod log_file;

/// Contains macros.
pub mod macros;
