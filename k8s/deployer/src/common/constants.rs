use std::time::Duration;

/// This is the name of this tool, used in log messages and file names.
pub const PRODUCT: &str = "chart-deployer";

/// This is the manifest file which is read when no path is given on the command line.
pub const DEFAULT_MANIFEST_PATH: &str = "config.yaml";

/// This is the Kubernetes Namespace used for chart entries which do not set one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// This is the helm binary which is executed, unless overridden.
pub const HELM_BINARY: &str = "helm";

/// Charts whose repository starts with this scheme are registered with `helm repo add`.
pub const HTTPS_REPO_PREFIX: &str = "https://";

/// This is the value of helm's --timeout flag when the manifest enables timeouts.
pub const HELM_TIMEOUT: &str = "20m";

/// This is the Pod label key which helm charts set to the release name.
pub const RELEASE_INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";

/// This is the Pod phase which counts as ready.
pub const POD_RUNNING_PHASE: &str = "Running";

/// Delay between two consecutive readiness checks.
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on the time spent waiting for a release's Pods.
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(1200);

/// Pause between two chart entries.
pub const ENTRY_PAUSE: Duration = Duration::from_secs(2);

/// Limit value for Kubernetes API list requests.
pub const KUBE_API_PAGE_SIZE: u32 = 500;

/// This is the directory where the run log is written, unless overridden.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// This is the file name of the current run's log.
pub const LOG_FILE_NAME: &str = "chart-deployer.log";

/// This is the sub-directory of the log directory which holds the logs of previous runs.
pub const LOG_ARCHIVE_DIR: &str = "archive";

/// Number of archived run logs which are retained.
pub const MAX_LOG_ARCHIVES: usize = 10;

/// Returns the label selector matching the Pods of a helm release.
pub fn release_label_selector(release_name: &str) -> String {
    format!("{RELEASE_INSTANCE_LABEL_KEY}={release_name}")
}
