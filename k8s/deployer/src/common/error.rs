use snafu::Snafu;
use std::{path::PathBuf, time::Duration};

/// Process exit code for a failure which has no dedicated code.
pub const EXIT_GENERIC: u8 = 1;
/// Process exit code for when the release's Pods did not become ready in time.
pub const EXIT_READINESS_TIMEOUT: u8 = 2;
/// Process exit code for when no Pods were found for an installed release.
pub const EXIT_NO_PODS: u8 = 3;
/// Process exit code for an unknown action.
pub const EXIT_INVALID_ACTION: u8 = 4;
/// Process exit code for a failed helm command.
pub const EXIT_HELM_FAILURE: u8 = 5;
/// Process exit code for unknown or invalid command line flags.
pub const EXIT_INVALID_FLAG: u8 = 7;
/// Process exit code for a missing or unusable manifest.
pub const EXIT_MANIFEST: u8 = 8;

/// Every failure of a chart-deployer run. Each variant maps to the process exit code returned
/// by `Error::exit_code`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    /// Error for when the manifest file does not exist.
    #[snafu(display("Manifest file {} not found", path.display()))]
    ManifestNotFound { path: PathBuf },

    /// Error for when the manifest file exists but cannot be read.
    #[snafu(display("Failed to read manifest file {}: {}", path.display(), source))]
    ManifestRead {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Error for when the manifest is not valid YAML, or its keys have the wrong types.
    #[snafu(display("Failed to parse manifest {}: {}", path.display(), source))]
    ManifestParse {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    /// Error for when a chart record lacks a required key, or the key's value is empty.
    #[snafu(display(
        "Chart entry #{} {}in manifest {} is missing required field '{}'",
        index,
        release_name.as_deref().map(|n| format!("('{n}') ")).unwrap_or_default(),
        path.display(),
        field
    ))]
    ManifestMissingField {
        index: usize,
        field: &'static str,
        release_name: Option<String>,
        path: PathBuf,
    },

    /// Error for when a chart record has a value of the wrong kind for a field.
    #[snafu(display(
        "Chart entry #{} in manifest {} has an invalid value for '{}': {}",
        index,
        path.display(),
        field,
        reason
    ))]
    ManifestInvalidField {
        index: usize,
        field: &'static str,
        reason: String,
        path: PathBuf,
    },

    /// Error for when two chart records share a release name.
    #[snafu(display(
        "Release '{}' appears more than once in manifest {}",
        release_name,
        path.display()
    ))]
    ManifestDuplicateRelease {
        release_name: String,
        path: PathBuf,
    },

    /// Error for an action which is neither install nor uninstall.
    #[snafu(display("Invalid action '{}', expected 'install' or 'uninstall'", action))]
    InvalidAction { action: String },

    /// Error for when an https chart repository URL cannot be parsed.
    #[snafu(display("Failed to parse chart repository URL {}: {}", url, source))]
    RepoUrlParse {
        source: url::ParseError,
        url: String,
    },

    /// Error for when an https chart repository URL has no host to derive an alias from.
    #[snafu(display("Chart repository URL {} has no host", url))]
    RepoUrlNoHost { url: String },

    /// Error for when a Helm command cannot be started.
    #[snafu(display(
        "Failed to run Helm command,\ncommand: {},\nargs: {:?},\ncommand_error: {}",
        command,
        args,
        source
    ))]
    HelmCommand {
        source: std::io::Error,
        command: String,
        args: Vec<String>,
    },

    /// Error for when a Helm command exits with a non-zero status.
    #[snafu(display(
        "Helm command failed,\ncommand: {},\nargs: {:?},\nexit_code: {}",
        command,
        args,
        code.map(|c| c.to_string()).unwrap_or_else(|| "terminated by signal".to_string())
    ))]
    HelmCommandFailed {
        command: String,
        args: Vec<String>,
        code: Option<i32>,
    },

    /// Error for when the `helm version` command fails.
    #[snafu(display(
        "Helm version command failed,\ncommand: {},\nargs: {:?},\nstd_err: {}",
        command,
        args,
        std_err,
    ))]
    HelmVersionCommand {
        command: String,
        args: Vec<String>,
        std_err: String,
    },

    /// Error for when Helm v3.x.y is not present in $PATH.
    #[snafu(display("Helm version {} does not start with 'v3.x.y'", version))]
    HelmVersion { version: String },

    /// Error for when a command's output is not valid UTF-8.
    #[snafu(display("Failed to convert command output to string: {}", source))]
    U8VectorToString { source: std::str::Utf8Error },

    /// Error for when regular expression parsing or compilation fails.
    #[snafu(display("Failed to compile regex {}: {}", expression, source))]
    RegexCompile {
        source: regex::Error,
        expression: String,
    },

    /// Error for when Kubernetes API client generation fails.
    #[snafu(display("Failed to generate kubernetes client: {}", source))]
    K8sClientGeneration { source: kube::Error },

    /// Error for when a Kubernetes API request for GET-ing a list of Pods filtered by label(s)
    /// fails.
    #[snafu(display(
        "Failed to list Pods with label {} in namespace {}: {}",
        label,
        namespace,
        source
    ))]
    ListPodsWithLabel {
        source: kube::Error,
        label: String,
        namespace: String,
    },

    /// Error for when an installed release has no Pods.
    #[snafu(display(
        "No Pods with label {} found in namespace {} for release {}",
        label,
        namespace,
        release_name
    ))]
    NoPodsFound {
        release_name: String,
        namespace: String,
        label: String,
    },

    /// Error for when an installed release's Pods are not all Running before the deadline.
    #[snafu(display(
        "Timed out after {:?} waiting for Pods of release {} in namespace {} to be Running",
        timeout,
        release_name,
        namespace
    ))]
    ReadinessTimeout {
        release_name: String,
        namespace: String,
        timeout: Duration,
    },

    /// Error for when a log directory cannot be created.
    #[snafu(display("Failed to create log directory {}: {}", path.display(), source))]
    LogDirCreate {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Error for when the previous run log cannot be moved into the archive.
    #[snafu(display(
        "Failed to archive log file {} to {}: {}",
        from.display(),
        to.display(),
        source
    ))]
    LogArchive {
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Error for when a log file's metadata or a log directory's entries cannot be read.
    #[snafu(display("Failed to inspect log path {}: {}", path.display(), source))]
    LogInspect {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Error for when an old archived log cannot be removed.
    #[snafu(display("Failed to remove archived log {}: {}", path.display(), source))]
    LogPrune {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Error for when the tracing subscriber cannot be installed.
    #[snafu(display("Failed to initialise logging: {}", source))]
    LoggingInit {
        source: tracing_subscriber::util::TryInitError,
    },
}

/// A wrapper type to remove repeated Result<T, Error> returns.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        u8::from(self)
    }
}

impl From<&Error> for u8 {
    fn from(err: &Error) -> Self {
        match err {
            Error::ManifestNotFound { .. }
            | Error::ManifestRead { .. }
            | Error::ManifestParse { .. }
            | Error::ManifestMissingField { .. }
            | Error::ManifestInvalidField { .. }
            | Error::ManifestDuplicateRelease { .. }
            | Error::RepoUrlParse { .. }
            | Error::RepoUrlNoHost { .. } => EXIT_MANIFEST,
            Error::InvalidAction { .. } => EXIT_INVALID_ACTION,
            Error::HelmCommand { .. }
            | Error::HelmCommandFailed { .. }
            | Error::HelmVersionCommand { .. }
            | Error::HelmVersion { .. } => EXIT_HELM_FAILURE,
            Error::NoPodsFound { .. } => EXIT_NO_PODS,
            Error::ReadinessTimeout { .. } => EXIT_READINESS_TIMEOUT,
            Error::U8VectorToString { .. }
            | Error::RegexCompile { .. }
            | Error::K8sClientGeneration { .. }
            | Error::ListPodsWithLabel { .. }
            | Error::LogDirCreate { .. }
            | Error::LogArchive { .. }
            | Error::LogInspect { .. }
            | Error::LogPrune { .. }
            | Error::LoggingInit { .. } => EXIT_GENERIC,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::common::error::{
        Error, EXIT_HELM_FAILURE, EXIT_INVALID_ACTION, EXIT_MANIFEST, EXIT_NO_PODS,
        EXIT_READINESS_TIMEOUT,
    };
    use std::{path::PathBuf, time::Duration};

    #[test]
    fn test_exit_codes() {
        let not_found = Error::ManifestNotFound {
            path: PathBuf::from("config.yaml"),
        };
        assert_eq!(not_found.exit_code(), EXIT_MANIFEST);

        let repo_url = Error::RepoUrlNoHost {
            url: "https:///charts".to_string(),
        };
        assert_eq!(repo_url.exit_code(), EXIT_MANIFEST);

        let action = Error::InvalidAction {
            action: "reinstall".to_string(),
        };
        assert_eq!(action.exit_code(), EXIT_INVALID_ACTION);

        let helm = Error::HelmCommandFailed {
            command: "helm".to_string(),
            args: vec!["uninstall".to_string()],
            code: Some(1),
        };
        assert_eq!(helm.exit_code(), EXIT_HELM_FAILURE);

        let no_pods = Error::NoPodsFound {
            release_name: "argo-cd".to_string(),
            namespace: "argo-cd".to_string(),
            label: "app.kubernetes.io/instance=argo-cd".to_string(),
        };
        assert_eq!(no_pods.exit_code(), EXIT_NO_PODS);

        let timeout = Error::ReadinessTimeout {
            release_name: "argo-cd".to_string(),
            namespace: "argo-cd".to_string(),
            timeout: Duration::from_secs(1200),
        };
        assert_eq!(timeout.exit_code(), EXIT_READINESS_TIMEOUT);
    }

    #[test]
    fn test_missing_field_message_names_release() {
        let err = Error::ManifestMissingField {
            index: 1,
            field: "values_file",
            release_name: Some("redis".to_string()),
            path: PathBuf::from("config.yaml"),
        };
        assert_eq!(
            err.to_string(),
            "Chart entry #1 ('redis') in manifest config.yaml is missing required field 'values_file'"
        );
    }
}
