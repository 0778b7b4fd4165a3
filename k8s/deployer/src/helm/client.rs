use crate::{
    common::error::{
        HelmCommand, HelmCommandFailed, HelmVersion, HelmVersionCommand, RegexCompile, Result,
        U8VectorToString,
    },
    helm::command::HelmArgs,
    vec_to_strings,
};
use async_trait::async_trait;
use regex::Regex;
use snafu::{ensure, ResultExt};
use std::str;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Executes helm invocations.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Runs helm with the arguments. A non-zero exit is an error.
    async fn execute(&self, args: &HelmArgs) -> Result<()>;
}

/// Runs the helm binary directly, without a shell. Its standard output and standard error are
/// written to the run log once the command exits.
#[derive(Clone, Debug)]
pub struct HelmClient {
    binary: String,
}

impl HelmClient {
    /// Runs the given binary, e.g. `helm` from $PATH or an absolute path to a helm v3 binary.
    pub fn with_binary<B>(binary: B) -> Self
    where
        B: ToString,
    {
        Self {
            binary: binary.to_string(),
        }
    }

    /// Validate that the helm binary is helm v3, by running `helm version --short`.
    pub async fn validate_helmv3(&self) -> Result<()> {
        let command = self.binary.as_str();
        let args: Vec<String> = vec_to_strings!["version", "--short"];

        debug!(%command, ?args, "Helm version command");

        let output = Command::new(command)
            .args(args.as_slice())
            .output()
            .await
            .context(HelmCommand {
                command: command.to_string(),
                args: args.clone(),
            })?;

        let stdout_str = str::from_utf8(output.stdout.as_slice()).context(U8VectorToString)?;
        debug!(stdout=%stdout_str, "Helm version command standard output");
        ensure!(
            output.status.success(),
            HelmVersionCommand {
                command: command.to_string(),
                args,
                std_err: str::from_utf8(output.stderr.as_slice())
                    .context(U8VectorToString)?
                    .to_string()
            }
        );

        // Parse based on regex, to validate if the version string (semver) is v3.x.
        let regex: &str = r"^(v3\.[0-9]+\.[0-9])";
        if !Regex::new(regex)
            .context(RegexCompile {
                expression: regex.to_string(),
            })?
            .is_match(stdout_str.trim())
        {
            return HelmVersion {
                version: stdout_str.trim().to_string(),
            }
            .fail();
        }

        info!(version = %stdout_str.trim(), "Found helm");
        Ok(())
    }
}

#[async_trait]
impl PackageManager for HelmClient {
    async fn execute(&self, args: &HelmArgs) -> Result<()> {
        let command = self.binary.as_str();
        info!(%command, %args, "Running helm");

        let output = Command::new(command)
            .args(args.as_slice())
            .output()
            .await
            .context(HelmCommand {
                command: command.to_string(),
                args: args.as_slice().to_vec(),
            })?;

        for line in String::from_utf8_lossy(output.stdout.as_slice()).lines() {
            info!(stream = "stdout", "{line}");
        }
        for line in String::from_utf8_lossy(output.stderr.as_slice()).lines() {
            warn!(stream = "stderr", "{line}");
        }

        ensure!(
            output.status.success(),
            HelmCommandFailed {
                command: command.to_string(),
                args: args.as_slice().to_vec(),
                code: output.status.code(),
            }
        );

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::{
        common::error::{Error, EXIT_HELM_FAILURE},
        helm::{
            client::{HelmClient, PackageManager},
            command::HelmArgs,
        },
        vec_to_strings,
    };

    #[tokio::test]
    async fn test_execute_success() {
        let client = HelmClient::with_binary("true");
        let args = HelmArgs::from(vec_to_strings!["uninstall", "redis", "--namespace", "default"]);
        client.execute(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_non_zero_exit() {
        let client = HelmClient::with_binary("false");
        let args = HelmArgs::from(vec_to_strings!["uninstall", "redis"]);

        let error = client.execute(&args).await.unwrap_err();
        match &error {
            Error::HelmCommandFailed { code, args, .. } => {
                assert_eq!(*code, Some(1));
                assert_eq!(args, &vec_to_strings!["uninstall", "redis"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(error.exit_code(), EXIT_HELM_FAILURE);
    }

    #[tokio::test]
    async fn test_execute_missing_binary() {
        let client = HelmClient::with_binary("/nonexistent/helm");
        let error = client
            .execute(&HelmArgs::from(vec_to_strings!["version"]))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::HelmCommand { .. }));
        assert_eq!(error.exit_code(), EXIT_HELM_FAILURE);
    }

    #[tokio::test]
    async fn test_validate_rejects_non_v3_output() {
        // `echo version --short` prints its arguments, which is not a helm version.
        let client = HelmClient::with_binary("echo");
        let error = client.validate_helmv3().await.unwrap_err();
        assert!(matches!(error, Error::HelmVersion { .. }));
    }
}
