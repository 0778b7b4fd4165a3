use crate::{
    common::{
        constants::{HELM_TIMEOUT, HTTPS_REPO_PREFIX},
        error::{InvalidAction, RepoUrlNoHost, RepoUrlParse, Result},
    },
    manifest::{ChartEntry, GlobalOptions},
    vec_to_strings,
};
use snafu::{OptionExt, ResultExt};
use std::{fmt, str::FromStr};
use url::Url;

/// What to do with every release in the manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Install,
    Uninstall,
}

impl FromStr for Action {
    type Err = crate::common::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "install" => Ok(Action::Install),
            "uninstall" => Ok(Action::Uninstall),
            other => InvalidAction {
                action: other.to_string(),
            }
            .fail(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Install => f.write_str("install"),
            Action::Uninstall => f.write_str("uninstall"),
        }
    }
}

/// The argument vector of a single helm invocation, without the binary name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelmArgs(Vec<String>);

impl HelmArgs {
    /// The arguments, in order.
    pub fn as_slice(&self) -> &[String] {
        self.0.as_slice()
    }

    /// Returns true if the exact argument is present.
    pub fn contains(&self, arg: &str) -> bool {
        self.0.iter().any(|a| a == arg)
    }
}

impl From<Vec<String>> for HelmArgs {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl fmt::Display for HelmArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.join(" ").as_str())
    }
}

/// Where helm finds a chart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChartSource {
    /// A classic chart repository which has to be registered under `alias` first.
    Repository { alias: String, url: String },
    /// An OCI registry path, used as-is.
    Oci,
}

/// The chart reference passed to helm, and how it was derived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartReference {
    pub source: ChartSource,
    pub reference: String,
}

impl ChartReference {
    /// Resolves the chart reference of an entry. https repositories are aliased by their host,
    /// e.g. https://argoproj.github.io/argo-helm becomes `argoproj.github.io/<chart>`. Anything
    /// else is treated as an OCI reference and prefixed to the chart name.
    pub fn resolve(entry: &ChartEntry) -> Result<Self> {
        if entry.chart_repo.starts_with(HTTPS_REPO_PREFIX) {
            let url = Url::parse(entry.chart_repo.as_str()).context(RepoUrlParse {
                url: entry.chart_repo.clone(),
            })?;
            let alias = url
                .host_str()
                .filter(|host| !host.is_empty())
                .context(RepoUrlNoHost {
                    url: entry.chart_repo.clone(),
                })?
                .to_string();

            return Ok(Self {
                reference: format!("{alias}/{}", entry.chart_name),
                source: ChartSource::Repository {
                    alias,
                    url: entry.chart_repo.clone(),
                },
            });
        }

        Ok(Self {
            reference: format!(
                "{}/{}",
                entry.chart_repo.trim_end_matches('/'),
                entry.chart_name
            ),
            source: ChartSource::Oci,
        })
    }
}

/// The helm invocations needed for one chart entry, in execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartCommands {
    /// `helm repo add`, present only when installing from an https repository.
    pub repo_add: Option<HelmArgs>,
    /// `helm upgrade --install` or `helm uninstall`.
    pub release: HelmArgs,
}

impl ChartCommands {
    /// Iterates over the invocations in the order in which they must run.
    pub fn iter(&self) -> impl Iterator<Item = &HelmArgs> {
        self.repo_add.iter().chain(std::iter::once(&self.release))
    }
}

/// Builds the helm invocations for an entry.
pub fn build(action: Action, entry: &ChartEntry, options: &GlobalOptions) -> Result<ChartCommands> {
    match action {
        Action::Install => {
            let chart = ChartReference::resolve(entry)?;
            let repo_add = match &chart.source {
                ChartSource::Repository { alias, url } => Some(repo_add_args(alias, url)),
                ChartSource::Oci => None,
            };
            Ok(ChartCommands {
                repo_add,
                release: install_args(entry, chart.reference.as_str(), options),
            })
        }
        Action::Uninstall => Ok(ChartCommands {
            repo_add: None,
            release: uninstall_args(entry),
        }),
    }
}

/// `helm repo add --force-update <alias> <url>`, which succeeds whether or not the alias is
/// already registered.
pub fn repo_add_args(alias: &str, url: &str) -> HelmArgs {
    vec_to_strings!["repo", "add", "--force-update", alias, url].into()
}

/// `helm upgrade --install`, with the optional flags switched on by the manifest.
pub fn install_args(entry: &ChartEntry, chart_reference: &str, options: &GlobalOptions) -> HelmArgs {
    let mut args: Vec<String> = vec_to_strings![
        "upgrade",
        "--install",
        entry.release_name,
        chart_reference,
        "--values",
        entry.values_file,
        "--namespace",
        entry.namespace
    ];

    if options.dry_run {
        args.push("--dry-run=client".to_string());
    }
    if options.create_namespace {
        args.push("--create-namespace".to_string());
    }
    if options.wait {
        args.push("--wait".to_string());
    }
    if options.timeout {
        args.push(format!("--timeout={HELM_TIMEOUT}"));
    }
    if let Some(version) = entry.version.as_ref() {
        args.extend(vec_to_strings!["--version", version]);
    }

    args.into()
}

/// `helm uninstall <release> --namespace <namespace>`. No optional flags apply.
pub fn uninstall_args(entry: &ChartEntry) -> HelmArgs {
    vec_to_strings!["uninstall", entry.release_name, "--namespace", entry.namespace].into()
}
