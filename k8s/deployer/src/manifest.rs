use crate::{
    common::{
        constants::DEFAULT_NAMESPACE,
        error::{
            ManifestDuplicateRelease, ManifestInvalidField, ManifestMissingField,
            ManifestNotFound, ManifestParse, ManifestRead, Result,
        },
    },
    helm::command::ChartReference,
};
use serde::Deserialize;
use serde_yaml::Value;
use snafu::{ensure, ResultExt};
use std::{
    collections::HashSet,
    fs,
    path::Path,
};

/// Run-wide switches read from the top level of the manifest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Render and validate on the client, without touching the cluster.
    pub dry_run: bool,
    /// Let helm create the release namespace.
    pub create_namespace: bool,
    /// Let helm wait for the release's resources.
    pub wait: bool,
    /// Pass a 20 minute timeout to helm.
    pub timeout: bool,
}

/// A chart record with its defaults resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartEntry {
    pub release_name: String,
    pub chart_name: String,
    /// Either an OCI reference or an https chart repository URL.
    pub chart_repo: String,
    pub values_file: String,
    /// None installs the latest chart version.
    pub version: Option<String>,
    pub namespace: String,
}

/// The parsed manifest. Charts are kept in document order, which is also the order in which
/// they are applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    pub options: GlobalOptions,
    pub charts: Vec<ChartEntry>,
}

/// This struct is used to deserialize the manifest document as it is written.
#[derive(Deserialize)]
struct RawManifest {
    dry_run: Option<bool>,
    create_namespace: Option<bool>,
    wait: Option<bool>,
    timeout: Option<bool>,
    charts: Option<Vec<RawChartRecord>>,
}

/// A chart record before validation and defaulting.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawChartRecord {
    pub release_name: Option<String>,
    pub chart_name: Option<String>,
    pub chart_repo: Option<String>,
    pub values_file: Option<String>,
    /// Kept as a YAML value so that unquoted integer versions like `7` are accepted.
    pub version: Option<Value>,
    pub namespace: Option<String>,
}

impl Manifest {
    /// Reads and validates the manifest at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        ensure!(
            path.exists(),
            ManifestNotFound {
                path: path.to_path_buf()
            }
        );

        let contents = fs::read_to_string(path).context(ManifestRead {
            path: path.to_path_buf(),
        })?;

        Self::from_yaml(contents.as_str(), path)
    }

    /// Parses and validates a manifest document. `path` is only used in error messages. Every
    /// entry's chart repository is resolved here, so a bad repository URL fails the run before
    /// any helm command.
    pub fn from_yaml(contents: &str, path: &Path) -> Result<Self> {
        // Empty and null documents are an empty manifest.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Option<RawManifest> = serde_yaml::from_str(contents).context(ManifestParse {
            path: path.to_path_buf(),
        })?;
        let raw = match raw {
            Some(raw) => raw,
            None => return Ok(Self::default()),
        };

        let options = GlobalOptions {
            dry_run: raw.dry_run.unwrap_or_default(),
            create_namespace: raw.create_namespace.unwrap_or_default(),
            wait: raw.wait.unwrap_or_default(),
            timeout: raw.timeout.unwrap_or_default(),
        };

        let records = raw.charts.unwrap_or_default();
        let mut charts = Vec::with_capacity(records.len());
        let mut seen_releases = HashSet::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let entry = resolve_chart(index, record, path)?;
            ChartReference::resolve(&entry)?;
            ensure!(
                seen_releases.insert(entry.release_name.clone()),
                ManifestDuplicateRelease {
                    release_name: entry.release_name,
                    path: path.to_path_buf(),
                }
            );
            charts.push(entry);
        }

        Ok(Self { options, charts })
    }
}

/// Validates the required fields of the record at `index` and applies the defaults: a missing
/// namespace becomes "default" and a missing version means latest.
pub fn resolve_chart(index: usize, record: RawChartRecord, path: &Path) -> Result<ChartEntry> {
    let release_name = non_empty(record.release_name.clone());

    let required = |value: Option<String>, field: &'static str| -> Result<String> {
        non_empty(value).ok_or_else(|| {
            ManifestMissingField {
                index,
                field,
                release_name: release_name.clone(),
                path: path.to_path_buf(),
            }
            .build()
        })
    };

    let entry_release_name = required(record.release_name, "release_name")?;
    let chart_name = required(record.chart_name, "chart_name")?;
    let chart_repo = required(record.chart_repo, "chart_repo")?;
    let values_file = required(record.values_file, "values_file")?;

    let invalid_version = |reason: &str| {
        ManifestInvalidField {
            index,
            field: "version",
            reason: reason.to_string(),
            path: path.to_path_buf(),
        }
        .fail()
    };
    let version = match record.version {
        None | Some(Value::Null) => None,
        Some(Value::String(version)) => non_empty(Some(version)),
        Some(Value::Number(version)) if version.is_u64() || version.is_i64() => {
            Some(version.to_string())
        }
        // YAML reads 1.10 as the float 1.1, and 2.0 as 2.
        Some(Value::Number(version)) => {
            return invalid_version(
                format!(
                    "the unquoted number {version} does not keep its exact digits, quote the \
                     version string"
                )
                .as_str(),
            )
        }
        Some(_) => return invalid_version("expected a version string"),
    };

    let namespace = non_empty(record.namespace).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    Ok(ChartEntry {
        release_name: entry_release_name,
        chart_name,
        chart_repo,
        values_file,
        version,
        namespace,
    })
}

/// Trims the value and drops it if nothing is left.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
