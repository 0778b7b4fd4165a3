use crate::common::{
    constants::{LOG_ARCHIVE_DIR, LOG_FILE_NAME, MAX_LOG_ARCHIVES, PRODUCT},
    error::{LogArchive, LogDirCreate, LogInspect, LoggingInit, LogPrune, Result},
};
use chrono::{DateTime, Local};
use snafu::ResultExt;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Formatting style of the console log output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FmtStyle {
    Compact,
    #[default]
    Pretty,
    Json,
}

impl AsRef<str> for FmtStyle {
    fn as_ref(&self) -> &str {
        match self {
            FmtStyle::Compact => "compact",
            FmtStyle::Pretty => "pretty",
            FmtStyle::Json => "json",
        }
    }
}

impl fmt::Display for FmtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for FmtStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(FmtStyle::Compact),
            "pretty" => Ok(FmtStyle::Pretty),
            "json" => Ok(FmtStyle::Json),
            other => Err(format!(
                "unknown format style '{other}', expected one of: compact, pretty, json"
            )),
        }
    }
}

/// Keeps the non-blocking file writer alive. Dropping it flushes the run log.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Moves the previous run's log into `<log_dir>/archive/`, then prunes the archive down to the
/// most recent MAX_LOG_ARCHIVES files. Returns the archived path, if a log was moved.
pub fn archive_previous_log(log_dir: &Path) -> Result<Option<PathBuf>> {
    fs::create_dir_all(log_dir).context(LogDirCreate {
        path: log_dir.to_path_buf(),
    })?;

    let current = log_dir.join(LOG_FILE_NAME);
    let metadata = match fs::metadata(&current) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(error).context(LogInspect { path: current });
        }
    };
    // An empty log carries nothing worth keeping.
    if metadata.len() == 0 {
        return Ok(None);
    }

    let archive_dir = log_dir.join(LOG_ARCHIVE_DIR);
    fs::create_dir_all(&archive_dir).context(LogDirCreate {
        path: archive_dir.clone(),
    })?;

    let modified: DateTime<Local> = metadata
        .modified()
        .context(LogInspect {
            path: current.clone(),
        })?
        .into();
    let archived = unique_archive_path(&archive_dir, &modified);

    fs::rename(&current, &archived).context(LogArchive {
        from: current,
        to: archived.clone(),
    })?;

    prune_archives(&archive_dir, MAX_LOG_ARCHIVES)?;

    Ok(Some(archived))
}

/// Returns `<archive_dir>/chart-deployer-<timestamp>.log`, or
/// `<archive_dir>/chart-deployer-<timestamp>_<NNN>.log` if a file with the same timestamp
/// already exists. `_` sorts after `.` and the counter is zero-padded, so a later archive from
/// the same second always sorts after the earlier ones.
fn unique_archive_path(archive_dir: &Path, modified: &DateTime<Local>) -> PathBuf {
    let stamp = modified.format("%Y%m%d-%H%M%S");
    let mut candidate = archive_dir.join(format!("{PRODUCT}-{stamp}.log"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = archive_dir.join(format!("{PRODUCT}-{stamp}_{counter:03}.log"));
        counter += 1;
    }
    candidate
}

/// Deletes the oldest archived logs so that at most `keep` remain. Archive names embed a
/// sortable timestamp and collision counter, so lexical order is age order.
pub fn prune_archives(archive_dir: &Path, keep: usize) -> Result<()> {
    let prefix = format!("{PRODUCT}-");
    let mut archives = fs::read_dir(archive_dir)
        .context(LogInspect {
            path: archive_dir.to_path_buf(),
        })?
        .map(|res| res.map(|e| e.path()))
        .collect::<Result<Vec<_>, std::io::Error>>()
        .context(LogInspect {
            path: archive_dir.to_path_buf(),
        })?;

    archives.retain(|path| {
        path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(prefix.as_str()) && name.ends_with(".log"))
                .unwrap_or(false)
    });
    archives.sort();

    let excess = archives.len().saturating_sub(keep);
    for path in archives.into_iter().take(excess) {
        fs::remove_file(&path).context(LogPrune { path })?;
    }

    Ok(())
}

/// Initialise logging components: a console layer in the requested style and a plain-text
/// file layer writing to `<log_dir>/chart-deployer.log`. The level defaults to INFO and can be
/// changed with RUST_LOG.
pub fn init_logging(log_dir: &Path, style: FmtStyle, ansi_colours: bool) -> Result<LoggingGuard> {
    fs::create_dir_all(log_dir).context(LogDirCreate {
        path: log_dir.to_path_buf(),
    })?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with((style == FmtStyle::Pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi_colours)
                .pretty()
        }))
        .with((style == FmtStyle::Compact).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi_colours)
                .compact()
        }))
        .with((style == FmtStyle::Json).then(|| tracing_subscriber::fmt::layer().json()))
        .try_init()
        .context(LoggingInit)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
