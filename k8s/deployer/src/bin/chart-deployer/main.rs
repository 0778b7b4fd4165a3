use crate::opts::CliArgs;
use clap::{error::ErrorKind, CommandFactory, Parser};
use deployer::{
    common::{
        constants::PRODUCT,
        error::{Result, EXIT_GENERIC, EXIT_INVALID_FLAG},
        kube_client::KubeClientSet,
        log_file::{archive_previous_log, init_logging},
    },
    deploy::{DeploySummary, Deployer},
    helm::{client::HelmClient, command::Action},
    manifest::Manifest,
};
use std::{process::ExitCode, str::FromStr};
use tracing::{error, info};

mod opts;

#[tokio::main]
async fn main() -> ExitCode {
    let opts = match CliArgs::try_parse() {
        Ok(opts) => opts,
        Err(error) => return cli_error_exit(error),
    };

    if opts.wants_help() {
        return match CliArgs::command().print_long_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::from(EXIT_GENERIC),
        };
    }

    // The previous run's log has to be moved away before the new one is opened.
    let archived = match archive_previous_log(opts.log_dir().as_path()) {
        Ok(archived) => archived,
        Err(error) => return fail(&error),
    };
    let _log_guard = match init_logging(
        opts.log_dir().as_path(),
        opts.fmt_style(),
        opts.ansi_colours(),
    ) {
        Ok(guard) => guard,
        Err(error) => return fail(&error),
    };
    if let Some(path) = archived {
        info!(path = %path.display(), "Archived the previous run log");
    }

    console_logger::banner(PRODUCT, concat!("v", env!("CARGO_PKG_VERSION")));

    match run(&opts).await {
        Ok(summary) if summary.releases.is_empty() => {
            console_logger::warn(
                "No chart releases were processed, the manifest has no charts:",
                opts.file().display().to_string().as_str(),
            );
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            console_logger::success(
                format!(
                    "Processed {} chart release(s) successfully",
                    summary.releases.len()
                )
                .as_str(),
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, exit_code = error.exit_code(), "Failed to process chart releases");
            fail(&error)
        }
    }
}

/// Loads the manifest, checks the prerequisites, and applies the action to every chart.
async fn run(opts: &CliArgs) -> Result<DeploySummary> {
    let action = Action::from_str(opts.action().unwrap_or_default())?;

    let manifest_path = opts.file();
    console_logger::info(format!("Reading manifest {}", manifest_path.display()).as_str());
    let manifest = Manifest::from_file(manifest_path.as_path())?;
    info!(
        path = %manifest_path.display(),
        charts = manifest.charts.len(),
        dry_run = manifest.options.dry_run,
        "Loaded the chart manifest"
    );

    let helm = HelmClient::with_binary(opts.helm_binary());
    helm.validate_helmv3().await?;

    let kube = KubeClientSet::new();
    if action == Action::Install && !manifest.options.dry_run && !manifest.charts.is_empty() {
        // Fail before the first install if the cluster can't be reached for readiness checks.
        kube.client().await?;
    }

    Deployer::new(&helm, &kube).run(action, &manifest).await
}

/// Prints a command line parsing error and returns its exit code.
fn cli_error_exit(error: clap::Error) -> ExitCode {
    // Nothing is left to report to if the console can't be written to.
    error.print().ok();
    ExitCode::from(cli_exit_code(error.kind()))
}

/// Help and version requests are not failures. Every other parsing error is a bad flag.
fn cli_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => EXIT_INVALID_FLAG,
    }
}

/// Echoes the error on the console and returns its exit code.
fn fail(error: &deployer::common::error::Error) -> ExitCode {
    console_logger::error(
        format!("{PRODUCT} failed (exit code {})", error.exit_code()).as_str(),
        error.to_string().as_str(),
    );
    ExitCode::from(error.exit_code())
}
