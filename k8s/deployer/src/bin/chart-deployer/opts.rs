use clap::Parser;
use deployer::common::{
    constants::{DEFAULT_LOG_DIR, DEFAULT_MANIFEST_PATH, HELM_BINARY},
    log_file::FmtStyle,
};
use std::path::PathBuf;

/// These are the supported cli configuration options for chart-deployer.
#[derive(Parser)]
#[command(name = "chart-deployer", version)]
#[command(
    about = "Installs or uninstalls the Helm chart releases listed in a YAML manifest",
    long_about = None
)]
pub(crate) struct CliArgs {
    /// The action to apply to every chart in the manifest: install, uninstall or help.
    #[arg(value_name = "ACTION")]
    action: Option<String>,

    /// This is the path to the chart manifest.
    #[arg(short = 'f', long = "file", default_value = DEFAULT_MANIFEST_PATH, value_name = "PATH")]
    file: PathBuf,

    /// This is the directory for the run log. The previous run's log is archived under it.
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR_PATH")]
    log_dir: PathBuf,

    /// This is the helm binary to run.
    #[arg(long, env = "HELM_BINARY", default_value = HELM_BINARY)]
    helm_binary: String,

    /// Formatting style to be used while logging.
    #[arg(default_value = FmtStyle::Pretty.as_ref(), long)]
    fmt_style: FmtStyle,

    /// Use ANSI colors for the logs.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    ansi_colors: bool,
}

impl CliArgs {
    /// This returns the action argument, if any was given.
    pub(crate) fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Returns true if the help text should be shown instead of processing charts.
    pub(crate) fn wants_help(&self) -> bool {
        matches!(self.action(), None | Some("help"))
    }

    /// This returns the manifest filepath.
    pub(crate) fn file(&self) -> PathBuf {
        self.file.clone()
    }

    /// This returns the log directory.
    pub(crate) fn log_dir(&self) -> PathBuf {
        self.log_dir.clone()
    }

    /// This returns the helm binary.
    pub(crate) fn helm_binary(&self) -> &str {
        self.helm_binary.as_str()
    }

    /// This returns formatting style to be used.
    pub(crate) fn fmt_style(&self) -> FmtStyle {
        self.fmt_style
    }

    /// This returns ansi_colours arg.
    pub(crate) fn ansi_colours(&self) -> bool {
        self.ansi_colors
    }
}

#[cfg(test)]
mod tests {
    use crate::opts::CliArgs;
    use clap::{error::ErrorKind, Parser};
    use deployer::common::log_file::FmtStyle;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let opts = CliArgs::try_parse_from(["chart-deployer", "install"]).unwrap();
        assert_eq!(opts.action(), Some("install"));
        assert!(!opts.wants_help());
        assert_eq!(opts.file(), PathBuf::from("config.yaml"));
        assert_eq!(opts.log_dir(), PathBuf::from("logs"));
        assert_eq!(opts.fmt_style(), FmtStyle::Pretty);
        assert!(opts.ansi_colours());
    }

    #[test]
    fn test_file_flag() {
        let short = CliArgs::try_parse_from(["chart-deployer", "uninstall", "-f", "charts.yaml"])
            .unwrap();
        assert_eq!(short.file(), PathBuf::from("charts.yaml"));

        let long = CliArgs::try_parse_from([
            "chart-deployer",
            "install",
            "--file",
            "/etc/charts.yaml",
            "--ansi-colors",
            "false",
        ])
        .unwrap();
        assert_eq!(long.file(), PathBuf::from("/etc/charts.yaml"));
        assert!(!long.ansi_colours());
    }

    #[test]
    fn test_help_action() {
        assert!(CliArgs::try_parse_from(["chart-deployer"])
            .unwrap()
            .wants_help());
        assert!(CliArgs::try_parse_from(["chart-deployer", "help"])
            .unwrap()
            .wants_help());
    }

    #[test]
    fn test_unknown_flag() {
        let error = CliArgs::try_parse_from(["chart-deployer", "install", "--force"])
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::UnknownArgument);

        let error = CliArgs::try_parse_from(["chart-deployer", "install", "-f"])
            .err()
            .unwrap();
        assert_ne!(error.kind(), ErrorKind::DisplayHelp);
    }
}
