use crate::{
    common::{constants::ENTRY_PAUSE, error::Result},
    helm::{
        client::PackageManager,
        command::{self, Action, ChartCommands},
    },
    manifest::{ChartEntry, GlobalOptions, Manifest},
    readiness::{wait_for_release_ready, PollSettings, WorkloadStatus},
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Outcome of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeploySummary {
    /// Release names, in the order in which they were processed.
    pub releases: Vec<String>,
    /// Number of readiness polls which were run.
    pub readiness_checks: usize,
}

/// Applies an action to every chart entry of a manifest, one entry at a time. The first failure
/// ends the run; nothing is retried or rolled back.
pub struct Deployer<'a> {
    helm: &'a dyn PackageManager,
    workloads: &'a dyn WorkloadStatus,
    poll_settings: PollSettings,
    entry_pause: Duration,
}

impl<'a> Deployer<'a> {
    /// Creates a Deployer with the default readiness timing and inter-entry pause.
    pub fn new(helm: &'a dyn PackageManager, workloads: &'a dyn WorkloadStatus) -> Self {
        Self {
            helm,
            workloads,
            poll_settings: PollSettings::default(),
            entry_pause: ENTRY_PAUSE,
        }
    }

    /// Overrides the readiness poll timing.
    #[must_use]
    pub fn with_poll_settings(mut self, poll_settings: PollSettings) -> Self {
        self.poll_settings = poll_settings;
        self
    }

    /// Overrides the pause between two entries.
    #[must_use]
    pub fn with_entry_pause(mut self, entry_pause: Duration) -> Self {
        self.entry_pause = entry_pause;
        self
    }

    /// Runs the action for every chart entry, in manifest order.
    pub async fn run(&self, action: Action, manifest: &Manifest) -> Result<DeploySummary> {
        let mut summary = DeploySummary::default();

        if manifest.charts.is_empty() {
            warn!("The manifest has no chart entries, nothing to {action}");
            return Ok(summary);
        }

        info!(
            %action,
            charts = manifest.charts.len(),
            dry_run = manifest.options.dry_run,
            "Processing chart entries"
        );

        // Every entry's commands are built before the first one runs, so a bad entry anywhere in
        // the manifest fails the run before any release is touched.
        let commands = manifest
            .charts
            .iter()
            .map(|entry| command::build(action, entry, &manifest.options))
            .collect::<Result<Vec<_>>>()?;

        for (index, (entry, commands)) in manifest.charts.iter().zip(commands).enumerate() {
            if index > 0 {
                sleep(self.entry_pause).await;
            }

            if self
                .process(action, entry, &commands, &manifest.options)
                .await?
            {
                summary.readiness_checks += 1;
            }
            summary.releases.push(entry.release_name.clone());
        }

        info!(
            %action,
            releases = summary.releases.len(),
            "Processed all chart entries"
        );
        Ok(summary)
    }

    /// Runs the helm commands for one entry, then waits for its Pods if the entry was really
    /// installed. Returns true if a readiness poll was run.
    async fn process(
        &self,
        action: Action,
        entry: &ChartEntry,
        commands: &ChartCommands,
        options: &GlobalOptions,
    ) -> Result<bool> {
        info!(
            %action,
            release = %entry.release_name,
            chart = %entry.chart_name,
            namespace = %entry.namespace,
            version = entry.version.as_deref().unwrap_or("latest"),
            "Processing chart entry"
        );

        for args in commands.iter() {
            self.helm.execute(args).await?;
        }

        if action == Action::Install && !options.dry_run {
            wait_for_release_ready(self.workloads, entry, &self.poll_settings).await?;
            return Ok(true);
        }

        info!(%action, release = %entry.release_name, "Done");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        common::error::{
            Error, Result, EXIT_HELM_FAILURE, EXIT_MANIFEST, EXIT_NO_PODS, EXIT_READINESS_TIMEOUT,
        },
        deploy::{DeploySummary, Deployer},
        helm::{
            client::PackageManager,
            command::{Action, HelmArgs},
        },
        manifest::{ChartEntry, GlobalOptions, Manifest},
        readiness::{PodPhase, PollSettings, WorkloadStatus},
    };
    use async_trait::async_trait;
    use std::{sync::Mutex, time::Duration};
    use tokio::time::Instant;

    /// Records every invocation. Release commands naming `fail_release` exit non-zero.
    #[derive(Default)]
    struct RecordingHelm {
        calls: Mutex<Vec<Vec<String>>>,
        fail_release: Option<String>,
    }

    impl RecordingHelm {
        fn failing_on(release: &str) -> Self {
            Self {
                fail_release: Some(release.to_string()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, verb: &str) -> usize {
            self.calls().iter().filter(|c| c[0] == verb).count()
        }
    }

    #[async_trait]
    impl PackageManager for RecordingHelm {
        async fn execute(&self, args: &HelmArgs) -> Result<()> {
            let args = args.as_slice().to_vec();
            self.calls.lock().unwrap().push(args.clone());
            if let Some(release) = &self.fail_release {
                if args.contains(release) && args[0] != "repo" {
                    return Err(Error::HelmCommandFailed {
                        command: "helm".to_string(),
                        args,
                        code: Some(1),
                    });
                }
            }
            Ok(())
        }
    }

    /// Reports the same Pods for every release.
    struct FixedPods {
        phase: Option<&'static str>,
        polled: Mutex<Vec<String>>,
    }

    impl FixedPods {
        fn running() -> Self {
            Self::with_phase(Some("Running"))
        }

        fn with_phase(phase: Option<&'static str>) -> Self {
            Self {
                phase,
                polled: Mutex::new(Vec::new()),
            }
        }

        fn polled(&self) -> Vec<String> {
            self.polled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkloadStatus for FixedPods {
        async fn pod_phases(&self, _namespace: &str, label_selector: &str) -> Result<Vec<PodPhase>> {
            self.polled.lock().unwrap().push(label_selector.to_string());
            Ok(self
                .phase
                .map(|phase| {
                    vec![PodPhase {
                        name: "pod-0".to_string(),
                        phase: Some(phase.to_string()),
                    }]
                })
                .unwrap_or_default())
        }
    }

    fn chart(release: &str, repo: &str) -> ChartEntry {
        ChartEntry {
            release_name: release.to_string(),
            chart_name: release.to_string(),
            chart_repo: repo.to_string(),
            values_file: format!("values/{release}.yaml"),
            version: None,
            namespace: "default".to_string(),
        }
    }

    fn manifest(dry_run: bool) -> Manifest {
        Manifest {
            options: GlobalOptions {
                dry_run,
                ..Default::default()
            },
            charts: vec![
                chart("argo-cd", "https://argoproj.github.io/argo-helm"),
                chart("redis", "oci://registry-1.docker.io/bitnamicharts"),
                chart("postgresql", "oci://registry-1.docker.io/bitnamicharts"),
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_install_never_polls() {
        let helm = RecordingHelm::default();
        let pods = FixedPods::running();

        let summary = Deployer::new(&helm, &pods)
            .run(Action::Install, &manifest(true))
            .await
            .unwrap();

        assert_eq!(helm.count("upgrade"), 3);
        assert_eq!(helm.count("repo"), 1);
        assert!(helm
            .calls()
            .iter()
            .filter(|c| c[0] == "upgrade")
            .all(|c| c.contains(&"--dry-run=client".to_string())));
        assert!(pods.polled().is_empty());
        assert_eq!(
            summary,
            DeploySummary {
                releases: vec![
                    "argo-cd".to_string(),
                    "redis".to_string(),
                    "postgresql".to_string()
                ],
                readiness_checks: 0,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_order_and_polling() {
        let helm = RecordingHelm::default();
        let pods = FixedPods::running();
        let started = Instant::now();

        let summary = Deployer::new(&helm, &pods)
            .run(Action::Install, &manifest(false))
            .await
            .unwrap();

        let calls = helm.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0][..2], ["repo", "add"]);
        assert_eq!(calls[1][..3], ["upgrade", "--install", "argo-cd"]);
        assert_eq!(calls[1][3], "argoproj.github.io/argo-cd");
        assert_eq!(calls[2][2], "redis");
        assert_eq!(calls[3][2], "postgresql");

        assert_eq!(
            pods.polled(),
            vec![
                "app.kubernetes.io/instance=argo-cd".to_string(),
                "app.kubernetes.io/instance=redis".to_string(),
                "app.kubernetes.io/instance=postgresql".to_string(),
            ]
        );
        assert_eq!(summary.readiness_checks, 3);
        // Two pauses between three entries.
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_uninstall_never_polls() {
        for dry_run in [false, true] {
            let helm = RecordingHelm::default();
            let pods = FixedPods::running();

            let summary = Deployer::new(&helm, &pods)
                .run(Action::Uninstall, &manifest(dry_run))
                .await
                .unwrap();

            assert_eq!(helm.count("uninstall"), 3);
            assert_eq!(helm.count("repo"), 0);
            assert!(pods.polled().is_empty());
            assert_eq!(summary.readiness_checks, 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_helm_failure_aborts_remaining_entries() {
        let helm = RecordingHelm::failing_on("redis");
        let pods = FixedPods::running();

        let error = Deployer::new(&helm, &pods)
            .run(Action::Install, &manifest(false))
            .await
            .unwrap_err();

        assert_eq!(error.exit_code(), EXIT_HELM_FAILURE);
        assert_eq!(helm.count("upgrade"), 2);
        assert!(!helm.calls().iter().any(|c| c.contains(&"postgresql".to_string())));
        // Only the entry before the failure was polled.
        assert_eq!(pods.polled().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_repository_url_runs_nothing() {
        let helm = RecordingHelm::default();
        let pods = FixedPods::running();
        let mut manifest = manifest(false);
        manifest.charts[1].chart_repo = "https://".to_string();

        let error = Deployer::new(&helm, &pods)
            .run(Action::Install, &manifest)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::RepoUrlParse { .. }));
        assert_eq!(error.exit_code(), EXIT_MANIFEST);
        assert!(helm.calls().is_empty());
        assert!(pods.polled().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pods_aborts_run() {
        let helm = RecordingHelm::default();
        let pods = FixedPods::with_phase(None);

        let error = Deployer::new(&helm, &pods)
            .run(Action::Install, &manifest(false))
            .await
            .unwrap_err();

        assert_eq!(error.exit_code(), EXIT_NO_PODS);
        assert_eq!(helm.count("upgrade"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_run() {
        let helm = RecordingHelm::default();
        let pods = FixedPods::with_phase(Some("Pending"));

        let error = Deployer::new(&helm, &pods)
            .with_entry_pause(Duration::ZERO)
            .with_poll_settings(PollSettings {
                interval: Duration::from_secs(1),
                timeout: Duration::from_secs(10),
            })
            .run(Action::Install, &manifest(false))
            .await
            .unwrap_err();

        assert_eq!(error.exit_code(), EXIT_READINESS_TIMEOUT);
        assert_eq!(helm.count("upgrade"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_manifest_is_a_no_op() {
        let helm = RecordingHelm::default();
        let pods = FixedPods::running();

        let summary = Deployer::new(&helm, &pods)
            .run(Action::Install, &Manifest::default())
            .await
            .unwrap();

        assert_eq!(summary, DeploySummary::default());
        assert!(helm.calls().is_empty());
    }
}
