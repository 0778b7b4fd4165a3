use crate::{
    common::{
        constants::KUBE_API_PAGE_SIZE,
        error::{K8sClientGeneration, ListPodsWithLabel, Result},
    },
    readiness::{PodPhase, WorkloadStatus},
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams},
    Client, ResourceExt,
};
use snafu::ResultExt;
use tokio::sync::OnceCell;
use tracing::debug;

/// Lazily connected Kubernetes API client. The kubeconfig (or in-cluster config) is only read
/// when the first request is made, so dry runs and uninstalls work without cluster access.
#[derive(Default)]
pub struct KubeClientSet {
    client: OnceCell<Client>,
}

impl KubeClientSet {
    /// Creates a client set which connects on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kube::Client, generating it if this is the first call.
    pub async fn client(&self) -> Result<&Client> {
        self.client
            .get_or_try_init(|| async { Client::try_default().await })
            .await
            .context(K8sClientGeneration)
    }

    /// Generate the Pod api client.
    pub async fn pods_api(&self, namespace: &str) -> Result<Api<Pod>> {
        Ok(Api::namespaced(self.client().await?.clone(), namespace))
    }

    /// Lists all Pods in the namespace which match the label selector, following continue
    /// tokens until the list is exhausted.
    pub async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let mut pods: Vec<Pod> = Vec::with_capacity(KUBE_API_PAGE_SIZE as usize);

        let mut list_params = ListParams::default()
            .limit(KUBE_API_PAGE_SIZE)
            .labels(label_selector);

        let pods_api = self.pods_api(namespace).await?;
        loop {
            let pod_list = pods_api
                .list(&list_params)
                .await
                .context(ListPodsWithLabel {
                    label: label_selector.to_string(),
                    namespace: namespace.to_string(),
                })?;

            let maybe_token = pod_list.metadata.continue_.clone();

            pods.extend(pod_list);

            match maybe_token {
                Some(ref token) if !token.is_empty() => {
                    list_params = list_params.continue_token(token);
                }
                _ => break,
            }
        }

        Ok(pods)
    }
}

#[async_trait]
impl WorkloadStatus for KubeClientSet {
    async fn pod_phases(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodPhase>> {
        let pods = self.list_pods(namespace, label_selector).await?;
        debug!(
            %namespace,
            label = %label_selector,
            count = pods.len(),
            "Listed release Pods"
        );

        Ok(pods
            .iter()
            .map(|pod| PodPhase {
                name: pod.name_any(),
                phase: pod.status.as_ref().and_then(|status| status.phase.clone()),
            })
            .collect())
    }
}
