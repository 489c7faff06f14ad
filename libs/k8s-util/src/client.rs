use crate::error::{Error, Result};

use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tracing::{info, warn};

/// Build the Kubernetes client used for the whole process lifetime.
///
/// In-cluster configuration is preferred. Outside of a cluster the kubeconfig pointed to by
/// `KUBECONFIG` (or `~/.kube/config`) is used instead.
pub async fn new_client() -> Result<Client> {
    let config = match Config::incluster() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "falling back to kubeconfig");
            Config::from_kubeconfig(&KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::KubeConfig("failed to build kubeconfig".to_string(), Box::new(e))
                })?
        }
    };

    let client = Client::try_from(config).map_err(|e| {
        Error::KubeClient(
            "failed to create Kubernetes client".to_string(),
            Box::new(e),
        )
    })?;

    info!("Kubernetes client initialized successfully");
    Ok(client)
}
