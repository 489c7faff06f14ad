use crate::admission::{AdmissionDecision, AdmissionRequest};
use crate::error::EngineError;
use crate::label::{SERVICE_LABEL, service_label_value};
use crate::patch::service_label_patch;
use crate::pod::PodView;

use svclabel_k8s_util::namespace::NamespaceLookup;

use tracing::debug;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Pick the namespace a request belongs to: the request's own, then the object's, then
/// `default`.
pub fn effective_namespace<'a>(request_namespace: &'a str, object_namespace: &'a str) -> &'a str {
    [request_namespace, object_namespace]
        .into_iter()
        .find(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE)
}

/// Decides whether an admitted Pod needs its `service` label set or corrected.
///
/// The namespace lookup is built once at startup and shared by every call.
pub struct Engine<L> {
    namespaces: L,
}

impl<L: NamespaceLookup> Engine<L> {
    pub fn new(namespaces: L) -> Self {
        Self { namespaces }
    }

    pub async fn decide(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionDecision, EngineError> {
        let pod = PodView::project(&request.object).map_err(EngineError::ProjectionFailed)?;
        let decision = AdmissionDecision::allow(&request.uid);

        if !pod.is_pod() {
            debug!(kind = %pod.kind, "not a Pod, allowing unchanged");
            return Ok(decision);
        }

        debug!(
            kind = %pod.kind,
            name = pod.name(),
            labels = ?pod.labels(),
            "incoming object labels"
        );

        // only existence matters, the namespace labels are not read
        let namespace = effective_namespace(&request.namespace, pod.namespace());
        self.namespaces
            .get(namespace)
            .await
            .map_err(|source| EngineError::NamespaceUnavailable {
                namespace: namespace.to_string(),
                source,
            })?;

        let Some(value) = service_label_value(pod.labels()) else {
            debug!(name = pod.name(), "no source labels, allowing unchanged");
            return Ok(decision);
        };

        match service_label_patch(pod.labels(), &value) {
            Some(patch) => {
                debug!(
                    label = SERVICE_LABEL,
                    value = %value,
                    pod = pod.name(),
                    namespace,
                    "patching service label"
                );
                Ok(decision.with_patch(patch))
            }
            None => Ok(decision),
        }
    }
}
