use std::future::Future;

use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("namespace {0} not found")]
    NotFound(String),

    #[error("failed to fetch namespace {0}: {1}")]
    Transport(String, #[source] Box<kube::Error>),
}

/// Resolves a Namespace object by name.
///
/// Implementations are shared by every in-flight admission call, so they must be safe for
/// concurrent use. They must not retry: a failed lookup is reported to the caller immediately.
pub trait NamespaceLookup: Send + Sync {
    fn get(&self, name: &str) -> impl Future<Output = Result<Namespace, LookupError>> + Send;
}

/// Namespace lookup backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeNamespaces {
    api: Api<Namespace>,
}

impl KubeNamespaces {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

impl NamespaceLookup for KubeNamespaces {
    async fn get(&self, name: &str) -> Result<Namespace, LookupError> {
        match self.api.get(name).await {
            Ok(namespace) => Ok(namespace),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(LookupError::NotFound(name.to_string()))
            }
            Err(e) => Err(LookupError::Transport(name.to_string(), Box::new(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::{Request, Response};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::client::Body;
    use serde_json::json;

    type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

    fn mock_namespaces() -> (KubeNamespaces, ApiServerHandle) {
        let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let mock_client = Client::new(mock_service, "default");
        (KubeNamespaces::new(mock_client), handle)
    }

    fn status_body(code: u16, reason: &str, message: &str) -> Body {
        let status = json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code,
        });
        Body::from(serde_json::to_vec(&status).unwrap())
    }

    async fn respond_once(
        mut handle: ApiServerHandle,
        name: &'static str,
        response: Response<Body>,
    ) {
        let (request, send) = handle.next_request().await.expect("service not called");
        assert_eq!(request.method(), http::Method::GET);
        assert_eq!(request.uri().path(), format!("/api/v1/namespaces/{name}"));
        send.send_response(response);
    }

    #[tokio::test]
    async fn test_get_existing_namespace() {
        let (namespaces, handle) = mock_namespaces();
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some("team-a".to_string()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        let body = Body::from(serde_json::to_vec(&namespace).unwrap());
        let server = tokio::spawn(respond_once(
            handle,
            "team-a",
            Response::builder().body(body).unwrap(),
        ));

        let found = namespaces.get("team-a").await.expect("namespace exists");
        assert_eq!(found.metadata.name.as_deref(), Some("team-a"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_namespace_is_not_found() {
        let (namespaces, handle) = mock_namespaces();
        let server = tokio::spawn(respond_once(
            handle,
            "ghost",
            Response::builder()
                .status(404)
                .body(status_body(404, "NotFound", "namespaces \"ghost\" not found"))
                .unwrap(),
        ));

        let err = namespaces.get("ghost").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound(ref name) if name == "ghost"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_server_failure_is_transport_error() {
        let (namespaces, handle) = mock_namespaces();
        let server = tokio::spawn(respond_once(
            handle,
            "team-a",
            Response::builder()
                .status(500)
                .body(status_body(500, "InternalError", "etcd unavailable"))
                .unwrap(),
        ));

        let err = namespaces.get("team-a").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport(ref name, _) if name == "team-a"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_closed_connection_is_transport_error() {
        let (namespaces, handle) = mock_namespaces();
        drop(handle);

        let err = namespaces.get("team-a").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport(..)));
    }
}
