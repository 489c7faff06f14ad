use crate::state::WebhookState;

use svclabel_k8s_util::namespace::NamespaceLookup;
use svclabel_mutator::admission::AdmissionReview;
use svclabel_mutator::decoder::decode;
use svclabel_mutator::error::{DecodeError, EngineError};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{Router, get, post};
use tracing::field::Empty;
use tracing::{Span, debug, error};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to encode admission response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
            WebhookError::Engine(_) | WebhookError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

pub fn router<L>(state: WebhookState<L>) -> Router
where
    L: NamespaceLookup + 'static,
{
    Router::new()
        .route("/add-label", post(add_label::<L>))
        .route("/health", get(health))
        .route("/livez", get(livez))
        .route("/readyz", get(readyz::<L>))
        .with_state(state)
}

async fn health() -> &'static str {
    debug!("health check OK");
    "OK"
}

async fn livez() -> &'static str {
    "healthy"
}

async fn readyz<L>(State(state): State<WebhookState<L>>) -> StatusCode
where
    L: Send + Sync + 'static,
{
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Admission endpoint: derives the Pod `service` label and answers with a JSON Patch.
#[tracing::instrument(
    name = "add_label",
    skip_all,
    fields(uid = Empty, kind = Empty, namespace = Empty, name = Empty, operation = Empty)
)]
pub async fn add_label<L>(
    State(state): State<WebhookState<L>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AdmissionReview>, WebhookError>
where
    L: NamespaceLookup + 'static,
{
    match review(&state, &headers, &body).await {
        Ok(review) => Ok(Json(review)),
        Err(e) => {
            error!(error = %e, "could not generate admission response");
            Err(e)
        }
    }
}

async fn review<L>(
    state: &WebhookState<L>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AdmissionReview, WebhookError>
where
    L: NamespaceLookup,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let request = decode(content_type, body)?;

    let span = Span::current();
    span.record("uid", request.uid.as_str());
    span.record("kind", request.kind.kind.as_str());
    span.record("namespace", request.namespace.as_str());
    span.record("name", request.name.as_str());
    span.record("operation", request.operation.as_str());

    let decision = state.engine.decide(&request).await?;
    let review = decision.into_review(request.envelope)?;
    debug!(response = ?review.response, "admission response");
    Ok(review)
}
