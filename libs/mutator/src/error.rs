use svclabel_k8s_util::namespace::LookupError;

use thiserror::Error;

/// The inbound call could not be turned into an admission request.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid Content-Type, expected application/json")]
    BadContentType(Option<String>),

    #[error("failed to decode admission review: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("invalid admission review: missing request field")]
    MissingRequest,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to convert object: {0}")]
    ProjectionFailed(#[source] serde_json::Error),

    #[error("namespace unavailable: {source}")]
    NamespaceUnavailable {
        namespace: String,
        #[source]
        source: LookupError,
    },
}
