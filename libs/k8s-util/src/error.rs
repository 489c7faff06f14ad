use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}: {1}")]
    // Boxing this error because the size can be large
    KubeConfig(String, #[source] Box<kube::config::KubeconfigError>),

    #[error("{0}: {1}")]
    KubeClient(String, #[source] Box<kube::Error>),

    #[error("{0}: {1}")]
    LogFilter(String, #[source] tracing_subscriber::filter::ParseError),

    #[error("{0}: {1}")]
    TracerInit(String, #[source] opentelemetry_otlp::ExporterBuildError),

    #[error("{0}: {1}")]
    SubscriberInit(String, #[source] tracing_subscriber::util::TryInitError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
