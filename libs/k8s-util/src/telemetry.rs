use crate::error::{Error, Result};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const SERVICE_NAME: &str = "svclabel-webhook";

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Keeps the span exporter alive; call [`TelemetryGuard::shutdown`] before exiting so batched
/// spans are flushed.
#[must_use]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("failed to flush pending spans: {}", e);
            }
        }
    }
}

fn init_tracer(tracing_url: &str, sample_ratio: f64) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(tracing_url)
        .build()
        .map_err(|e| Error::TracerInit("failed to build OTLP span exporter".to_string(), e))?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            sample_ratio,
        ))))
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// Parse a filter directive such as `info,svclabel_mutator=debug`.
pub fn log_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| Error::LogFilter(format!("invalid log filter `{directives}`"), e))
}

/// Install the global tracing subscriber.
///
/// Spans are exported over OTLP/gRPC when `tracing_url` is set, sampled with `sample_ratio`
/// unless the parent span was already sampled.
pub async fn init(
    log_filter_directives: &str,
    log_format: LogFormat,
    tracing_url: Option<&str>,
    sample_ratio: f64,
) -> Result<TelemetryGuard> {
    let filter = log_filter(log_filter_directives)?;

    let provider = tracing_url
        .map(|url| init_tracer(url, sample_ratio))
        .transpose()?;
    let otel_layer = provider.as_ref().map(|provider| {
        let tracer: SdkTracer = provider.tracer(SERVICE_NAME);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    let (text_layer, json_layer) = match log_format {
        LogFormat::Text => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| Error::SubscriberInit("failed to set global subscriber".to_string(), e))?;

    tracing::debug!(?log_format, tracing = tracing_url.is_some(), "telemetry initialized");
    Ok(TelemetryGuard { provider })
}
