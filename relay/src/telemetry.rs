//! Tracing initialization and HTTP request spans.
//!
//! Console logging is always active, honoring `RUST_LOG` with a fallback
//! filter. With the `telemetry` feature (default), spans are additionally
//! exported over OTLP whenever the standard `OTEL_EXPORTER_OTLP_*`
//! environment variables are present.

use std::time::Duration;

use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "telemetry")]
use opentelemetry::trace::TracerProvider as _;
#[cfg(feature = "telemetry")]
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Initializes the global tracing subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset. Returns a guard that
/// flushes the OTLP exporter on drop; hold it for the life of the process.
pub fn init(default_filter: &str) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    #[cfg(feature = "telemetry")]
    {
        let tracer_provider = otlp_tracer_provider();
        let otel_layer = tracer_provider
            .as_ref()
            .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("relay")));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(otel_layer)
            .init();

        if tracer_provider.is_some() {
            tracing::info!("OTLP trace exporter registered");
        }
        TelemetryGuard { tracer_provider }
    }

    #[cfg(not(feature = "telemetry"))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        TelemetryGuard {}
    }
}

/// Builds an OTLP tracer provider when the exporter env vars are present.
#[cfg(feature = "telemetry")]
fn otlp_tracer_provider() -> Option<SdkTracerProvider> {
    use opentelemetry_semantic_conventions::{SCHEMA_URL, attribute::SERVICE_VERSION};

    let configured = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok()
        || std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").is_ok();
    if !configured {
        return None;
    }

    let exporter = match std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").ok().as_deref() {
        Some("grpc") => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build(),
        _ => opentelemetry_otlp::SpanExporter::builder().with_http().build(),
    };
    let exporter = exporter.ok()?;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_schema_url(
            [opentelemetry::KeyValue::new(
                SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            SCHEMA_URL,
        )
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build(),
    )
}

/// Owns the tracer provider; flushes exporters on drop.
#[derive(Debug)]
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<SdkTracerProvider>,
}

#[cfg(feature = "telemetry")]
impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(ref provider) = self.tracer_provider
            && let Err(err) = provider.shutdown()
        {
            tracing::error!(?err, "tracer provider shutdown error");
        }
    }
}

/// Per-request tracing layer: one `http_request` span per request with the
/// response status recorded on completion.
pub fn http_trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    HttpMakeSpan,
    DefaultOnRequest,
    HttpOnResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(HttpMakeSpan)
        .on_response(HttpOnResponse)
}

/// Custom span maker for HTTP requests.
#[derive(Clone, Copy, Debug)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            status = tracing::field::Empty,
        )
    }
}

/// Custom response handler for HTTP tracing.
#[derive(Clone, Copy, Debug)]
pub struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        span.record("status", response.status().as_u16());
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
    }
}
