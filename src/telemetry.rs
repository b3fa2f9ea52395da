use axum::http::StatusCode;
use log::debug;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{InstrumentationScope, KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{
    MeterProviderBuilder, PeriodicReader, SdkMeterProvider, Temporality,
};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_semantic_conventions::attribute::SERVICE_VERSION;
use std::env;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::metadata::LevelFilter;
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("init opentelemetry exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),
    #[error("init env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Initialize tracing-subscriber and return `OtelGuard` for opentelemetry-related termination processing
pub fn init_tracing_subscriber() -> Result<OtelGuard, Error> {
    let meter_provider = init_meter_provider()?;
    let tracer_provider = init_tracing_provider()?;

    global::set_text_map_propagator(TraceContextPropagator::new());

    let tracer = tracer_provider.tracer("tracing-otel-subscriber");

    #[cfg(not(feature = "local"))]
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_current_span(false)
        .with_span_list(false)
        .boxed();
    #[cfg(feature = "local")]
    let fmt_layer = tracing_subscriber::fmt::layer().with_thread_names(true).boxed();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        // internal opentelemetry logs are noise
        .add_directive(Directive::from_str("opentelemetry=off")?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(MetricsLayer::new(meter_provider.clone()))
        .with(fmt_layer)
        .with(OpenTelemetryLayer::new(tracer))
        .init();

    Ok(OtelGuard {
        meter_provider,
        tracer_provider,
    })
}

pub struct OtelGuard {
    meter_provider: SdkMeterProvider,
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        let _ = self.meter_provider.shutdown();
        let _ = self.tracer_provider.shutdown();

        debug!("Shut down all OpenTelemetry providers");
    }
}

fn init_meter_provider() -> Result<SdkMeterProvider, Error> {
    let exporter =
        MetricExporter::builder().with_tonic().with_temporality(Temporality::default()).build()?;

    let reader = PeriodicReader::builder(exporter).build();

    let meter_provider =
        MeterProviderBuilder::default().with_resource(resource()).with_reader(reader).build();

    global::set_meter_provider(meter_provider.clone());

    Ok(meter_provider)
}

fn init_tracing_provider() -> Result<SdkTracerProvider, Error> {
    let exporter = SpanExporter::builder().with_tonic().build()?;

    let provider = SdkTracerProvider::builder()
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    Ok(provider)
}

fn resource() -> Resource {
    Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_attributes([
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.build_time", env!("BUILD_TIME")),
        ])
        .build()
}

static RESOURCE_ATTRIBUTES: LazyLock<Vec<KeyValue>> = LazyLock::new(|| {
    match env::var("OTEL_RESOURCE_ATTRIBUTES") {
        Ok(s) if !s.is_empty() => parse_resource_attributes(&s),
        Ok(_) | Err(_) => vec![],
    }
});

fn parse_resource_attributes(value: &str) -> Vec<KeyValue> {
    let extract_key_value = |entry: &str| {
        entry.split_once('=').and_then(|(k, v)| {
            if v.contains('=') {
                None
            } else {
                Some(KeyValue::new(
                    k.trim().replace('.', "_"),
                    v.trim().to_owned(),
                ))
            }
        })
    };
    value.split_terminator(',').filter_map(extract_key_value).collect()
}

// TODO: drop once the MeterProvider propagates resource attributes to exported metrics
fn with_resource_attributes(additional_attributes: Vec<KeyValue>) -> Vec<KeyValue> {
    [RESOURCE_ATTRIBUTES.clone(), additional_attributes].concat()
}

static METER: LazyLock<Meter> = LazyLock::new(|| {
    global::meter_with_scope(
        InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(env!("CARGO_PKG_VERSION"))
            .build(),
    )
});

const LATENCY_BOUNDARIES_SECS: [f64; 31] = [
    0.001, 0.002, 0.003, 0.004, 0.005, 0.006, 0.007, 0.008, 0.009, 0.01, 0.02, 0.03, 0.04, 0.05,
    0.06, 0.07, 0.08, 0.09, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 2.0, 5.0, 10.0,
];

static COUNTER_SESSIONS_CREATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("memcookie_sessions_created")
        .with_description("Number of sessions written to the cache")
        .build()
});

pub fn inc_sessions_created(auth_source: &str) {
    COUNTER_SESSIONS_CREATED.add(
        1,
        with_resource_attributes(vec![KeyValue::new("auth_source", auth_source.to_string())])
            .as_slice(),
    );
}

static COUNTER_LOGOUTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("memcookie_logouts")
        .with_description("Number of sessions removed on logout")
        .build()
});

pub fn inc_logouts() {
    COUNTER_LOGOUTS.add(1, with_resource_attributes(vec![]).as_slice());
}

static COUNTER_HANDLER_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("memcookie_handler_errors")
        .with_description("Number of handler errors")
        .build()
});

pub fn inc_handler_errors(path: &str, error_kind: &str) {
    COUNTER_HANDLER_ERRORS.add(
        1,
        with_resource_attributes(vec![
            KeyValue::new("path", path.to_string()),
            KeyValue::new("error_kind", error_kind.to_string()),
        ])
        .as_slice(),
    );
}

static HISTOGRAM_HTTP_RESPONSE_SECS: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http_response_secs")
        .with_description("Response time in seconds")
        .with_boundaries(LATENCY_BOUNDARIES_SECS.to_vec())
        .build()
});

pub fn record_http_response_latency(path: &str, latency: Duration, status_code: StatusCode) {
    HISTOGRAM_HTTP_RESPONSE_SECS.record(
        latency.as_secs_f64(),
        with_resource_attributes(vec![
            KeyValue::new("status_code", status_code.as_str().to_string()),
            KeyValue::new("path", path.to_string()),
        ])
        .as_slice(),
    );
}

static HISTOGRAM_CACHE_OPERATION_SECS: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("memcookie_cache_operation_secs")
        .with_description("Latency of memcached operations in seconds")
        .with_boundaries(LATENCY_BOUNDARIES_SECS.to_vec())
        .build()
});

pub fn record_cache_operation_latency(operation: &str, latency: Duration) {
    HISTOGRAM_CACHE_OPERATION_SECS.record(
        latency.as_secs_f64(),
        with_resource_attributes(vec![KeyValue::new("operation", operation.to_string())])
            .as_slice(),
    );
}
