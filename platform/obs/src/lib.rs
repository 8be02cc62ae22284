//! Tracing bootstrap shared by the CLI and the HTTP server.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{self as sdk, Resource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

const SERVER_FILTER: &str = "info,tower_http=warn,reqwest=warn,hyper_util=warn";
/// Info from the binary itself, warnings from everything else.
const CLI_FILTER: &str = "warn,crm_server=info";

#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: &'static str,
    /// Overrides `RUST_LOG`.
    pub env_filter: Option<String>,
    /// Used when neither `env_filter` nor `RUST_LOG` is set.
    pub default_filter: &'static str,
    /// Overrides `OTLP_ENDPOINT`.
    pub otlp_endpoint: Option<String>,
}

impl ObsConfig {
    pub fn for_service(service_name: &'static str) -> Self {
        Self {
            service_name,
            env_filter: None,
            default_filter: SERVER_FILTER,
            otlp_endpoint: None,
        }
    }

    /// The long-running HTTP + GraphQL server.
    pub fn server() -> Self {
        Self::for_service("crm-server")
    }

    /// Board, dashboard, report and the other one-shot commands.
    pub fn cli() -> Self {
        Self {
            default_filter: CLI_FILTER,
            ..Self::for_service("crm-cli")
        }
    }

    fn resolved_filter(&self) -> String {
        pick_filter(
            self.env_filter.clone(),
            std::env::var("RUST_LOG").ok(),
            self.default_filter,
        )
    }
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self::server()
    }
}

fn pick_filter(explicit: Option<String>, from_env: Option<String>, fallback: &str) -> String {
    explicit
        .into_iter()
        .chain(from_env)
        .map(|filter| filter.trim().to_string())
        .find(|filter| !filter.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Install the stderr fmt subscriber, plus an OTLP span exporter when an
/// endpoint is set.
///
/// Later calls are no-ops.
pub fn init_tracing(config: ObsConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.resolved_filter())?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    let otlp_endpoint = config
        .otlp_endpoint
        .clone()
        .or_else(|| std::env::var("OTLP_ENDPOINT").ok());

    match otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint)
                .build()?;
            let provider = sdk::trace::SdkTracerProvider::builder()
                .with_resource(
                    Resource::builder()
                        .with_service_name(config.service_name)
                        .build(),
                )
                .with_batch_exporter(exporter)
                .build();
            let tracer = provider.tracer(config.service_name);
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()?;
        }
        None => registry.try_init()?,
    }

    INIT.set(())
        .map_err(|_| anyhow!("tracing already initialized"))?;
    Ok(())
}
