//! ZFS LocalPV Controller
//!
//! Runs the lifecycle API over either the Kubernetes record store or, in
//! standalone mode, an in-memory store seeded from the config file.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use zfs_localpv_controller::{
    ApiServer, ApiServerConfig, Controller, ControllerConfig, ControllerMetrics, Error,
    InMemoryRecordStore, KubeRecordStore, PoolInventory, RecordStore, Result,
    StaticPoolInventory, UsageReporter, ZfsNodeInventory,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// ZFS LocalPV Controller - provisioning control plane for node-local ZFS volumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Path to a YAML controller configuration
    #[arg(long, env = "CONTROLLER_CONFIG")]
    config: Option<String>,

    /// Namespace for ZfsVolume and ZfsSnapshot records
    #[arg(long, env = "ZFS_NAMESPACE")]
    namespace: Option<String>,

    /// Send anonymous usage events
    #[arg(long, env = "ENABLE_TELEMETRY")]
    enable_telemetry: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Run in standalone mode (no Kubernetes)
    #[arg(long, env = "STANDALONE")]
    standalone: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;

    info!("Starting ZFS LocalPV Controller");
    info!("  Version: {}", zfs_localpv_controller::VERSION);
    info!("  Driver: {}", config.driver_name);
    info!("  Namespace: {}", config.namespace);
    info!("  Default scheduler: {}", config.default_scheduler);
    info!("  Telemetry: {}", config.telemetry.enabled);
    info!("  Standalone mode: {}", args.standalone);

    let (store, inventory): (Arc<dyn RecordStore>, Arc<dyn PoolInventory>) = if args.standalone {
        info!(nodes = config.static_nodes.len(), "Using in-memory record store");
        (
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(StaticPoolInventory::from_nodes(config.static_nodes.clone())),
        )
    } else {
        let client = kube::Client::try_default().await?;
        info!("Connected to Kubernetes API");
        (
            Arc::new(KubeRecordStore::new(client.clone(), &config.namespace)),
            Arc::new(ZfsNodeInventory::new(client)),
        )
    };

    let metrics = ControllerMetrics::new()?;
    let telemetry = Arc::new(UsageReporter::new(&config.telemetry, Some(metrics.clone()))?);

    let controller = Controller::new(config, store, inventory, telemetry).with_metrics(metrics.clone());

    // Start health server
    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr, metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    let api_config = ApiServerConfig {
        rest_addr: args.api_addr.parse().map_err(|e| {
            Error::Configuration(format!("Invalid REST API address: {}", e))
        })?,
    };

    let api_server = Arc::new(ApiServer::new(api_config, Arc::new(controller)));

    let signalled = api_server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
            signalled.shutdown();
        }
    });

    api_server.run().await?;

    info!("Controller shutdown complete");
    Ok(())
}

/// Load the config file, if any, then apply flag overrides
fn load_config(args: &Args) -> Result<ControllerConfig> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };

    if let Some(namespace) = &args.namespace {
        config.namespace = namespace.clone();
    }
    if args.enable_telemetry {
        config.telemetry.enabled = true;
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn", "tower_http=info", "axum=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let (status, body) = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => (StatusCode::OK, "ok"),
                _ => (StatusCode::NOT_FOUND, "not found"),
            };
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid health server address: {}", e))
    })?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, metrics: ControllerMetrics) -> Result<()> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(move |_conn| {
        let metrics = metrics.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let metrics = metrics.clone();
                async move {
                    let response = if req.uri().path() != "/metrics" {
                        let mut response = Response::new(Body::from("not found"));
                        *response.status_mut() = StatusCode::NOT_FOUND;
                        response
                    } else {
                        match metrics.encode() {
                            Ok(buffer) => {
                                let mut response = Response::new(Body::from(buffer));
                                response.headers_mut().insert(
                                    CONTENT_TYPE,
                                    HeaderValue::from_static("text/plain; version=0.0.4"),
                                );
                                response
                            }
                            Err(e) => {
                                let mut response = Response::new(Body::from(e.to_string()));
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                response
                            }
                        }
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid metrics server address: {}", e))
    })?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
