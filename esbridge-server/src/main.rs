use anyhow::Result;
use clap::Parser;
use esbridge::{BridgeServer, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "esbridge-server")]
#[command(about = "Elasticsearch multi-search bridge")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "esbridge.toml")]
    config: String,

    /// Address to bind to, overrides server.bind_addr
    #[arg(long, env = "ESBRIDGE_BIND")]
    bind: Option<String>,

    /// Backend base URL, overrides backend.url
    #[arg(long, env = "ESBRIDGE_BACKEND_URL")]
    backend_url: Option<String>,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.observability.log_level));

    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.observability.log_format.clone());

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(std::path::Path::new(&args.config))?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(url) = args.backend_url {
        config.backend.url = url;
    }

    init_tracing(&config);

    tracing::info!("Starting esbridge on {}", config.server.bind_addr);
    tracing::info!("Config file: {}", args.config);
    tracing::info!(
        "Serving /{}/_msearch from {}{}",
        config.index.name,
        config.backend.url,
        config.backend.search_path
    );
    if config.passthrough.enabled {
        tracing::info!("Forwarding other routes to {}", config.passthrough.url);
    }

    let server = BridgeServer::from_config(&config)?;
    let mut router = server.router();

    if config.observability.metrics_enabled {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
        router = router.merge(
            axum::Router::new().route(
                "/metrics",
                axum::routing::get(move || std::future::ready(handle.render())),
            ),
        );
        tracing::info!("Prometheus metrics at /metrics");
    }

    esbridge::server::serve(router, &config.server.bind_addr).await?;

    Ok(())
}
