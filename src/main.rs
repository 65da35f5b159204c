use clap::Parser;
use reptile_global::domain::ports::Storage;
use reptile_global::utils::logger::{self, LogFormat};
use reptile_global::utils::validation::Validate;
use reptile_global::{
    router, AppState, CliConfig, CloudinaryHost, HttpMailer, LocalStorage, MapboxRouting,
    MemoryStorage, Ports,
};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("🛑 Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    tracing::info!("Starting reptile-global");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = cli.load()?;
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let storage: Arc<dyn Storage> = if cli.ephemeral {
        tracing::warn!("⚠️ Ephemeral mode: data lives in memory only");
        Arc::new(MemoryStorage::new())
    } else {
        tracing::info!("📁 Data directory: {}", config.storage.data_dir);
        Arc::new(LocalStorage::new(config.storage.data_dir.clone()))
    };

    if config.maps.access_token.is_empty() {
        tracing::warn!("⚠️ No maps access token; routes fall back to straight lines");
    }

    let ports = Ports {
        storage,
        image_host: Arc::new(CloudinaryHost::new(
            config.upload.endpoint.clone(),
            config.upload.cloud_name.clone(),
        )),
        mailer: Arc::new(HttpMailer::new(
            config.mail.endpoint.clone(),
            config.mail.api_key.clone(),
            config.mail.from.clone(),
        )),
        routing: Arc::new(MapboxRouting::new(
            config.maps.access_token.clone(),
            config.maps.directions_endpoint.clone(),
            config.maps.geocoding_endpoint.clone(),
        )),
    };

    let state = AppState::build(&config, ports).await?;
    let app = router(state, &config.server.cors_origins);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("✅ Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}
