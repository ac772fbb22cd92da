use crate::{
    cleanup::CleanupSweeper, config::Config, ort_backend::OrtBackend, registry::ModelRegistry,
    server::HttpServer,
};
use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let backend = match OrtBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("Failed to initialize inference backend: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let registry = match ModelRegistry::new(backend, &config.models) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            tracing::error!("Failed to build model registry: {:?}", e);
            return Err(e.into());
        }
    };

    tokio::fs::create_dir_all(&config.upload.upload_dir).await?;

    let (shutdown_tx, _) = broadcast::channel(1);

    let sweeper = CleanupSweeper::new(&config.upload);
    let sweeper_handle = sweeper.start(shutdown_tx.subscribe());

    let server = HttpServer::new(registry, &config).await?;
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;
    let _ = sweeper_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
