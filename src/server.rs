use crate::{
    classifier::Classifier, config::Config, model_backend::ModelBackend,
    registry::ModelRegistry, routes::api_routes, telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::{path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

pub struct SharedState<B: ModelBackend> {
    pub classifier: Classifier<B>,
    pub upload_dir: PathBuf,
    pub metrics: Arc<Metrics>,
}

impl<B: ModelBackend> Clone for SharedState<B> {
    fn clone(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            upload_dir: self.upload_dir.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<B: ModelBackend>(
        registry: Arc<ModelRegistry<B>>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics = Arc::new(Metrics::new());
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState {
            classifier: Classifier::new(registry),
            upload_dir: config.upload.upload_dir.clone(),
            metrics,
        };

        let router = Router::new()
            .merge(api_routes())
            .with_state(app_state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", &self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
