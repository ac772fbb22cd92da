use crate::{model_backend::ModelBackend, registry::ModelInfo, server::SharedState};
use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;

#[derive(Serialize)]
pub struct ModelStatusResponse {
    pub success: bool,
    pub models: BTreeMap<String, ModelInfo>,
    pub device: String,
}

/// Report availability and benchmark metadata for every catalogued model.
/// Never forces a load and never fails when model files are absent.
#[instrument(skip(state))]
pub async fn model_status<B: ModelBackend>(
    State(state): State<SharedState<B>>,
) -> Json<ModelStatusResponse> {
    state.metrics.record_request("model_status");
    let registry = state.classifier.registry();

    let mut models = BTreeMap::new();
    for id in registry.ids() {
        // ids() only yields catalogued models, so info cannot fail here.
        if let Ok(info) = registry.info(id) {
            models.insert(id.as_str().to_string(), info);
        }
    }

    Json(ModelStatusResponse {
        success: true,
        models,
        device: registry.device().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::routes::api_routes;
    use super::super::classify::tests::test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn status_json(models_dir: &std::path::Path) -> serde_json::Value {
        let uploads = tempfile::tempdir().unwrap();
        let app = api_routes().with_state(test_state(models_dir, uploads.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/model-status/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn reports_missing_model_files_without_failing() {
        let models = tempfile::tempdir().unwrap();
        let body = status_json(models.path()).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["models"]["heavy"]["exists"], false);
        assert_eq!(body["models"]["light"]["exists"], false);
        assert_eq!(body["models"]["heavy"]["loaded"], false);
        assert_eq!(body["models"]["heavy"]["size_mb"], serde_json::Value::Null);
        assert_eq!(body["device"], "cpu");
    }

    #[tokio::test]
    async fn reports_present_model_files() {
        let models = tempfile::tempdir().unwrap();
        std::fs::write(models.path().join("light.onnx"), vec![0u8; 4096]).unwrap();
        let body = status_json(models.path()).await;

        assert_eq!(body["models"]["light"]["exists"], true);
        assert_eq!(body["models"]["light"]["name"], "Light");
        assert!(body["models"]["light"]["size_mb"].as_f64().unwrap() > 0.0);
        assert_eq!(
            body["models"]["light"]["batch_metrics"][0]["batch_size"],
            1
        );
        assert!(body["models"]["light"]["cifar10_accuracy"].as_f64().is_some());
    }
}
