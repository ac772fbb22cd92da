use crate::{
    model_backend::ModelBackend,
    registry::ModelId,
    routes::ApiError,
    sanitize::{resolve_in_upload_dir, sanitize_filename},
    server::SharedState,
    storage::TempUpload,
    validation,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub success: bool,
    pub prediction: String,
    pub confidence: f64,
    pub model_used: String,
    pub class_id: usize,
    pub inference_time: f64,
    pub total_time: f64,
    pub filename: String,
}

#[instrument(skip(state, multipart))]
pub async fn classify<B: ModelBackend>(
    State(state): State<SharedState<B>>,
    mut multipart: Multipart,
) -> Result<Json<ClassifyResponse>, ApiError> {
    state.metrics.record_request("classify");

    let mut model_field: Option<String> = None;
    let mut image: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        match field.name() {
            Some("model") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.to_string()))?;
                model_field = Some(value);
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(e.to_string()))?;
                image = Some((filename, data));
            }
            _ => {}
        }
    }

    let model: ModelId = model_field
        .ok_or(ApiError::MissingModel)?
        .trim()
        .try_into()
        .map_err(ApiError::InvalidModel)?;
    let (filename, data) = image.ok_or(ApiError::MissingImage)?;

    // Validation happens entirely in memory; nothing touches disk until the
    // upload is known to be a well-formed image.
    let validated = validation::validate(&data, &filename)?;
    tracing::debug!(
        filename = %filename,
        format = ?validated.format,
        width = validated.width,
        height = validated.height,
        "upload validated"
    );

    let safe_name = sanitize_filename(&filename);
    let path = resolve_in_upload_dir(&state.upload_dir, &safe_name)?;
    let upload = TempUpload::write(path, &data)
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?;

    let result = state.classifier.classify(upload.path(), model);
    upload.remove().await;
    let result = result?;

    state
        .metrics
        .record_classify_duration(result.total_time_ms as u64, model.as_str());
    tracing::info!(
        model = %model,
        prediction = %result.prediction,
        class_id = result.class_id,
        confidence = result.confidence,
        inference_time_ms = result.inference_time_ms,
        total_time_ms = result.total_time_ms,
        "image classified"
    );

    Ok(Json(ClassifyResponse {
        success: true,
        prediction: result.prediction,
        confidence: result.confidence,
        model_used: model.as_str().to_string(),
        class_id: result.class_id,
        inference_time: result.inference_time_ms,
        total_time: result.total_time_ms,
        filename: safe_name,
    }))
}
