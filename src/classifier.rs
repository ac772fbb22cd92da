use crate::{
    model_backend::ModelBackend,
    registry::{round2, ModelId, ModelRegistry, RegistryError},
};
use image::{imageops::FilterType, GenericImageView};
use ndarray::Array4;
use std::{path::Path, sync::Arc, time::Instant};
use thiserror::Error;

const TARGET_SIZE: u32 = 32;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to decode image: {0}")]
    Image(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model produced no output scores")]
    EmptyOutput,
    #[error("predicted class {index} is outside the known label range ({num_classes} classes)")]
    ClassMapping { index: usize, num_classes: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub prediction: String,
    pub confidence: f64,
    pub class_id: usize,
    pub inference_time_ms: f64,
    pub total_time_ms: f64,
}

/// Runs the preprocess → forward-pass → postprocess pipeline against models
/// served by the registry.
pub struct Classifier<B: ModelBackend> {
    registry: Arc<ModelRegistry<B>>,
}

impl<B: ModelBackend> Clone for Classifier<B> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<B: ModelBackend> Classifier<B> {
    pub fn new(registry: Arc<ModelRegistry<B>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry<B> {
        &self.registry
    }

    /// Classify the image stored at `image_path` with the selected model.
    /// `inference_time_ms` covers the forward pass alone; `total_time_ms`
    /// covers the whole pipeline including the model load and image decode.
    pub fn classify(
        &self,
        image_path: &Path,
        id: ModelId,
    ) -> Result<ClassificationResult, ClassifyError> {
        let started = Instant::now();

        let model = self.registry.load(id)?;
        let input = preprocess(image_path)?;

        let inference_started = Instant::now();
        let scores = self
            .registry
            .backend()
            .run(&model, &input)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        let inference_time = inference_started.elapsed();

        let probabilities = softmax(&scores);
        let (class_id, probability) = argmax(&probabilities).ok_or(ClassifyError::EmptyOutput)?;

        let labels = self.registry.labels(id)?;
        let prediction = labels
            .get(class_id)
            .ok_or(ClassifyError::ClassMapping {
                index: class_id,
                num_classes: labels.len(),
            })?
            .clone();

        Ok(ClassificationResult {
            prediction,
            confidence: round2(probability as f64 * 100.0),
            class_id,
            inference_time_ms: round2(inference_time.as_secs_f64() * 1000.0),
            total_time_ms: round2(started.elapsed().as_secs_f64() * 1000.0),
        })
    }
}

/// Decode an image file into the model's input tensor: fixed 32x32
/// resolution, forced 3-channel RGB (alpha dropped, grayscale broadcast),
/// per-channel normalization, NCHW layout.
fn preprocess(image_path: &Path) -> Result<Array4<f32>, ClassifyError> {
    let img = image::ImageReader::open(image_path)
        .map_err(|e| ClassifyError::Image(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| ClassifyError::Image(e.to_string()))?
        .decode()
        .map_err(|e| ClassifyError::Image(e.to_string()))?;

    let img = img.resize_exact(TARGET_SIZE, TARGET_SIZE, FilterType::CatmullRom);

    let size = TARGET_SIZE as usize;
    let mut input = Array4::<f32>::zeros((1, 3, size, size));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        for (channel, value) in [r, g, b].into_iter().enumerate() {
            input[[0, channel, y, x]] =
                ((value as f32) / 255.0 - MEAN[channel]) / STD[channel];
        }
    }

    Ok(input)
}

/// Normalized exponential over raw scores, shifted by the max for numeric
/// stability.
fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return exps;
    }
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .reduce(|best, current| if current.1 > best.1 { current } else { best })
}
