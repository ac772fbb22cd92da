use ndarray::Array4;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("model deserialization failed: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// The compute device the inference engine is bound to, chosen once at
/// startup by capability probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Seam between the registry/classifier and the inference engine. The
/// production implementation wraps ONNX Runtime; tests substitute a mock.
pub trait ModelBackend: Send + Sync + 'static {
    type Model: Send + Sync + 'static;

    /// Deserialize a model from disk. Called at most once per model id by
    /// the registry.
    fn load(&self, path: &Path) -> Result<Self::Model, BackendError>;

    /// Run a forward pass over a single NCHW input, returning the raw
    /// per-class scores.
    fn run(&self, model: &Self::Model, input: &Array4<f32>) -> Result<Vec<f32>, BackendError>;

    fn device(&self) -> Device;
}
