use crate::model_backend::{BackendError, Device, ModelBackend};
use ndarray::Array4;
use ort::{
    execution_providers::{CUDAExecutionProvider, ExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::path::Path;

/// ONNX Runtime backend. Holds no sessions itself; the registry owns one
/// `OrtModel` per model id.
pub struct OrtBackend {
    device: Device,
}

pub struct OrtModel {
    // Session::run needs &mut, so concurrent requests against the same
    // model serialize here.
    session: Mutex<Session>,
    output_name: String,
}

impl OrtBackend {
    pub fn new() -> Result<Self, BackendError> {
        let cuda = CUDAExecutionProvider::default();
        let device = match cuda.is_available() {
            Ok(true) => Device::Cuda,
            _ => Device::Cpu,
        };

        let init = match device {
            Device::Cuda => ort::init().with_execution_providers([cuda.build()]),
            Device::Cpu => ort::init(),
        };
        init.commit()
            .map_err(|e| BackendError::Load(format!("failed to initialize onnx runtime: {}", e)))?;

        tracing::info!(device = %device, "ONNX runtime initialized");
        Ok(Self { device })
    }
}

impl ModelBackend for OrtBackend {
    type Model = OrtModel;

    fn load(&self, path: &Path) -> Result<OrtModel, BackendError> {
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| BackendError::Load(e.to_string()))?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| BackendError::Load("model has no outputs".to_string()))?;

        Ok(OrtModel {
            session: Mutex::new(session),
            output_name,
        })
    }

    fn run(&self, model: &OrtModel, input: &Array4<f32>) -> Result<Vec<f32>, BackendError> {
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| BackendError::Inference(format!("failed to build tensor: {}", e)))?;
        let input_tensor = ort::inputs![tensor_ref];

        let mut session = model.session.lock();
        let outputs = session
            .run(input_tensor)
            .map_err(|e| BackendError::Inference(e.to_string()))?;

        let (_shape, data) = outputs[model.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| BackendError::Inference(format!("failed to extract tensor: {}", e)))?;

        Ok(data.to_vec())
    }

    fn device(&self) -> Device {
        self.device
    }
}
