use crate::{
    config::{BatchMetric, ModelsConfig},
    labels::load_class_labels,
    model_backend::{BackendError, Device, ModelBackend},
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt, fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use thiserror::Error;

/// The fixed set of selectable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    Heavy,
    Light,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Heavy => "heavy",
            ModelId::Light => "light",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::Heavy => "Heavy",
            ModelId::Light => "Light",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ModelId {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "heavy" => Ok(Self::Heavy),
            "light" => Ok(Self::Light),
            other => Err(format!(
                "{} is not a supported model. Use either `heavy` or `light`.",
                other
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model file not found for '{0}'")]
    NotFound(ModelId),
    #[error("failed to load model '{model}': {source}")]
    Load {
        model: ModelId,
        source: BackendError,
    },
    #[error("'{0}' is not in the model catalog")]
    Unknown(ModelId),
}

/// Availability and benchmark metadata for one model, as reported by the
/// status endpoint. Gathering it never forces a load.
#[derive(Debug, Serialize, PartialEq)]
pub struct ModelInfo {
    pub exists: bool,
    pub loaded: bool,
    pub name: String,
    pub size_mb: Option<f64>,
    pub batch_metrics: Vec<BatchMetric>,
    pub cifar10_accuracy: f64,
}

struct ModelEntry<M> {
    path: PathBuf,
    labels: Arc<Vec<String>>,
    batch_metrics: Vec<BatchMetric>,
    cifar10_accuracy: f64,
    state: RwLock<Option<Arc<M>>>,
    load_lock: Mutex<()>,
    load_count: AtomicUsize,
}

/// Process-wide model cache. Each id maps to at most one loaded model
/// instance for the life of the process; first-time loads of the same id
/// serialize on a per-entry lock while cached reads stay lock-free apart
/// from the read guard.
pub struct ModelRegistry<B: ModelBackend> {
    backend: B,
    entries: HashMap<ModelId, ModelEntry<B::Model>>,
}

impl<B: ModelBackend> ModelRegistry<B> {
    pub fn new(backend: B, config: &ModelsConfig) -> anyhow::Result<Self> {
        let mut entries = HashMap::new();
        for (id, spec) in &config.catalog {
            let labels_path = config.labels_path(spec);
            let labels = load_class_labels(&labels_path)?;
            tracing::info!(model = %id, classes = labels.len(), "registered model");

            entries.insert(
                *id,
                ModelEntry {
                    path: config.model_path(spec),
                    labels: Arc::new(labels),
                    batch_metrics: spec.batch_metrics.clone(),
                    cifar10_accuracy: spec.cifar10_accuracy,
                    state: RwLock::new(None),
                    load_lock: Mutex::new(()),
                    load_count: AtomicUsize::new(0),
                },
            );
        }

        Ok(Self { backend, entries })
    }

    fn entry(&self, id: ModelId) -> Result<&ModelEntry<B::Model>, RegistryError> {
        self.entries.get(&id).ok_or(RegistryError::Unknown(id))
    }

    /// Idempotent load: the first call for an id deserializes from disk,
    /// subsequent calls return the cached handle.
    pub fn load(&self, id: ModelId) -> Result<Arc<B::Model>, RegistryError> {
        let entry = self.entry(id)?;

        if let Some(model) = entry.state.read().as_ref() {
            return Ok(model.clone());
        }

        let _guard = entry.load_lock.lock();
        // Another request may have finished loading while we waited.
        if let Some(model) = entry.state.read().as_ref() {
            return Ok(model.clone());
        }

        if !entry.path.exists() {
            return Err(RegistryError::NotFound(id));
        }

        tracing::info!(model = %id, path = ?entry.path, "loading model from disk");
        let model = self
            .backend
            .load(&entry.path)
            .map_err(|source| RegistryError::Load { model: id, source })?;
        entry.load_count.fetch_add(1, Ordering::SeqCst);

        let model = Arc::new(model);
        *entry.state.write() = Some(model.clone());
        Ok(model)
    }

    pub fn labels(&self, id: ModelId) -> Result<Arc<Vec<String>>, RegistryError> {
        Ok(self.entry(id)?.labels.clone())
    }

    pub fn info(&self, id: ModelId) -> Result<ModelInfo, RegistryError> {
        let entry = self.entry(id)?;
        let size_mb = fs::metadata(&entry.path)
            .ok()
            .map(|meta| round2(meta.len() as f64 / (1024.0 * 1024.0)));

        Ok(ModelInfo {
            exists: entry.path.exists(),
            loaded: entry.state.read().is_some(),
            name: id.display_name().to_string(),
            size_mb,
            batch_metrics: entry.batch_metrics.clone(),
            cifar10_accuracy: entry.cifar10_accuracy,
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.entries.keys().copied()
    }

    pub fn device(&self) -> Device {
        self.backend.device()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn load_count(&self, id: ModelId) -> usize {
        self.entries[&id].load_count.load(Ordering::SeqCst)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSpec;
    use ndarray::Array4;
    use std::io::Write;
    use std::path::Path;

    struct CountingBackend {
        loads: AtomicUsize,
    }

    impl ModelBackend for CountingBackend {
        type Model = ();

        fn load(&self, _path: &Path) -> Result<(), BackendError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn run(&self, _model: &(), _input: &Array4<f32>) -> Result<Vec<f32>, BackendError> {
            Ok(vec![0.0; 10])
        }

        fn device(&self) -> Device {
            Device::Cpu
        }
    }

    fn test_config(dir: &Path) -> ModelsConfig {
        let labels_path = dir.join("labels.txt");
        let mut file = std::fs::File::create(&labels_path).unwrap();
        writeln!(file, "airplane\nautomobile\nbird\ncat\ndeer").unwrap();

        let spec = |file: &str| ModelSpec {
            file: file.to_string(),
            labels_file: None,
            cifar10_accuracy: 90.0,
            batch_metrics: vec![BatchMetric {
                batch_size: 1,
                inference_time: 2.0,
                throughput: 500.0,
            }],
        };

        ModelsConfig {
            model_dir: dir.to_path_buf(),
            labels_file: labels_path,
            catalog: HashMap::from([(ModelId::Heavy, spec("heavy.onnx")), (ModelId::Light, spec("light.onnx"))]),
        }
    }

    fn registry_in(dir: &Path) -> ModelRegistry<CountingBackend> {
        let backend = CountingBackend {
            loads: AtomicUsize::new(0),
        };
        ModelRegistry::new(backend, &test_config(dir)).unwrap()
    }

    #[test]
    fn load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("light.onnx"), b"weights").unwrap();
        let registry = registry_in(dir.path());

        let first = registry.load(ModelId::Light).unwrap();
        let second = registry.load(ModelId::Light).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.load_count(ModelId::Light), 1);
    }

    #[test]
    fn load_fails_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(dir.path());

        assert!(matches!(
            registry.load(ModelId::Heavy),
            Err(RegistryError::NotFound(ModelId::Heavy))
        ));
        assert_eq!(registry.load_count(ModelId::Heavy), 0);
    }

    #[test]
    fn info_reports_presence_and_load_state() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("light.onnx"), vec![0u8; 2048]).unwrap();
        let registry = registry_in(dir.path());

        let missing = registry.info(ModelId::Heavy).unwrap();
        assert!(!missing.exists);
        assert!(!missing.loaded);
        assert_eq!(missing.size_mb, None);
        assert_eq!(missing.name, "Heavy");

        let present = registry.info(ModelId::Light).unwrap();
        assert!(present.exists);
        assert!(!present.loaded);
        assert!(present.size_mb.is_some());

        registry.load(ModelId::Light).unwrap();
        assert!(registry.info(ModelId::Light).unwrap().loaded);
    }

    #[test]
    fn model_id_parsing() {
        assert_eq!(ModelId::try_from("HEAVY").unwrap(), ModelId::Heavy);
        assert_eq!(ModelId::try_from("light").unwrap(), ModelId::Light);
        assert!(ModelId::try_from("nonexistent").is_err());
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(99.999), 100.0);
    }
}
