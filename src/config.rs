use crate::registry::ModelId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub upload: UploadConfig,
    pub models: ModelsConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_max_age_seconds() -> u64 {
    3600
}

fn default_sweep_interval_seconds() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    pub model_dir: PathBuf,
    pub labels_file: PathBuf,
    pub catalog: HashMap<ModelId, ModelSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelSpec {
    pub file: String,
    /// Per-model class table override; falls back to the shared labels_file.
    #[serde(default)]
    pub labels_file: Option<PathBuf>,
    pub cifar10_accuracy: f64,
    pub batch_metrics: Vec<BatchMetric>,
}

/// Benchmarked inference numbers recorded offline, reported as static
/// metadata by the status endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BatchMetric {
    pub batch_size: u32,
    pub inference_time: f64,
    pub throughput: f64,
}

impl ModelsConfig {
    pub fn model_path(&self, spec: &ModelSpec) -> PathBuf {
        self.model_dir.join(&spec.file)
    }

    pub fn labels_path(&self, spec: &ModelSpec) -> PathBuf {
        spec.labels_file
            .clone()
            .unwrap_or_else(|| self.labels_file.clone())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.catalog.is_empty() {
            return Err("model catalog is empty".to_string());
        }
        for spec in self.catalog.values() {
            let labels_path = self.labels_path(spec);
            if !labels_path.exists() {
                return Err(format!("labels file not found: {:?}", labels_path));
            }
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config = config.try_deserialize::<Config>()?;
    if let Err(e) = config.models.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}
