mod classifier;
mod cleanup;
mod labels;
mod model_backend;
mod ort_backend;
mod registry;
mod routes;
mod sanitize;
mod server;
mod storage;
mod telemetry;
mod validation;

pub mod app;
pub mod config;

pub use app::start_app;
