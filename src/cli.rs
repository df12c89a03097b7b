//! Pieces shared by the `classify-images` and `check-consistency` binaries.

use crate::config::DEFAULT_SERVICE_URL;
use crate::error::AppError;
use crate::services::classifier::http_service::HttpPredictionService;
use crate::services::classifier::PredictionService;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Which prediction backend to talk to.
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    /// Base URL of the prediction service
    #[arg(long, env = "DR_SORT_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// Run this ONNX model locally instead of calling the service
    #[arg(long, env = "DR_SORT_MODEL", requires = "model_config")]
    pub model: Option<PathBuf>,

    /// Model config JSON holding the `id2label` map
    #[arg(long, env = "DR_SORT_MODEL_CONFIG", requires = "model")]
    pub model_config: Option<PathBuf>,
}

/// Timestamped `log` output on stdout, `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();
}

pub async fn connect_service(args: &ServiceArgs) -> Result<Box<dyn PredictionService>, AppError> {
    if let (Some(model), Some(config)) = (&args.model, &args.model_config) {
        return load_local_model(model, config);
    }

    log::info!("Connecting to prediction service at {}", args.service_url);
    let service = HttpPredictionService::connect(&args.service_url).await?;
    Ok(Box::new(service))
}

#[cfg(feature = "onnx")]
fn load_local_model(
    model: &std::path::Path,
    config: &std::path::Path,
) -> Result<Box<dyn PredictionService>, AppError> {
    use crate::config::DEFAULT_IMAGE_SIZE;
    use crate::services::classifier::model_manager::OnnxPredictionService;

    let service = OnnxPredictionService::load(model, config, DEFAULT_IMAGE_SIZE)?;
    Ok(Box::new(service))
}

#[cfg(not(feature = "onnx"))]
fn load_local_model(
    model: &std::path::Path,
    _config: &std::path::Path,
) -> Result<Box<dyn PredictionService>, AppError> {
    Err(format!(
        "Cannot run {} locally: built without the `onnx` feature",
        model.display()
    )
    .into())
}
