pub mod http_service;
pub mod inference;
#[cfg(feature = "onnx")]
pub mod model_manager;

use crate::error::AppError;
use crate::models::classify_types::{Prediction, ServiceResponse};
use async_trait::async_trait;
use std::path::Path;

/// Something that turns image bytes into a class label.
///
/// Implementations never fail at the call level: transport or model errors
/// come back as a response with `success: false`.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Labels this service can produce, in its own order.
    fn class_labels(&self) -> &[String];

    async fn process_image(&self, image: &[u8]) -> ServiceResponse;
}

/// Reads `path` and asks `service` about it, without checking the label set.
pub async fn request_prediction(
    service: &dyn PredictionService,
    path: &Path,
) -> Result<Prediction, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| AppError {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    service.process_image(&bytes).await.into_prediction()
}

/// Like [`request_prediction`], but a label outside the service's own set is an error.
pub async fn predict_image(
    service: &dyn PredictionService,
    path: &Path,
) -> Result<Prediction, AppError> {
    let prediction = request_prediction(service, path).await?;

    if !service
        .class_labels()
        .iter()
        .any(|label| *label == prediction.class_name)
    {
        return Err(format!("Service returned unknown class '{}'", prediction.class_name).into());
    }

    Ok(prediction)
}
