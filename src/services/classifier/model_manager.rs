use crate::error::AppError;
use crate::models::classify_types::ServiceResponse;
use crate::services::classifier::inference;
use crate::services::classifier::PredictionService;
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

/// Runs an exported ONNX classifier in-process instead of calling a remote service.
///
/// Labels come from the `id2label` map of the model's config JSON.
pub struct OnnxPredictionService {
    session: Mutex<Session>,
    labels: Vec<String>,
    image_size: u32,
}

impl OnnxPredictionService {
    pub fn load(model_path: &Path, config_path: &Path, image_size: u32) -> Result<Self, AppError> {
        let config_content = std::fs::read_to_string(config_path).map_err(|e| AppError {
            message: format!("Failed to read config file {}: {}", config_path.display(), e),
        })?;
        let labels = parse_labels(&config_content)?;

        let _ = ort::init().with_name("dr-sort").commit();

        let session = Session::builder()
            .map_err(|e| AppError { message: format!("Failed to create session builder: {}", e) })?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| AppError { message: format!("Failed to set optimization level: {}", e) })?
            .commit_from_file(model_path)
            .map_err(|e| AppError {
                message: format!("Failed to load ONNX model {}: {}", model_path.display(), e),
            })?;

        log::info!("Loaded ONNX model {} with {} classes", model_path.display(), labels.len());

        Ok(Self {
            session: Mutex::new(session),
            labels,
            image_size,
        })
    }

    fn run(&self, image: &[u8]) -> Result<ServiceResponse, AppError> {
        let tensor = inference::preprocess_bytes(image, self.image_size)?;

        let scores: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| AppError::from("Model session lock poisoned"))?;

            let input_name = first_or_err(session.inputs(), "inputs")?.name().to_string();
            let input_tensor = Value::from_array(tensor)
                .map_err(|e| AppError { message: format!("Failed to create tensor value: {}", e) })?;

            let outputs = session
                .run(ort::inputs![input_name.as_str() => input_tensor])
                .map_err(|e| AppError { message: format!("Inference failed: {}", e) })?;

            let output_value = outputs
                .values()
                .next()
                .ok_or_else(|| AppError::from("Model produced no outputs"))?;

            let (_, data) = output_value
                .try_extract_tensor::<f32>()
                .map_err(|e| AppError { message: format!("Failed to extract output tensor: {}", e) })?;
            data.to_vec()
        };

        let probabilities = inference::to_probabilities(&scores);
        let prediction = inference::top_prediction(&probabilities, &self.labels)?;

        Ok(ServiceResponse::predicted(
            prediction.class_name,
            prediction.confidence * 100.0,
        ))
    }
}

#[async_trait]
impl PredictionService for OnnxPredictionService {
    fn class_labels(&self) -> &[String] {
        &self.labels
    }

    async fn process_image(&self, image: &[u8]) -> ServiceResponse {
        match self.run(image) {
            Ok(response) => response,
            Err(e) => ServiceResponse::failed(e.message),
        }
    }
}

fn first_or_err<'a, T>(items: &'a [T], what: &str) -> Result<&'a T, AppError> {
    items.first().ok_or_else(|| AppError {
        message: format!("Model declares no {}", what),
    })
}

fn parse_labels(config_content: &str) -> Result<Vec<String>, AppError> {
    let config: serde_json::Value = serde_json::from_str(config_content).map_err(|e| AppError {
        message: format!("Failed to parse config JSON: {}", e),
    })?;

    let id2label = config["id2label"].as_object().ok_or_else(|| AppError {
        message: "Config missing id2label field".to_string(),
    })?;

    let mut labels = Vec::with_capacity(id2label.len());
    for (k, v) in id2label {
        let idx = k.parse::<usize>().map_err(|_| AppError {
            message: format!("Invalid class id in id2label: {}", k),
        })?;
        let label = v.as_str().ok_or_else(|| AppError {
            message: format!("Label for class {} is not a string", k),
        })?;
        labels.push((idx, label.to_string()));
    }
    labels.sort_by_key(|(idx, _)| *idx);

    if labels.is_empty() {
        return Err("Config id2label is empty".into());
    }

    // Output index i is class i, so ids must be exactly 0..n.
    if let Some((pos, (idx, _))) = labels.iter().enumerate().find(|(pos, (idx, _))| pos != idx) {
        return Err(format!(
            "Config id2label ids must run 0..{} without gaps, found id {} at position {}",
            labels.len(),
            idx,
            pos
        )
        .into());
    }

    Ok(labels.into_iter().map(|(_, label)| label).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_numeric_ids() {
        let labels = parse_labels(
            r#"{"id2label": {"3": "Severe", "2": "Moderate", "0": "No_DR", "1": "Mild", "10": "Proliferate_DR", "4": "x", "5": "x", "6": "x", "7": "x", "8": "x", "9": "x"}}"#,
        )
        .unwrap();
        assert_eq!(&labels[..4], ["No_DR", "Mild", "Moderate", "Severe"]);
        assert_eq!(labels[10], "Proliferate_DR");
    }

    #[test]
    fn sparse_ids_are_rejected() {
        let err = parse_labels(
            r#"{"id2label": {"10": "Severe", "2": "Moderate", "0": "No_DR", "1": "Mild"}}"#,
        )
        .unwrap_err();
        assert!(err.message.contains("id 10"));

        assert!(parse_labels(r#"{"id2label": {"1": "Mild"}}"#).is_err());
        assert!(parse_labels(r#"{"id2label": {"0": "No_DR", "0 ": "Mild"}}"#).is_err());
    }

    #[test]
    fn model_without_inputs_is_an_error() {
        let none: [&str; 0] = [];
        let err = first_or_err(&none, "inputs").unwrap_err();
        assert_eq!(err.message, "Model declares no inputs");
        assert_eq!(first_or_err(&["pixel_values"], "inputs").unwrap(), &"pixel_values");
    }

    #[test]
    fn config_without_labels_is_rejected() {
        assert!(parse_labels(r#"{"architectures": []}"#).is_err());
        assert!(parse_labels(r#"{"id2label": {"x": "Mild"}}"#).is_err());
        assert!(parse_labels(r#"{"id2label": {}}"#).is_err());
    }
}
