use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Prediction {
    pub class_name: String,
    /// Always within [0, 1].
    pub confidence: f32,
}

/// Record returned by a prediction service for one image.
///
/// `confidence` is on the service's 0-100 scale; [`ServiceResponse::into_prediction`]
/// converts it.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ServiceResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceResponse {
    pub fn predicted(class_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            success: true,
            prediction: Some(class_name.into()),
            confidence: Some(confidence),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            prediction: None,
            confidence: None,
            error: Some(error.into()),
        }
    }

    pub fn into_prediction(self) -> Result<Prediction, AppError> {
        if !self.success {
            return Err(self
                .error
                .unwrap_or_else(|| "Unknown error".to_string())
                .into());
        }

        let class_name = self
            .prediction
            .ok_or_else(|| AppError::from("Response is missing the predicted class"))?;
        let confidence = self
            .confidence
            .ok_or_else(|| AppError::from("Response is missing the confidence score"))?;

        if !confidence.is_finite() {
            return Err(format!("Invalid confidence score: {}", confidence).into());
        }

        Ok(Prediction {
            class_name,
            confidence: (confidence / 100.0).clamp(0.0, 1.0),
        })
    }
}

/// Per-label counts, kept in the label order the service reported.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ClassificationTally {
    counts: Vec<(String, usize)>,
}

impl ClassificationTally {
    pub fn new(labels: &[String]) -> Self {
        Self {
            counts: labels.iter().map(|label| (label.clone(), 0)).collect(),
        }
    }

    /// Returns false when `label` is not one of the known labels.
    pub fn increment(&mut self, label: &str) -> bool {
        match self.counts.iter_mut().find(|(known, _)| known == label) {
            Some((_, count)) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.counts.iter().any(|(known, _)| known == label)
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct FailedImage {
    pub file_path: PathBuf,
    pub message: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct ClassifySummary {
    pub discovered: usize,
    pub processed: usize,
    pub tally: ClassificationTally,
    pub failures: Vec<FailedImage>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub enum ClassifyOutcome {
    SourceMissing(PathBuf),
    NoImages(PathBuf),
    Completed(ClassifySummary),
}
