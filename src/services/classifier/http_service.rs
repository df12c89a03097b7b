use crate::error::AppError;
use crate::models::classify_types::ServiceResponse;
use crate::services::classifier::PredictionService;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelsResponse {
    Plain(Vec<String>),
    Wrapped { class_labels: Vec<String> },
}

impl LabelsResponse {
    fn into_labels(self) -> Vec<String> {
        match self {
            LabelsResponse::Plain(labels) => labels,
            LabelsResponse::Wrapped { class_labels } => class_labels,
        }
    }
}

/// Prediction service reached over HTTP.
///
/// `GET {base}/labels` lists the classes, `POST {base}/predict` takes a
/// multipart `image` field and answers with a [`ServiceResponse`].
pub struct HttpPredictionService {
    client: reqwest::Client,
    base_url: String,
    labels: Vec<String>,
}

impl HttpPredictionService {
    /// Fetches the label set up front; the service is unusable without it.
    pub async fn connect(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();

        let url = format!("{}/labels", base_url);
        let response = client.get(&url).send().await.map_err(|e| AppError {
            message: format!("Failed to reach prediction service at {}: {}", url, e),
        })?;

        if !response.status().is_success() {
            return Err(format!(
                "Failed to fetch class labels from {}: HTTP {}",
                url,
                response.status()
            )
            .into());
        }

        let labels = response
            .json::<LabelsResponse>()
            .await
            .map_err(|e| AppError {
                message: format!("Failed to parse class labels from {}: {}", url, e),
            })?
            .into_labels();

        if labels.is_empty() {
            return Err(format!("Prediction service at {} reported no class labels", base_url).into());
        }

        Ok(Self {
            client,
            base_url,
            labels,
        })
    }

    async fn post_image(&self, image: &[u8]) -> Result<ServiceResponse, AppError> {
        let part = Part::bytes(image.to_vec()).file_name("image");
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .multipart(form)
            .send()
            .await?;

        // Error statuses usually still carry a {success: false, error} body.
        let status = response.status();
        let body = response.bytes().await?;

        serde_json::from_slice::<ServiceResponse>(&body).map_err(|_| AppError {
            message: format!("Prediction service answered HTTP {} without a prediction record", status),
        })
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    fn class_labels(&self) -> &[String] {
        &self.labels
    }

    async fn process_image(&self, image: &[u8]) -> ServiceResponse {
        match self.post_image(image).await {
            Ok(response) => response,
            Err(e) => ServiceResponse::failed(e.message),
        }
    }
}
