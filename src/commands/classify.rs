use crate::config::ClassifyConfig;
use crate::error::AppError;
use crate::models::classify_types::{
    ClassificationTally, ClassifyOutcome, ClassifySummary, FailedImage,
};
use crate::services::classifier::{predict_image, PredictionService};
use crate::services::fs_service;
use log::{error, info, warn};
use std::path::Path;

/// Sorts every image under `config.source_dir` into `config.output_dir/<label>/`.
///
/// A missing source directory or an empty image set ends the run before the
/// output directory is touched. Per-image failures are logged and skipped.
pub async fn classify_images(
    config: &ClassifyConfig,
    service: &dyn PredictionService,
) -> Result<ClassifyOutcome, AppError> {
    info!("Starting image classification...");
    info!("{}", "=".repeat(50));

    if !config.source_dir.is_dir() {
        error!("Source directory not found: {}", config.source_dir.display());
        info!(
            "Please add some images to {} and run again",
            config.source_dir.display()
        );
        return Ok(ClassifyOutcome::SourceMissing(config.source_dir.clone()));
    }

    let image_files = fs_service::find_image_files(&config.source_dir)?;
    if image_files.is_empty() {
        warn!("No image files found in {}", config.source_dir.display());
        info!(
            "Please add some images to {} and run again",
            config.source_dir.display()
        );
        return Ok(ClassifyOutcome::NoImages(config.source_dir.clone()));
    }

    info!("Found {} images to classify", image_files.len());

    let labels = service.class_labels();
    fs_service::prepare_output_dir(&config.output_dir, labels)?;
    info!("Created output directory: {}", config.output_dir.display());
    info!("Class labels: {:?}", labels);

    let mut tally = ClassificationTally::new(labels);
    let mut failures = Vec::new();

    for img_path in &image_files {
        let file_name = img_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        info!("Processing: {}", file_name);

        match classify_one(service, img_path, &config.output_dir, &mut tally).await {
            Ok((class_name, confidence)) => {
                info!(
                    "  Classified as: {} (confidence: {:.2}%)",
                    class_name,
                    confidence * 100.0
                );
            }
            Err(e) => {
                error!("Prediction failed for {}: {}", img_path.display(), e);
                warn!("  Failed to classify {}", file_name);
                failures.push(FailedImage {
                    file_path: img_path.clone(),
                    message: e.message,
                });
            }
        }
    }

    let summary = ClassifySummary {
        discovered: image_files.len(),
        processed: tally.total(),
        tally,
        failures,
        output_dir: config.output_dir.clone(),
    };
    log_summary(&summary);

    Ok(ClassifyOutcome::Completed(summary))
}

async fn classify_one(
    service: &dyn PredictionService,
    img_path: &Path,
    output_dir: &Path,
    tally: &mut ClassificationTally,
) -> Result<(String, f32), AppError> {
    // Only known labels get past predict_image, so the class folder exists.
    let prediction = predict_image(service, img_path).await?;

    let file_name = img_path
        .file_name()
        .ok_or_else(|| AppError::from("Image path has no file name"))?;
    let dest_path = output_dir.join(&prediction.class_name).join(file_name);
    fs_service::copy_preserving_metadata(img_path, &dest_path)?;

    tally.increment(&prediction.class_name);
    Ok((prediction.class_name, prediction.confidence))
}

fn log_summary(summary: &ClassifySummary) {
    info!("");
    info!("Classification complete!");
    info!(
        "Total images processed: {} of {}",
        summary.processed, summary.discovered
    );
    info!("Results:");
    for (class_name, count) in summary.tally.iter() {
        info!("  {}: {} images", class_name, count);
    }
    if !summary.failures.is_empty() {
        warn!("{} images could not be classified", summary.failures.len());
    }
    info!("Classified images saved to: {}", summary.output_dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classify_types::ServiceResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    struct FakeService {
        labels: Vec<String>,
        answers: HashMap<Vec<u8>, ServiceResponse>,
    }

    #[async_trait]
    impl PredictionService for FakeService {
        fn class_labels(&self) -> &[String] {
            &self.labels
        }

        async fn process_image(&self, image: &[u8]) -> ServiceResponse {
            self.answers
                .get(image)
                .cloned()
                .unwrap_or_else(|| ServiceResponse::failed("unrecognised image"))
        }
    }

    fn service(answers: &[(&[u8], ServiceResponse)]) -> FakeService {
        FakeService {
            labels: ["No_DR", "Mild", "Moderate", "Severe", "Proliferate_DR"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            answers: answers
                .iter()
                .map(|(bytes, response)| (bytes.to_vec(), response.clone()))
                .collect(),
        }
    }

    fn config(root: &Path) -> ClassifyConfig {
        ClassifyConfig {
            source_dir: root.join("colored_images"),
            output_dir: root.join("classified_images"),
        }
    }

    fn completed(outcome: ClassifyOutcome) -> ClassifySummary {
        match outcome {
            ClassifyOutcome::Completed(summary) => summary,
            other => panic!("expected a completed run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_source_leaves_output_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(cfg.output_dir.join("Mild")).unwrap();
        fs::write(cfg.output_dir.join("Mild/previous.png"), b"prev").unwrap();

        let outcome = classify_images(&cfg, &service(&[])).await.unwrap();

        assert!(matches!(outcome, ClassifyOutcome::SourceMissing(_)));
        assert!(cfg.output_dir.join("Mild/previous.png").exists());
    }

    #[tokio::test]
    async fn missing_source_does_not_create_output() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());

        classify_images(&cfg, &service(&[])).await.unwrap();

        assert!(!cfg.output_dir.exists());
    }

    #[tokio::test]
    async fn source_without_images_stops_early() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(&cfg.source_dir).unwrap();
        fs::write(cfg.source_dir.join("readme.txt"), b"no images here").unwrap();

        let outcome = classify_images(&cfg, &service(&[])).await.unwrap();

        assert!(matches!(outcome, ClassifyOutcome::NoImages(_)));
        assert!(!cfg.output_dir.exists());
    }

    #[tokio::test]
    async fn failed_predictions_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(cfg.source_dir.join("batch")).unwrap();
        fs::write(cfg.source_dir.join("good.png"), b"good").unwrap();
        fs::write(cfg.source_dir.join("batch/bad.jpg"), b"bad").unwrap();
        fs::write(cfg.source_dir.join("odd.tif"), b"odd").unwrap();

        let svc = service(&[
            (&b"good"[..], ServiceResponse::predicted("Severe", 64.0)),
            (&b"bad"[..], ServiceResponse::failed("corrupt upload")),
            (&b"odd"[..], ServiceResponse::predicted("Glaucoma", 90.0)),
        ]);
        let summary = completed(classify_images(&cfg, &svc).await.unwrap());

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.tally.get("Severe"), Some(1));
        assert_eq!(summary.tally.total(), 1);
        assert!(cfg.output_dir.join("Severe/good.png").exists());
        assert!(!cfg.output_dir.join("Glaucoma").exists());

        let failed: Vec<PathBuf> = summary.failures.iter().map(|f| f.file_path.clone()).collect();
        assert_eq!(
            failed,
            vec![cfg.source_dir.join("batch/bad.jpg"), cfg.source_dir.join("odd.tif")]
        );
        assert_eq!(summary.failures[0].message, "corrupt upload");
    }

    #[tokio::test]
    async fn every_label_gets_a_folder_even_when_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(&cfg.source_dir).unwrap();
        fs::write(cfg.source_dir.join("a.png"), b"a").unwrap();

        let svc = service(&[(&b"a"[..], ServiceResponse::predicted("Mild", 87.0))]);
        completed(classify_images(&cfg, &svc).await.unwrap());

        for label in svc.class_labels() {
            assert!(cfg.output_dir.join(label).is_dir(), "missing folder {}", label);
        }
    }
}
