use crate::models::check_types::{CaseOutcome, CheckReport, TestCase};
use crate::services::classifier::inference;
use crate::services::classifier::{request_prediction, PredictionService};
use log::{debug, error, info, warn};
use std::path::Path;

/// Images that were sorted by hand and the folder they belong in.
pub fn default_cases(output_dir: &Path) -> Vec<TestCase> {
    [
        ("Mild/0773a1c326ad.png", "Mild"),
        ("No_DR/0151781fe50b.png", "No_DR"),
        ("Moderate/000c1434d8d7.png", "Moderate"),
    ]
    .iter()
    .map(|(rel, label)| TestCase::new(output_dir.join(rel), *label))
    .collect()
}

/// Re-predicts each case and compares the label with the expected folder.
///
/// Every case runs regardless of how earlier ones went.
pub async fn check_consistency(
    cases: &[TestCase],
    service: &dyn PredictionService,
    image_size: u32,
) -> CheckReport {
    info!("Testing prediction consistency...");
    info!("{}", "=".repeat(50));

    let mut report = CheckReport::default();

    for case in cases {
        let outcome = check_case(case, service, image_size).await;
        report.results.push((case.clone(), outcome));
    }

    info!("{}", "=".repeat(50));
    info!(
        "Test complete! {} passed, {} mismatched, {} failed, {} not found",
        report.passed(),
        report.mismatched(),
        report.failed(),
        report.not_found()
    );

    report
}

async fn check_case(case: &TestCase, service: &dyn PredictionService, image_size: u32) -> CaseOutcome {
    if !case.path.is_file() {
        warn!("Image not found: {}", case.path.display());
        return CaseOutcome::NotFound;
    }

    let folder_name = case
        .path
        .parent()
        .and_then(|p| p.file_name())
        .unwrap_or_default()
        .to_string_lossy();
    let file_name = case.path.file_name().unwrap_or_default().to_string_lossy();
    info!("");
    info!("Testing image from: {}", folder_name);
    info!("Image: {}", file_name);

    match inference::preprocess_image(&case.path, image_size) {
        Ok(tensor) => debug!("Preprocessed {} to {:?}", case.path.display(), tensor.shape()),
        Err(e) => {
            error!("Failed to preprocess image: {}", e);
            return CaseOutcome::Failed { reason: e.message };
        }
    }

    // Any label the service names is compared, even one outside its label set.
    let prediction = match request_prediction(service, &case.path).await {
        Ok(prediction) => prediction,
        Err(e) => {
            error!("Prediction failed: {}", e);
            return CaseOutcome::Failed { reason: e.message };
        }
    };

    info!("Predicted: {}", prediction.class_name);
    info!("Confidence: {:.2}%", prediction.confidence * 100.0);

    if prediction.class_name == case.expected {
        info!("PASS: prediction matches folder classification");
        CaseOutcome::Match {
            confidence: prediction.confidence,
        }
    } else {
        error!(
            "MISMATCH! Folder: {}, Predicted: {}",
            case.expected, prediction.class_name
        );
        CaseOutcome::Mismatch {
            predicted: prediction.class_name,
            confidence: prediction.confidence,
        }
    }
}
