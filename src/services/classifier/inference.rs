use crate::error::AppError;
use crate::models::classify_types::Prediction;
use image::{DynamicImage, ImageReader};
use ndarray::Array4;
use std::path::Path;

pub fn preprocess_image(path: &Path, size: u32) -> Result<Array4<f32>, AppError> {
    let img = ImageReader::open(path)
        .map_err(|e| AppError {
            message: format!("Failed to open image {}: {}", path.display(), e),
        })?
        .with_guessed_format()
        .map_err(|e| AppError {
            message: format!("Failed to read image {}: {}", path.display(), e),
        })?
        .decode()
        .map_err(|e| AppError {
            message: format!("Failed to decode image {}: {}", path.display(), e),
        })?;

    to_tensor(&img, size)
}

pub fn preprocess_bytes(bytes: &[u8], size: u32) -> Result<Array4<f32>, AppError> {
    let img = image::load_from_memory(bytes).map_err(|e| AppError {
        message: format!("Failed to decode image: {}", e),
    })?;
    to_tensor(&img, size)
}

/// Resizes to `size x size` RGB and scales to [0, 1], laid out as NHWC with a
/// batch of one.
pub fn to_tensor(img: &DynamicImage, size: u32) -> Result<Array4<f32>, AppError> {
    if size == 0 {
        return Err("Image size must be positive".into());
    }

    let rgb = img
        .resize_exact(size, size, image::imageops::FilterType::CatmullRom)
        .to_rgb8();

    let data: Vec<f32> = rgb
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect();

    let tensor = Array4::from_shape_vec((1, size as usize, size as usize, 3), data)?;
    Ok(tensor)
}

/// Leaves rows that already look like a probability distribution untouched.
pub fn to_probabilities(output: &[f32]) -> Vec<f32> {
    let sum: f32 = output.iter().sum();
    let is_distribution = output.iter().all(|&x| (0.0..=1.0).contains(&x)) && (sum - 1.0).abs() < 1e-3;
    if is_distribution {
        return output.to_vec();
    }

    let max_logit = output.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = output.iter().map(|&x| (x - max_logit).exp()).sum();
    output
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}

pub fn top_prediction(probabilities: &[f32], labels: &[String]) -> Result<Prediction, AppError> {
    let (idx, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| AppError::from("Model produced no scores"))?;

    let class_name = labels.get(idx).cloned().ok_or_else(|| AppError {
        message: format!("Model produced class index {} but only {} labels are known", idx, labels.len()),
    })?;

    Ok(Prediction {
        class_name,
        confidence: confidence.clamp(0.0, 1.0),
    })
}
