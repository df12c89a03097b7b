use std::path::PathBuf;

pub const DEFAULT_SOURCE_DIR: &str = "colored_images";
pub const DEFAULT_OUTPUT_DIR: &str = "classified_images";
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000/api";

/// Square edge the consistency checker resizes to before inspecting an image.
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Where the batch classifier reads from and writes to.
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}
