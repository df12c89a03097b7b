//! Sorts a folder of retina images into one subfolder per predicted class.
use clap::Parser;
use dr_sort::cli::{self, ServiceArgs};
use dr_sort::commands::classify::classify_images;
use dr_sort::config::{ClassifyConfig, DEFAULT_OUTPUT_DIR, DEFAULT_SOURCE_DIR};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "classify-images")]
#[command(about = "Classify images through the prediction service and sort them into class folders", long_about = None)]
struct Cli {
    /// Folder scanned recursively for images
    #[arg(long, env = "DR_SORT_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
    source_dir: PathBuf,

    /// Folder that is wiped and refilled with one subfolder per class
    #[arg(long, env = "DR_SORT_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[command(flatten)]
    service: ServiceArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();
    cli::init_logging();

    let service = match cli::connect_service(&args.service).await {
        Ok(service) => service,
        Err(e) => {
            log::error!("Prediction service unavailable: {}", e);
            return;
        }
    };

    let config = ClassifyConfig {
        source_dir: args.source_dir,
        output_dir: args.output_dir,
    };

    if let Err(e) = classify_images(&config, service.as_ref()).await {
        log::error!("Classification aborted: {}", e);
    }
}
