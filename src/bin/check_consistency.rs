//! Spot-checks that fresh predictions agree with already-sorted images.
use clap::Parser;
use dr_sort::cli::{self, ServiceArgs};
use dr_sort::commands::consistency::{check_consistency, default_cases};
use dr_sort::config::{DEFAULT_IMAGE_SIZE, DEFAULT_OUTPUT_DIR};
use dr_sort::models::check_types::TestCase;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "check-consistency")]
#[command(about = "Check that predictions match the folders images were sorted into", long_about = None)]
struct Cli {
    /// Folder holding the previously classified images
    #[arg(long, env = "DR_SORT_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Extra case as PATH=LABEL (repeatable)
    #[arg(long = "case", value_parser = TestCase::parse)]
    cases: Vec<TestCase>,

    /// Square edge images are resized to before inspection
    #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    image_size: u32,

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

    let mut cases = default_cases(&args.output_dir);
    cases.extend(args.cases);

    check_consistency(&cases, service.as_ref(), args.image_size).await;
}
