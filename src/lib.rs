pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

use clap::Parser;

use crate::domain::error::Result;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::logging::init_tracing;
use crate::interfaces::cli::{execute, Cli};

pub use crate::application::{
    CloudBatchController, CropOcrController, CsvExport, QuickProcessController,
    SlipUploadController, SubmitOutcome, TabularExportEngine,
};
pub use crate::domain::csv::{CsvDocument, ExportConfig, ExportMode};
pub use crate::domain::error::AppError;
pub use crate::domain::extraction::{ExtractionResult, Record};
pub use crate::infrastructure::download::{DirectoryDownloads, DownloadSink};

pub fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ConfigService::load_from(path)?,
        None => ConfigService::load()?,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(cli, config))
}
