use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::{
    CloudBatchController, CropOcrController, QuickProcessController, SlipUploadController,
    SubmitOutcome, TabularExportEngine,
};
use crate::domain::csv::{ExportConfig, ExportMode, HeaderStrategy, Quoting, SchemaPolicy};
use crate::domain::error::{AppError, Result};
use crate::domain::extraction::ExtractionResult;
use crate::domain::ocr_api::{CropParams, SlipType};
use crate::domain::screen::{Hyperparameter, DEFAULT_IMAGE_COUNT};
use crate::infrastructure::backend::{HttpOcrBackend, OcrBackend};
use crate::infrastructure::config::{AppConfig, BackendConfig};
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::download::DirectoryDownloads;
use crate::infrastructure::logging::{new_log_buffer, snapshot, LogBuffer};
use crate::interfaces::mock_server::{MockBackend, MockBackendConfig};

#[derive(Parser, Debug)]
#[command(name = "ocrdesk")]
#[command(version, about = "Send slips to an OCR backend and export the results as CSV", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./ocrdesk.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use one backend base URL for every screen
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Directory receiving downloaded CSV files
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Print the diagnostic log after the command
    #[arg(long, global = true)]
    pub show_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file, crop it and run Tesseract and EasyOCR on the crops
    CropOcr {
        /// Image or PDF to process
        file: PathBuf,

        #[command(flatten)]
        crop: CropArgs,

        /// Maximum number of cropped images (1-20)
        #[arg(long, default_value_t = 10)]
        max_images: u8,

        /// Tesseract page segmentation mode (0-13)
        #[arg(long, default_value_t = 3)]
        psm: u8,

        /// Tesseract engine mode (0-3)
        #[arg(long, default_value_t = 3)]
        oem: u8,

        /// Run EasyOCR on the CPU
        #[arg(long)]
        no_gpu: bool,

        /// EasyOCR languages
        #[arg(long, value_delimiter = ',', default_value = "en")]
        languages: Vec<String>,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Extract fields from one or more slip images
    Slips {
        /// Slip images or PDFs
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// salary, balance or cash
        #[arg(short = 't', long, default_value = "salary slip")]
        slip_type: SlipType,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Extract label/value text from slips stored in the cloud folder
    Cloud {
        /// salary, balance or cash
        #[arg(short = 't', long, default_value = "salary slip")]
        slip_type: SlipType,

        /// Number of images to process (1-50)
        #[arg(short = 'n', long, default_value_t = DEFAULT_IMAGE_COUNT)]
        num_images: u8,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Send one file with crop percentages and print the raw answer
    Quick {
        file: PathBuf,

        #[arg(long, default_value_t = 0.02)]
        upper: f64,

        #[arg(long, default_value_t = 0.64)]
        lower: f64,
    },

    /// Convert a saved JSON extraction result to CSV
    Export {
        /// JSON file holding the extraction result
        input: PathBuf,

        /// object-rows, label-value-text or flat-mapping
        #[arg(short, long)]
        mode: ExportMode,

        /// File name inside the download directory
        #[arg(short, long, default_value = "export.csv")]
        output: String,

        /// necessary or never
        #[arg(long)]
        quoting: Option<Quoting>,

        /// lenient or strict
        #[arg(long)]
        schema_policy: Option<SchemaPolicy>,

        /// union or first-entry
        #[arg(long)]
        header_strategy: Option<HeaderStrategy>,

        /// Lead flat-mapping rows with an ImageName column
        #[arg(long)]
        image_name_column: bool,

        /// Unquoted cells and first-entry flat-mapping headers
        #[arg(long)]
        legacy: bool,

        /// Print the CSV instead of downloading it
        #[arg(long)]
        stdout: bool,
    },

    /// Summarize a CSV file (delimiter is detected)
    Inspect { file: PathBuf },

    /// Serve canned OCR backend responses until Ctrl-C
    MockBackend {
        /// Port to bind, 0 for any free port
        #[arg(short, long)]
        port: Option<u16>,

        /// JSON route table replacing the canned routes
        #[arg(long)]
        routes: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct CropArgs {
    /// Fraction cropped from the top (0-1)
    #[arg(long, default_value_t = 0.0)]
    pub upper: f64,

    /// Fraction cropped from the bottom (0-1)
    #[arg(long, default_value_t = 0.0)]
    pub lower: f64,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Skip writing the CSV file
    #[arg(long)]
    pub no_download: bool,
}

/// Everything a command needs, built once from configuration
struct Context {
    config: AppConfig,
    backend: Arc<dyn OcrBackend>,
    engine: Arc<TabularExportEngine>,
    logs: LogBuffer,
}

impl Context {
    fn new(mut config: AppConfig, cli: &Cli) -> Result<Self> {
        if let Some(url) = &cli.backend_url {
            config.backend = BackendConfig {
                timeout_secs: config.backend.timeout_secs,
                ..BackendConfig::single(url)
            };
        }
        if let Some(dir) = &cli.download_dir {
            config.download_dir = dir.clone();
        }

        Ok(Self {
            backend: Arc::new(HttpOcrBackend::new(config.backend.clone())?),
            engine: Arc::new(TabularExportEngine::new(config.export)),
            logs: new_log_buffer(),
            config,
        })
    }

    fn sink(&self) -> DirectoryDownloads {
        DirectoryDownloads::new(self.config.download_dir.clone())
    }
}

pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let context = Context::new(config, &cli)?;
    let show_logs = cli.show_logs;

    let result = match cli.command {
        Commands::CropOcr {
            file,
            crop,
            max_images,
            psm,
            oem,
            no_gpu,
            languages,
            download,
        } => {
            let controller = CropOcrController::new(
                context.backend.clone(),
                context.engine.clone(),
                context.logs.clone(),
            );
            controller.select_file(Some(file));
            for change in [
                Hyperparameter::UpperPercent(crop.upper),
                Hyperparameter::LowerPercent(crop.lower),
                Hyperparameter::MaxCroppedImages(max_images),
                Hyperparameter::TesseractPsm(psm),
                Hyperparameter::TesseractOem(oem),
            ] {
                controller.set_hyperparameter(change);
            }
            if no_gpu {
                controller.toggle_gpu();
            }
            if !languages.is_empty() {
                controller.set_languages(languages);
            }

            let outcome = controller.submit().await;
            finish(outcome, || {
                let state = controller.state();
                println!("[+] Processed images:");
                for url in &state.processed_images {
                    println!("    {}", url);
                }
                if let Some(url) = &state.results_csv_url {
                    println!("[+] Backend CSV: {}", url);
                }
                if let Some(export) = controller.csv_export() {
                    print_csv(&context.engine, &export.document);
                }
                if !download.no_download {
                    save(&context, |sink| controller.download_csv(sink));
                }
            })
        }
        Commands::Slips {
            files,
            slip_type,
            download,
        } => {
            let controller = SlipUploadController::new(
                context.backend.clone(),
                context.engine.clone(),
                context.logs.clone(),
            );
            controller.set_slip_type(slip_type);

            let outcome = controller.submit(&files).await;
            finish(outcome, || {
                if let Some(ExtractionResult::FlatMapping(entries)) = controller.state().extraction() {
                    for (file_name, fields) in entries {
                        println!("[+] {}", file_name);
                        for (field, value) in fields {
                            println!("    {}: {}", field, crate::domain::csv::cell_text(value));
                        }
                    }
                }
                print_charts(controller.state().extracted.as_ref().map(|view| &view.charts));
                if !download.no_download {
                    save(&context, |sink| controller.download_csv(sink));
                }
            })
        }
        Commands::Cloud {
            slip_type,
            num_images,
            download,
        } => {
            let controller = CloudBatchController::new(
                context.backend.clone(),
                context.engine.clone(),
                context.logs.clone(),
            );
            controller.set_slip_type(slip_type);
            controller.set_image_count(num_images);

            let outcome = controller.submit().await;
            finish(outcome, || {
                for table in controller.tables() {
                    println!("[+] {}", table.image_name);
                    for entry in table.entries {
                        println!("    {} | {}", entry.label, entry.value);
                    }
                }
                print_charts(controller.state().extracted.as_ref().map(|view| &view.charts));
                if !download.no_download {
                    save(&context, |sink| controller.download_csv(sink));
                }
            })
        }
        Commands::Quick { file, upper, lower } => {
            let controller =
                QuickProcessController::new(context.backend.clone(), context.logs.clone());
            controller.select_file(Some(file));
            controller.set_crop(CropParams {
                upper_percent: upper,
                lower_percent: lower,
            });

            let outcome = controller.submit().await;
            finish(outcome, || {
                if let Some(result) = controller.result() {
                    let pretty = serde_json::to_string_pretty(&result)
                        .unwrap_or_else(|_| result.to_string());
                    println!("{}", pretty);
                }
            })
        }
        Commands::Export {
            input,
            mode,
            output,
            quoting,
            schema_policy,
            header_strategy,
            image_name_column,
            legacy,
            stdout,
        } => {
            let mut export = if legacy {
                ExportConfig::legacy()
            } else {
                context.config.export
            };
            if let Some(quoting) = quoting {
                export = export.with_quoting(quoting);
            }
            if let Some(policy) = schema_policy {
                export = export.with_schema_policy(policy);
            }
            if let Some(strategy) = header_strategy {
                export = export.with_header_strategy(strategy);
            }
            if image_name_column {
                export = export.with_image_name_column(true);
            }
            export_file(&context, &input, mode, &output, export, stdout)
        }
        Commands::Inspect { file } => inspect(&file),
        Commands::MockBackend { port, routes } => {
            let port = port.unwrap_or(context.config.mock_backend_port);
            let config = match routes {
                Some(path) => MockBackendConfig::load(&path, port)?,
                None => MockBackendConfig::new(port),
            };
            serve_mock(config, context.logs.clone()).await
        }
    };

    if show_logs {
        println!("\n[*] Diagnostic log:");
        for entry in snapshot(&context.logs) {
            println!(
                "    {} {:<5} [{}] {}",
                entry.time, entry.level, entry.source, entry.message
            );
        }
    }

    result
}

fn finish(outcome: SubmitOutcome, on_success: impl FnOnce()) -> Result<()> {
    match outcome {
        SubmitOutcome::Completed => {
            on_success();
            Ok(())
        }
        SubmitOutcome::Ignored => Ok(()),
        SubmitOutcome::Rejected(message) => Err(AppError::ValidationError(message)),
        SubmitOutcome::Failed(message) => Err(AppError::BackendError(message)),
    }
}

fn save(context: &Context, download: impl FnOnce(&DirectoryDownloads) -> bool) {
    let sink = context.sink();
    if !download(&sink) {
        println!("[*] Nothing to download");
        return;
    }
    match sink.saved_paths().first() {
        Some(path) => println!("[+] Saved {}", path.display()),
        None => println!("[!] Download failed, see --show-logs"),
    }
}

fn print_csv(engine: &TabularExportEngine, document: &crate::domain::csv::CsvDocument) {
    match engine.render(document) {
        Ok(text) => println!("{}", text),
        Err(err) => println!("[!] {}", err),
    }
}

fn print_charts(charts: Option<&crate::domain::screen::ChartSet>) {
    let Some(charts) = charts else { return };
    for url in charts.pie.iter().chain(charts.bar.iter()) {
        println!("[+] Chart: {}", url);
    }
}

fn export_file(
    context: &Context,
    input: &Path,
    mode: ExportMode,
    output: &str,
    export: ExportConfig,
    stdout: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;
    let extraction = ExtractionResult::from_json(mode, value)?;
    let engine = TabularExportEngine::new(export);

    if stdout {
        let document = engine.to_csv(&extraction, mode)?;
        println!("{}", engine.render(&document)?);
        return Ok(());
    }

    let sink = context.sink();
    engine.export(&extraction, mode, output, &sink)?;
    match sink.saved_paths().first() {
        Some(path) => {
            println!("[+] Saved {}", path.display());
            Ok(())
        }
        None => Err(AppError::IoError(format!(
            "Could not write {} into {}",
            output,
            sink.dir().display()
        ))),
    }
}

fn inspect(file: &Path) -> Result<()> {
    let document = CsvParser::new().read_path(file)?;
    println!("[*] {}", file.display());
    println!("    Columns ({}): {}", document.header().len(), document.header().join(", "));
    println!("    Rows: {}", document.rows().len());
    Ok(())
}

async fn serve_mock(config: MockBackendConfig, logs: LogBuffer) -> Result<()> {
    let mock = MockBackend::new(config, logs);
    let address = mock.start()?;
    println!("[+] Mock OCR backend on http://{} (Ctrl-C to stop)", address);

    tokio::signal::ctrl_c().await?;
    mock.stop().await;
    Ok(())
}
