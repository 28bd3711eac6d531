use csv_sentiment::{
    analyze_csv, check_column, default_output_path, list_columns, AnalysisOutcome, BuiltinModel,
    ColumnListError, ModelManager, COLUMN_NOT_FOUND_MESSAGE, OptimizationLevel, RuntimeConfig, SentimentClassifier,
};
use log::{error, info};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the column names of a CSV file, one per line
    Columns {
        file: PathBuf,
    },
    /// Add Sentiment and Confidence columns for a text column
    Analyze {
        file: PathBuf,
        /// Column holding the text to classify
        #[arg(short, long)]
        column: String,
        /// Destination CSV (default: <file stem>_sentiment.csv next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Texts per inference call
        #[arg(short, long, default_value_t = 32)]
        batch_size: usize,
        /// ONNX Runtime intra-op threads (0 lets the runtime decide)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        #[arg(long, value_enum, default_value_t = OptimizationLevel::Level3)]
        optimization: OptimizationLevel,
        /// Force a fresh download of the model files
        #[arg(short, long)]
        fresh: bool,
    },
    /// Download the sentiment model into the local cache
    Download {
        /// Force a fresh download of the model files
        #[arg(short, long)]
        fresh: bool,
    },
}

async fn ensure_model_downloaded(manager: &ModelManager, fresh: bool) -> anyhow::Result<()> {
    let info = BuiltinModel::DistilBertSst2.get_model_info();

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(&info.name)?;
    }

    manager.ensure_model_downloaded(&info).await?;
    Ok(())
}

fn report_missing_column(column: &str, available: &[String]) -> ExitCode {
    println!("{}", COLUMN_NOT_FOUND_MESSAGE);
    eprintln!("'{}' is not one of: {}", column, available.join(", "));
    ExitCode::FAILURE
}

fn print_columns(file: &Path) -> ExitCode {
    match list_columns(file) {
        Ok(columns) => {
            for column in columns {
                println!("{}", column);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let hint = match &e {
                ColumnListError::FileMissing(_) => "check the path",
                ColumnListError::Io(_) => "check the file permissions",
                ColumnListError::Parse(_) => "the file is not valid UTF-8 CSV",
                ColumnListError::Empty => "the file needs a header row",
            };
            eprintln!("Error: {} ({})", e, hint);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Columns { file } => Ok(print_columns(&file)),
        Command::Download { fresh } => {
            let manager = ModelManager::new_default()?;
            ensure_model_downloaded(&manager, fresh).await?;
            println!("Model files are in {}", manager.models_dir().display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze { file, column, output, batch_size, threads, optimization, fresh } => {
            // Fail fast before the model download and load
            if let Some(AnalysisOutcome::ColumnNotFound { column, available }) = check_column(&file, &column)? {
                return Ok(report_missing_column(&column, &available));
            }

            let manager = ModelManager::new_default()?;
            ensure_model_downloaded(&manager, fresh).await?;

            let start_time = Instant::now();
            info!("Building classifier...");
            let classifier = SentimentClassifier::builder()
                .with_runtime_config(RuntimeConfig {
                    intra_threads: threads,
                    optimization_level: optimization,
                    ..RuntimeConfig::default()
                })
                .with_batch_size(batch_size)?
                .with_model_in(&manager, BuiltinModel::DistilBertSst2)?
                .build()?;
            info!("Classifier built (took {:.2?})", start_time.elapsed());

            let output = output.unwrap_or_else(|| default_output_path(&file));
            let classify_start = Instant::now();
            let outcome = tokio::task::block_in_place(|| analyze_csv(&classifier, &file, &column, &output));

            match outcome {
                Ok(AnalysisOutcome::Success(report)) => {
                    info!("Analysis took {:.2?}", classify_start.elapsed());
                    for (label, count) in &report.label_counts {
                        info!("  {}: {}", label, count);
                    }
                    println!("{}", report.output.display());
                    Ok(ExitCode::SUCCESS)
                }
                Ok(AnalysisOutcome::ColumnNotFound { column, available }) => {
                    Ok(report_missing_column(&column, &available))
                }
                Err(e) => {
                    error!("Analysis failed: {}", e);
                    Err(e.into())
                }
            }
        }
    }
}
