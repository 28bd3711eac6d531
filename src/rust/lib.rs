//! Batch sentiment analysis for CSV files.
//!
//! Pick a text column, run every value through a pretrained sentiment model
//! and get the same table back with `Sentiment` and `Confidence` columns
//! appended.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use csv_sentiment::{analyze_csv, BuiltinModel, ModelManager, SentimentClassifier};
//!
//! let manager = ModelManager::new_default()?;
//! manager.ensure_model_downloaded(&BuiltinModel::DistilBertSst2.get_model_info()).await?;
//!
//! let classifier = SentimentClassifier::builder()
//!     .with_model_in(&manager, BuiltinModel::DistilBertSst2)?
//!     .build()?;
//!
//! let outcome = analyze_csv(&classifier, "reviews.csv", "text", "reviews_sentiment.csv")?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```
//!
//! # Custom classifiers
//!
//! Anything implementing [`TextClassifier`] can drive the analysis, which is
//! how the tests exercise the CSV handling without loading a model.

pub mod analysis;
pub mod classifier;
mod runtime;
pub mod model_manager;
pub mod models;
pub mod table;

pub use analysis::{
    analyze_csv, analyze_table, check_column, column_choices, default_output_path, list_columns,
    AnalysisError, AnalysisOutcome, AnalysisReport, ColumnListError,
    COLUMN_NOT_FOUND_MESSAGE, CONFIDENCE_COLUMN, DEFAULT_OUTPUT_FILE, SENTIMENT_COLUMN,
};
pub use classifier::{
    Classification, ClassifierError, ClassifierInfo, SentimentClassifier,
    SentimentClassifierBuilder, TextClassifier,
};
pub use runtime::{OptimizationLevel, RuntimeConfig, create_session_builder};
pub use model_manager::{ModelError, ModelFile, ModelManager};
pub use models::{BuiltinModel, ModelCharacteristics, ModelInfo};
pub use table::{Table, TableError};
