mod error;
mod encoding;
mod classifier;
pub mod builder;
pub(crate) mod utils;

use serde::Serialize;

pub use error::ClassifierError;
pub use classifier::SentimentClassifier;
pub use builder::SentimentClassifierBuilder;

/// The label and confidence predicted for one text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Polarity class name as produced by the model, e.g. `POSITIVE`
    pub label: String,
    /// Probability of `label`, in [0, 1]
    pub score: f32,
}

/// Anything that can assign a polarity label to a batch of texts.
///
/// Implementations must return exactly one `Classification` per input text,
/// in input order.
pub trait TextClassifier {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>, ClassifierError>;
}

impl<T: TextClassifier + ?Sized> TextClassifier for &T {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>, ClassifierError> {
        (**self).classify_batch(texts)
    }
}

impl<T: TextClassifier + ?Sized> TextClassifier for std::sync::Arc<T> {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>, ClassifierError> {
        (**self).classify_batch(texts)
    }
}

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Path to the tokenizer file
    pub tokenizer_path: String,
    /// Labels in class-id order
    pub labels: Vec<String>,
    /// Longest input in tokens; longer texts are truncated
    pub max_sequence_length: usize,
    /// Texts per inference call
    pub batch_size: usize,
}
