use std::sync::Arc;
use ort::session::Session;
use tokenizers::Tokenizer;
use log::{debug, warn};

use super::error::ClassifierError;
use super::encoding::SequenceClassification;
use super::utils::{argmax, softmax};
use super::{Classification, ClassifierInfo, TextClassifier};
use crate::ModelCharacteristics;

/// A thread-safe sentiment classifier backed by an ONNX sequence-classification model.
///
/// # Thread Safety
///
/// This type is `Send + Sync`; the tokenizer, session and label table are held
/// in `Arc`s so clones of an `Arc<SentimentClassifier>` share one loaded model.
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use csv_sentiment::{SentimentClassifier, BuiltinModel};
///
/// let classifier = SentimentClassifier::builder()
///     .with_model(BuiltinModel::DistilBertSst2)?
///     .build()?;
///
/// let result = classifier.predict("great product")?;
/// println!("{} ({:.3})", result.label, result.score);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SentimentClassifier {
    pub model_path: String,
    pub tokenizer_path: String,
    pub tokenizer: Arc<Tokenizer>,
    pub session: Arc<Session>,
    pub labels: Arc<Vec<String>>,
    pub model_characteristics: ModelCharacteristics,
    pub batch_size: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SentimentClassifier>();
    }
};

impl SequenceClassification for SentimentClassifier {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        Some(&*self.tokenizer)
    }

    fn session(&self) -> Option<&Session> {
        Some(&*self.session)
    }
}

impl SentimentClassifier {
    /// Creates a new SentimentClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::SentimentClassifierBuilder {
        super::builder::SentimentClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            labels: self.labels.as_ref().clone(),
            max_sequence_length: self.model_characteristics.max_sequence_length,
            batch_size: self.batch_size,
        }
    }

    /// Classifies a single text
    pub fn predict(&self, text: &str) -> Result<Classification, ClassifierError> {
        self.classify_chunk(&[text])?
            .pop()
            .ok_or_else(|| ClassifierError::PredictionError("Model returned no result".into()))
    }

    fn classify_chunk(&self, texts: &[&str]) -> Result<Vec<Classification>, ClassifierError> {
        let batch = self.encode_batch(texts)?;
        if batch.truncated > 0 {
            warn!(
                "{} of {} texts exceeded {} tokens and were truncated",
                batch.truncated,
                texts.len(),
                self.model_characteristics.max_sequence_length
            );
        }

        let logits = self.compute_logits(&batch)?;
        logits.iter()
            .map(|row| label_logits(&self.labels, row))
            .collect()
    }
}

/// Picks the most probable label for one row of logits
pub(crate) fn label_logits(labels: &[String], logits: &[f32]) -> Result<Classification, ClassifierError> {
    if logits.len() != labels.len() {
        return Err(ClassifierError::PredictionError(format!(
            "Model produced {} logits but {} labels are configured",
            logits.len(),
            labels.len()
        )));
    }

    let probs = softmax(logits);
    let (index, score) = argmax(&probs)
        .ok_or_else(|| ClassifierError::PredictionError("Empty logits row".into()))?;

    Ok(Classification {
        label: labels[index].clone(),
        score,
    })
}

impl TextClassifier for SentimentClassifier {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>, ClassifierError> {
        let mut results = Vec::with_capacity(texts.len());
        for (i, chunk) in texts.chunks(self.batch_size.max(1)).enumerate() {
            debug!("Classifying chunk {} ({} texts)", i + 1, chunk.len());
            let chunk: Vec<&str> = chunk.iter().map(String::as_str).collect();
            results.extend(self.classify_chunk(&chunk)?);
        }
        Ok(results)
    }
}
