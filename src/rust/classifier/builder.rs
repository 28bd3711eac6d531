use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokenizers::{PaddingStrategy, Tokenizer, TruncationParams};
use ort::session::Session;
use serde::Deserialize;
use log::{info, error};

use super::error::ClassifierError;
use super::encoding::SequenceClassification;
use super::classifier::SentimentClassifier;
use crate::{BuiltinModel, ModelCharacteristics, ModelManager, runtime::{RuntimeConfig, create_session_builder}};

/// Texts per inference call unless overridden
pub const DEFAULT_BATCH_SIZE: usize = 32;

const FALLBACK_MAX_SEQUENCE_LENGTH: usize = 512;

/// The parts of a Hugging Face `config.json` the classifier needs
#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

/// Parses `config.json` and returns the labels ordered by class id.
///
/// Ids must be exactly `0..n`.
fn parse_labels(config: &ModelConfig) -> Result<Vec<String>, ClassifierError> {
    if config.id2label.is_empty() {
        return Err(ClassifierError::ConfigError("id2label is empty".into()));
    }

    let mut labels = vec![None; config.id2label.len()];
    for (id, label) in &config.id2label {
        let index: usize = id.parse()
            .map_err(|_| ClassifierError::ConfigError(format!("Label id '{}' is not an integer", id)))?;
        let slot = labels.get_mut(index)
            .ok_or_else(|| ClassifierError::ConfigError(format!("Label id {} is out of range", index)))?;
        *slot = Some(label.clone());
    }

    labels.into_iter()
        .enumerate()
        .map(|(i, label)| label.ok_or_else(|| ClassifierError::ConfigError(format!("Missing label for id {}", i))))
        .collect()
}

/// A built-in model's config must define as many labels as its head produces
fn check_label_count(labels: &[String], characteristics: &ModelCharacteristics) -> Result<(), ClassifierError> {
    if labels.len() != characteristics.num_labels {
        return Err(ClassifierError::ConfigError(format!(
            "config.json defines {} labels but the model has {}",
            labels.len(),
            characteristics.num_labels
        )));
    }
    Ok(())
}

fn read_model_config(path: &Path) -> Result<ModelConfig, ClassifierError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ClassifierError::ConfigError(format!("Failed to read {:?}: {}", path, e)))?;
    serde_json::from_str(&content)
        .map_err(|e| ClassifierError::ConfigError(format!("Failed to parse {:?}: {}", path, e)))
}

/// A builder for constructing a SentimentClassifier with a fluent interface.
#[derive(Default, Debug)]
pub struct SentimentClassifierBuilder {
    model_path: Option<String>,
    tokenizer_path: Option<String>,
    tokenizer: Option<Tokenizer>,
    session: Option<Session>,
    labels: Option<Vec<String>>,
    model_characteristics: Option<ModelCharacteristics>,
    runtime_config: RuntimeConfig,
    batch_size: Option<usize>,
}

impl SequenceClassification for SentimentClassifierBuilder {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        self.tokenizer.as_ref()
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

impl SentimentClassifierBuilder {
    /// Creates a new empty builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Must be called before the model is loaded to take effect.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets how many texts are sent to the model per inference call
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, ClassifierError> {
        if batch_size == 0 {
            return Err(ClassifierError::ValidationError("Batch size must be greater than zero".into()));
        }
        self.batch_size = Some(batch_size);
        Ok(self)
    }

    /// Loads a built-in model from the default model cache.
    ///
    /// # Errors
    /// * `BuildError` if a model is already set or the model is not downloaded
    /// * Any error from loading the tokenizer, config or ONNX session
    ///
    /// ```no_run
    /// use csv_sentiment::{SentimentClassifierBuilder, BuiltinModel};
    ///
    /// let builder = SentimentClassifierBuilder::new()
    ///     .with_model(BuiltinModel::DistilBertSst2);
    /// ```
    pub fn with_model(self, model: BuiltinModel) -> Result<Self, ClassifierError> {
        let manager = ModelManager::new_default()
            .map_err(|e| ClassifierError::BuildError(format!("Failed to create model manager: {}", e)))?;
        self.with_model_in(&manager, model)
    }

    /// Loads a built-in model from the cache managed by `manager`
    pub fn with_model_in(self, manager: &ModelManager, model: BuiltinModel) -> Result<Self, ClassifierError> {
        if self.model_path.is_some() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        let info = model.get_model_info();
        if !manager.is_model_downloaded(&info.name) {
            return Err(ClassifierError::BuildError(format!(
                "Model '{:?}' is not downloaded. Please download it first using ModelManager::download_model()",
                model
            )));
        }

        let model_path = manager.get_model_path(&info.name);
        let tokenizer_path = manager.get_tokenizer_path(&info.name);
        let config_path = manager.get_config_path(&info.name);
        let config = read_model_config(&config_path)?;

        self.load(&model_path, &tokenizer_path, config, model.characteristics())
    }

    /// Loads a model from explicit file paths.
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `tokenizer_path` - Path to the `tokenizer.json` file
    /// * `config_path` - Path to the model's `config.json`, which must carry `id2label`
    /// * `max_sequence_length` - Truncation length; defaults to the config's
    ///   `max_position_embeddings`, then 512
    pub fn with_custom_model(
        self,
        model_path: &str,
        tokenizer_path: &str,
        config_path: &str,
        max_sequence_length: Option<usize>,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() || tokenizer_path.is_empty() || config_path.is_empty() {
            return Err(ClassifierError::BuildError("Model, tokenizer and config paths cannot be empty".to_string()));
        }
        if self.model_path.is_some() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        for (kind, path) in [("Model", model_path), ("Tokenizer", tokenizer_path), ("Config", config_path)] {
            if !Path::new(path).exists() {
                return Err(ClassifierError::BuildError(format!("{} file not found: {}", kind, path)));
            }
        }

        let config = read_model_config(Path::new(config_path))?;
        let max_sequence_length = max_sequence_length
            .or(config.max_position_embeddings)
            .unwrap_or(FALLBACK_MAX_SEQUENCE_LENGTH);
        let characteristics = ModelCharacteristics {
            max_sequence_length,
            num_labels: config.id2label.len(),
        };

        self.load(Path::new(model_path), Path::new(tokenizer_path), config, characteristics)
    }

    fn load(
        mut self,
        model_path: &Path,
        tokenizer_path: &Path,
        config: ModelConfig,
        characteristics: ModelCharacteristics,
    ) -> Result<Self, ClassifierError> {
        let labels = parse_labels(&config)?;
        check_label_count(&labels, &characteristics)?;
        info!("Model labels: {:?}", labels);

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| {
                error!("Failed to load tokenizer: {}", e);
                ClassifierError::BuildError(format!("Failed to load tokenizer: {}", e))
            })?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: characteristics.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
        padding.strategy = PaddingStrategy::BatchLongest;
        tokenizer.with_padding(Some(padding));
        info!("Tokenizer loaded successfully");

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        self.tokenizer = Some(tokenizer);
        self.session = Some(session);

        // Run one sample so a label table that does not match the head fails at build time
        let sample = self.encode_batch(&["sample"])?;
        let width = self.compute_logits(&sample)?
            .first()
            .map(Vec::len)
            .unwrap_or(0);
        if width != labels.len() {
            return Err(ClassifierError::ModelError(format!(
                "Model outputs {} logits but config.json defines {} labels",
                width,
                labels.len()
            )));
        }

        self.labels = Some(labels);
        self.model_characteristics = Some(characteristics);
        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.tokenizer_path = Some(tokenizer_path.to_string_lossy().to_string());
        Ok(self)
    }

    /// Builds and returns the final SentimentClassifier instance
    ///
    /// # Errors
    /// * `BuildError` if no model has been loaded
    pub fn build(self) -> Result<SentimentClassifier, ClassifierError> {
        let (Some(model_path), Some(tokenizer_path)) = (self.model_path, self.tokenizer_path) else {
            return Err(ClassifierError::BuildError("Model and tokenizer paths must be set".to_string()));
        };
        let tokenizer = self.tokenizer
            .ok_or_else(|| ClassifierError::BuildError("No tokenizer loaded".into()))?;
        let session = self.session
            .ok_or_else(|| ClassifierError::BuildError("No ONNX model loaded".into()))?;
        let labels = self.labels
            .ok_or_else(|| ClassifierError::BuildError("No labels loaded".into()))?;
        let model_characteristics = self.model_characteristics
            .ok_or_else(|| ClassifierError::BuildError("Model characteristics not set".to_string()))?;

        Ok(SentimentClassifier {
            model_path,
            tokenizer_path,
            tokenizer: Arc::new(tokenizer),
            session: Arc::new(session),
            labels: Arc::new(labels),
            model_characteristics,
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        })
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        for required in ["input_ids", "attention_mask"] {
            if !session.inputs.iter().any(|input| input.name == required) {
                return Err(ClassifierError::ModelError(format!(
                    "Model is missing the '{}' input, found {:?}",
                    required,
                    session.inputs.iter().map(|input| input.name.as_str()).collect::<Vec<_>>()
                )));
            }
        }

        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for logits".to_string()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> ModelConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_labels_orders_by_id() {
        let labels = parse_labels(&config(r#"{"id2label": {"1": "POSITIVE", "0": "NEGATIVE"}}"#)).unwrap();
        assert_eq!(labels, vec!["NEGATIVE", "POSITIVE"]);
    }

    #[test]
    fn test_parse_labels_rejects_gaps() {
        let result = parse_labels(&config(r#"{"id2label": {"0": "NEGATIVE", "2": "POSITIVE"}}"#));
        assert!(matches!(result, Err(ClassifierError::ConfigError(_))));
    }

    #[test]
    fn test_parse_labels_rejects_non_numeric_ids() {
        let result = parse_labels(&config(r#"{"id2label": {"zero": "NEGATIVE"}}"#));
        assert!(matches!(result, Err(ClassifierError::ConfigError(_))));
    }

    #[test]
    fn test_parse_labels_rejects_empty() {
        let result = parse_labels(&config(r#"{"id2label": {}}"#));
        assert!(matches!(result, Err(ClassifierError::ConfigError(_))));
    }

    #[test]
    fn test_label_count_must_match_model() {
        let characteristics = BuiltinModel::DistilBertSst2.characteristics();
        let labels = parse_labels(&config(r#"{"id2label": {"0": "NEGATIVE", "1": "POSITIVE"}}"#)).unwrap();
        assert!(check_label_count(&labels, &characteristics).is_ok());

        let labels = parse_labels(&config(r#"{"id2label": {"0": "NEGATIVE", "1": "NEUTRAL", "2": "POSITIVE"}}"#)).unwrap();
        let result = check_label_count(&labels, &characteristics);
        assert!(matches!(result, Err(ClassifierError::ConfigError(_))));
    }

    #[test]
    fn test_config_reads_max_position_embeddings() {
        let parsed = config(r#"{"id2label": {"0": "A"}, "max_position_embeddings": 128, "dim": 768}"#);
        assert_eq!(parsed.max_position_embeddings, Some(128));
    }

    #[test]
    fn test_build_without_model() {
        let result = SentimentClassifierBuilder::new().build();
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_zero_batch_size() {
        let result = SentimentClassifierBuilder::new().with_batch_size(0);
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_custom_model_validation() {
        let result = SentimentClassifierBuilder::new().with_custom_model("", "tokenizer.json", "config.json", None);
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));

        let result = SentimentClassifierBuilder::new()
            .with_custom_model("missing/model.onnx", "missing/tokenizer.json", "missing/config.json", None);
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_with_model_requires_download() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let result = SentimentClassifierBuilder::new().with_model_in(&manager, BuiltinModel::DistilBertSst2);
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }
}
