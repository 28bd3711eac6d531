use tokenizers::Tokenizer;
use ort::session::Session;
use ndarray::Array2;
use ort::value::Tensor;
use std::collections::HashMap;

use super::error::ClassifierError;

/// Token ids and attention mask for one inference chunk, shape `[batch, seq]`
#[derive(Debug, Clone)]
pub(crate) struct EncodedBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    /// Rows whose text was cut to fit the model's sequence length
    pub truncated: usize,
}

impl EncodedBatch {
    pub fn len(&self) -> usize {
        self.input_ids.nrows()
    }
}

/// Runs a sequence-classification ONNX model over tokenized text.
///
/// The tokenizer is expected to be configured with truncation to the model's
/// max length and batch-longest padding, so every encoding in a batch has the
/// same length.
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask` (and optionally `token_type_ids`),
///   all `i64` of shape `[batch_size, sequence_length]`
/// - Output logits of shape `[batch_size, num_labels]` as its first output
pub(crate) trait SequenceClassification {
    fn tokenizer(&self) -> Option<&Tokenizer>;

    fn session(&self) -> Option<&Session>;

    /// Tokenizes a chunk of texts into padded model inputs.
    ///
    /// # Errors
    /// - `TokenizerError` if the tokenizer is not initialized or encoding fails
    /// - `ModelError` if the encodings cannot be shaped into a matrix
    fn encode_batch(&self, texts: &[&str]) -> Result<EncodedBatch, ClassifierError> {
        let tokenizer = self.tokenizer()
            .ok_or_else(|| ClassifierError::TokenizerError("Tokenizer not initialized".into()))?;

        let encodings = tokenizer.encode_batch(texts.to_vec(), true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;

        let rows = encodings.len();
        let cols = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let truncated = encodings.iter().filter(|e| !e.get_overflowing().is_empty()).count();

        let mut ids = Vec::with_capacity(rows * cols);
        let mut mask = Vec::with_capacity(rows * cols);
        for encoding in &encodings {
            let len = encoding.get_ids().len();
            ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
            // Padding normally makes this a no-op; keep the matrix rectangular regardless
            ids.extend(std::iter::repeat(0i64).take(cols - len));
            mask.extend(std::iter::repeat(0i64).take(cols - len));
        }

        let input_ids = Array2::from_shape_vec((rows, cols), ids)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))?;
        let attention_mask = Array2::from_shape_vec((rows, cols), mask)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create mask array: {}", e)))?;

        Ok(EncodedBatch { input_ids, attention_mask, truncated })
    }

    /// Runs the model and returns one row of raw logits per input row.
    ///
    /// # Errors
    /// - `ModelError` if the session is not initialized, tensor creation fails,
    ///   model execution fails or the output has an unexpected shape
    fn compute_logits(&self, batch: &EncodedBatch) -> Result<Vec<Vec<f32>>, ClassifierError> {
        let session = self.session()
            .ok_or_else(|| ClassifierError::ModelError("Session not initialized".into()))?;

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Tensor::from_array(batch.input_ids.clone())
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?);
        input_tensors.insert("attention_mask", Tensor::from_array(batch.attention_mask.clone())
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create mask tensor: {}", e)))?);
        if session.inputs.iter().any(|input| input.name == "token_type_ids") {
            let type_ids = Array2::<i64>::zeros(batch.input_ids.raw_dim());
            input_tensors.insert("token_type_ids", Tensor::from_array(type_ids)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create type tensor: {}", e)))?);
        }

        let outputs = session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let logits = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        let shape = logits.shape();
        if shape.len() != 2 || shape[0] != batch.len() {
            return Err(ClassifierError::ModelError(format!(
                "Unexpected logits shape {:?} for a batch of {}", shape, batch.len()
            )));
        }

        Ok(logits.outer_iter()
            .map(|row| row.iter().copied().collect())
            .collect())
    }
}
