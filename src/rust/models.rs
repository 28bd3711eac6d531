/// Represents the available built-in models in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinModel {
    /// DistilBERT fine-tuned on SST-2 for binary sentiment
    ///
    /// Characteristics:
    /// - Labels: NEGATIVE, POSITIVE
    /// - Max sequence length: 512
    /// - Size: ~268MB
    DistilBertSst2,
}

/// Characteristics of a model including its capabilities and requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCharacteristics {
    /// Maximum sequence length the model can handle, special tokens included
    pub max_sequence_length: usize,
    /// Number of labels produced by the classification head
    pub num_labels: usize,
}

/// Where to fetch a model's files and how to check them.
///
/// A `None` hash means nothing is pinned upstream; the manager then records
/// the hash observed at download time and verifies against that.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    pub config_url: String,
    pub model_hash: Option<String>,
    pub tokenizer_hash: Option<String>,
    pub config_hash: Option<String>,
}

const DISTILBERT_SST2_REPO: &str =
    "https://huggingface.co/Xenova/distilbert-base-uncased-finetuned-sst-2-english/resolve/main";

impl BuiltinModel {
    /// Get the characteristics of the model
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::DistilBertSst2 => ModelCharacteristics {
                max_sequence_length: 512,
                num_labels: 2,
            },
        }
    }

    /// Get the download locations of the model files
    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            Self::DistilBertSst2 => ModelInfo {
                name: "distilbert-sst2".to_string(),
                model_url: format!("{}/onnx/model.onnx", DISTILBERT_SST2_REPO),
                tokenizer_url: format!("{}/tokenizer.json", DISTILBERT_SST2_REPO),
                config_url: format!("{}/config.json", DISTILBERT_SST2_REPO),
                model_hash: None,
                tokenizer_hash: None,
                config_hash: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_model_info() {
        let info = BuiltinModel::DistilBertSst2.get_model_info();
        assert_eq!(info.name, "distilbert-sst2");
        assert!(info.model_url.ends_with("model.onnx"));
        assert!(info.tokenizer_url.ends_with("tokenizer.json"));
        assert!(info.config_url.ends_with("config.json"));
    }

    #[test]
    fn test_builtin_model_characteristics() {
        let characteristics = BuiltinModel::DistilBertSst2.characteristics();
        assert_eq!(characteristics.max_sequence_length, 512);
        assert_eq!(characteristics.num_labels, 2);
    }
}
