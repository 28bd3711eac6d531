use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

use crate::models::ModelInfo;

/// Environment variable overriding the cache root
pub const CACHE_ENV_VAR: &str = "CSV_SENTIMENT_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus {
        url: String,
        status: u16,
    },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// The files that make up a downloaded model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    Model,
    Tokenizer,
    Config,
}

impl ModelFile {
    pub const ALL: [ModelFile; 3] = [ModelFile::Model, ModelFile::Tokenizer, ModelFile::Config];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Model => "model.onnx",
            Self::Tokenizer => "tokenizer.json",
            Self::Config => "config.json",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Tokenizer => "tokenizer",
            Self::Config => "config",
        }
    }

    fn url<'a>(&self, info: &'a ModelInfo) -> &'a str {
        match self {
            Self::Model => &info.model_url,
            Self::Tokenizer => &info.tokenizer_url,
            Self::Config => &info.config_url,
        }
    }

    fn pinned_hash<'a>(&self, info: &'a ModelInfo) -> Option<&'a str> {
        match self {
            Self::Model => info.model_hash.as_deref(),
            Self::Tokenizer => info.tokenizer_hash.as_deref(),
            Self::Config => info.config_hash.as_deref(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var(CACHE_ENV_VAR) {
            return PathBuf::from(path).join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("csv-sentiment").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("csv-sentiment").join("models");
        }

        env::temp_dir().join("csv-sentiment").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_file_path(&self, model_name: &str, file: ModelFile) -> PathBuf {
        self.models_dir.join(model_name).join(file.file_name())
    }

    pub fn get_model_path(&self, model_name: &str) -> PathBuf {
        self.get_file_path(model_name, ModelFile::Model)
    }

    pub fn get_tokenizer_path(&self, model_name: &str) -> PathBuf {
        self.get_file_path(model_name, ModelFile::Tokenizer)
    }

    pub fn get_config_path(&self, model_name: &str) -> PathBuf {
        self.get_file_path(model_name, ModelFile::Config)
    }

    fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".sha256");
        path.with_file_name(name)
    }

    pub fn is_model_downloaded(&self, model_name: &str) -> bool {
        ModelFile::ALL.iter().all(|&file| {
            let path = self.get_file_path(model_name, file);
            log::debug!("  {} path: {:?} (exists: {})", file.label(), path, path.exists());
            path.exists()
        })
    }

    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(&info.name);
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        for file in ModelFile::ALL {
            let path = self.get_file_path(&info.name, file);
            let result = if path.exists() && self.verify_file(info, file)? {
                log::info!("Existing {} file verified at {:?}", file.label(), path);
                Ok(())
            } else {
                if path.exists() {
                    log::warn!("{} file verification failed, redownloading", file.label());
                }
                self.download_and_verify_file(info, file, &path).await
            };

            if let Err(e) = result {
                log::error!("Failed to setup {} file: {}", file.label(), e);
                let _ = self.remove_download(&info.name);
                return Err(e);
            }
        }

        log::info!("Model '{}' ready to use", info.name);
        Ok(())
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Checks one file against its pinned hash, or the hash recorded at download time
    fn verify_file(&self, info: &ModelInfo, file: ModelFile) -> Result<bool, ModelError> {
        let path = self.get_file_path(&info.name, file);
        if !path.exists() {
            return Ok(false);
        }

        let expected = match file.pinned_hash(info) {
            Some(hash) => hash.to_string(),
            None => match fs::read_to_string(Self::sidecar_path(&path)) {
                Ok(recorded) => recorded.trim().to_string(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("No recorded hash for {:?}", path);
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            },
        };

        let actual = Self::hash_bytes(&fs::read(&path)?);
        log::debug!("Verifying {:?}: expected {}, got {}", path, expected, actual);
        Ok(actual == expected)
    }

    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        for file in ModelFile::ALL {
            if !self.verify_file(info, file)? {
                log::info!("{} file of '{}' failed verification", file.label(), info.name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn download_and_verify_file(
        &self,
        info: &ModelInfo,
        file: ModelFile,
        path: &Path,
    ) -> Result<(), ModelError> {
        let url = file.url(info);
        log::info!("Downloading {} file from {} to {:?}", file.label(), url, path);
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = Self::hash_bytes(&bytes);
        if let Some(expected) = file.pinned_hash(info) {
            if hash != expected {
                log::error!("{} hash mismatch: expected {}, got {}", file.label(), expected, hash);
                return Err(ModelError::HashMismatch {
                    file_type: file.label().to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, &bytes)?;
        fs::write(Self::sidecar_path(path), &hash)?;

        if !self.verify_file(info, file)? {
            return Err(ModelError::VerificationFailed);
        }

        log::info!("{} file downloaded and verified successfully", file.label());
        Ok(())
    }

    pub fn remove_download(&self, model_name: &str) -> Result<(), ModelError> {
        for file in ModelFile::ALL {
            let path = self.get_file_path(model_name, file);
            for candidate in [Self::sidecar_path(&path), path] {
                if candidate.exists() {
                    fs::remove_file(&candidate)?;
                }
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<(), ModelError> {
        log::info!("Checking if model {} is downloaded...", info.name);
        if !self.is_model_downloaded(&info.name) {
            log::info!("Model not found, downloading...");
            self.download_model(info).await?;
        } else if !self.verify_model(info)? {
            log::info!("Model verification failed, re-downloading...");
            self.remove_download(&info.name)?;
            self.download_model(info).await?;
        } else {
            log::info!("Model verification successful");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuiltinModel;

    fn write_fake_model(manager: &ModelManager, info: &ModelInfo) {
        for file in ModelFile::ALL {
            let path = manager.get_file_path(&info.name, file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            let bytes = format!("fake {}", file.label());
            fs::write(&path, &bytes).unwrap();
            fs::write(ModelManager::sidecar_path(&path), ModelManager::hash_bytes(bytes.as_bytes())).unwrap();
        }
    }

    #[test]
    fn test_paths_are_per_model() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        assert!(manager.get_model_path("distilbert-sst2").ends_with("distilbert-sst2/model.onnx"));
        assert!(manager.get_tokenizer_path("distilbert-sst2").ends_with("distilbert-sst2/tokenizer.json"));
        assert!(manager.get_config_path("distilbert-sst2").ends_with("distilbert-sst2/config.json"));
    }

    #[test]
    fn test_verification_uses_recorded_hash() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let info = BuiltinModel::DistilBertSst2.get_model_info();

        assert!(!manager.is_model_downloaded(&info.name));
        assert!(!manager.verify_model(&info).unwrap());

        write_fake_model(&manager, &info);
        assert!(manager.is_model_downloaded(&info.name));
        assert!(manager.verify_model(&info).unwrap());

        // Corrupt file and verify
        fs::write(manager.get_model_path(&info.name), "corrupted data").unwrap();
        assert!(!manager.verify_model(&info).unwrap());
    }

    #[test]
    fn test_pinned_hash_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let mut info = BuiltinModel::DistilBertSst2.get_model_info();
        write_fake_model(&manager, &info);

        info.config_hash = Some("0".repeat(64));
        assert!(!manager.verify_model(&info).unwrap());

        info.config_hash = Some(ModelManager::hash_bytes(b"fake config"));
        assert!(manager.verify_model(&info).unwrap());
    }

    #[test]
    fn test_remove_download() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let info = BuiltinModel::DistilBertSst2.get_model_info();
        write_fake_model(&manager, &info);

        manager.remove_download(&info.name).unwrap();
        assert!(!manager.is_model_downloaded(&info.name));
        assert!(!ModelManager::sidecar_path(&manager.get_model_path(&info.name)).exists());
    }

    #[test]
    fn test_default_models_dir() {
        env::set_var(CACHE_ENV_VAR, "/tmp/test-cache");
        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("/tmp/test-cache/models"));
        env::remove_var(CACHE_ENV_VAR);

        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("csv-sentiment/models"));
    }
}
