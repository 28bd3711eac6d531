use csv_sentiment::{BuiltinModel, ModelError, ModelFile, ModelInfo, ModelManager};

fn unreachable_model() -> ModelInfo {
    ModelInfo {
        name: "unreachable".to_string(),
        model_url: "http://127.0.0.1:9/model.onnx".to_string(),
        tokenizer_url: "http://127.0.0.1:9/tokenizer.json".to_string(),
        config_url: "http://127.0.0.1:9/config.json".to_string(),
        model_hash: None,
        tokenizer_hash: None,
        config_hash: None,
    }
}

#[tokio::test]
async fn test_model_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let manager = ModelManager::new(dir.path())?;

    assert!(manager.get_model_path("distilbert-sst2").ends_with("distilbert-sst2/model.onnx"));
    assert!(manager.get_tokenizer_path("distilbert-sst2").ends_with("distilbert-sst2/tokenizer.json"));
    assert_eq!(
        manager.get_file_path("distilbert-sst2", ModelFile::Config),
        dir.path().join("distilbert-sst2").join("config.json")
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_download_cleans_up() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let manager = ModelManager::new(dir.path())?;
    let info = unreachable_model();

    let result = manager.download_model(&info).await;
    assert!(matches!(result, Err(ModelError::DownloadError(_))));
    assert!(!manager.is_model_downloaded(&info.name));
    assert!(!manager.get_model_path(&info.name).exists());
    Ok(())
}

#[tokio::test]
async fn test_verification_of_missing_model() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let manager = ModelManager::new(dir.path())?;
    let info = BuiltinModel::DistilBertSst2.get_model_info();

    assert!(!manager.is_model_downloaded(&info.name));
    assert!(!manager.verify_model(&info)?);
    Ok(())
}

#[tokio::test]
#[ignore = "downloads the sentiment model"]
async fn test_model_download() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let manager = ModelManager::new(dir.path())?;
    let info = BuiltinModel::DistilBertSst2.get_model_info();

    manager.download_model(&info).await?;
    assert!(manager.is_model_downloaded(&info.name));
    assert!(manager.verify_model(&info)?);

    // A corrupted cache is repaired
    std::fs::write(manager.get_tokenizer_path(&info.name), "corrupted data")?;
    assert!(!manager.verify_model(&info)?);
    manager.ensure_model_downloaded(&info).await?;
    assert!(manager.verify_model(&info)?);
    Ok(())
}
