//! Post-recognition text conversion, e.g. simplified to traditional Chinese.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crate::config::{ConversionMode, ConvertConfig};
use crate::error::{Result, SubocrError};

#[async_trait]
pub trait TextConverter: Send + Sync {
    async fn convert(&self, text: &str) -> Result<String>;

    async fn check_availability(&self) -> Result<()>;
}

/// Leaves text untouched
pub struct IdentityConverter;

#[async_trait]
impl TextConverter for IdentityConverter {
    async fn convert(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Converts through the `opencc` command line tool, memoizing results
pub struct OpenCcConverter {
    config: ConvertConfig,
    cache: Mutex<HashMap<String, String>>,
}

impl OpenCcConverter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, text: &str) -> Option<String> {
        self.cache.lock().ok()?.get(text).cloned()
    }

    async fn run_opencc(&self, text: &str) -> Result<String> {
        let mut child = Command::new(&self.config.binary_path)
            .arg("-c")
            .arg(&self.config.profile)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SubocrError::Convert(format!("Failed to execute opencc: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(SubocrError::Convert(format!(
                "opencc failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end_matches(['\r', '\n']).to_string())
    }
}

#[async_trait]
impl TextConverter for OpenCcConverter {
    async fn convert(&self, text: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        if let Some(hit) = self.cached(text) {
            return Ok(hit);
        }

        let converted = self.run_opencc(text).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(text.to_string(), converted.clone());
        }
        Ok(converted)
    }

    async fn check_availability(&self) -> Result<()> {
        self.run_opencc("测试").await.map_err(|e| SubocrError::MissingTool {
            tool: self.config.binary_path.clone(),
            reason: e.to_string(),
        })?;
        info!("opencc is available (profile {})", self.config.profile);
        Ok(())
    }
}

/// Factory for creating text converters
pub struct TextConverterFactory;

impl TextConverterFactory {
    pub fn create(config: &ConvertConfig) -> Arc<dyn TextConverter> {
        match config.mode {
            ConversionMode::None => Arc::new(IdentityConverter),
            ConversionMode::OpenCc => Arc::new(OpenCcConverter::new(config.clone())),
        }
    }
}
