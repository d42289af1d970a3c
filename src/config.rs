use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SubocrError};

fn default_ocr_workers() -> usize {
    4
}

fn default_min_confidence() -> f64 {
    30.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub ocr: OcrConfig,
    pub convert: ConvertConfig,
    pub output: OutputConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary; a bare name is looked up next to the executable first
    pub ffmpeg_path: String,
    /// Path to ffprobe binary; same lookup rules as ffmpeg
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path to tesseract binary
    pub binary_path: String,
    /// Tesseract language pack(s), e.g. "chi_sim" or "chi_sim+eng"
    pub language: String,
    /// Tesseract page segmentation mode (6 = single uniform block of text)
    pub page_segmentation_mode: u32,
    /// Words below this confidence (0-100) are dropped
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Number of frames recognized concurrently
    #[serde(default = "default_ocr_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConversionMode {
    /// Keep recognized text as is
    None,
    /// Pipe recognized text through the opencc CLI
    OpenCc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub mode: ConversionMode,
    /// Path to opencc binary
    pub binary_path: String,
    /// opencc profile, "s2t.json" converts simplified to traditional Chinese
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the video file stem to name the subtitle file
    pub suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub font_name: String,
    pub font_size: u32,
    /// ASS colour, &HAABBGGRR
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline: u32,
    pub shadow: u32,
    /// Numpad-style alignment, 2 = bottom centre
    pub alignment: u32,
    pub margin_v: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary_path: "tesseract".to_string(),
            language: "chi_sim".to_string(),
            page_segmentation_mode: 6,
            min_confidence: default_min_confidence(),
            workers: default_ocr_workers(),
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::None,
            binary_path: "opencc".to_string(),
            profile: "s2t.json".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_tc".to_string(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_name: "Microsoft JhengHei".to_string(),
            font_size: 44,
            primary_colour: "&H00FFFFFF".to_string(),
            outline_colour: "&H00000000".to_string(),
            outline: 2,
            shadow: 0,
            alignment: 2,
            margin_v: 20,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubocrError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubocrError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubocrError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.ocr.workers == 0 {
            return Err(SubocrError::Config("ocr.workers must be at least 1".to_string()));
        }
        if self.style.font_size == 0 {
            return Err(SubocrError::Config("style.font_size must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ocr]
            language = "chi_tra"
            workers = 2

            [convert]
            mode = "OpenCc"
            "#,
        )
        .unwrap();

        assert_eq!(config.ocr.language, "chi_tra");
        assert_eq!(config.ocr.workers, 2);
        assert_eq!(config.ocr.binary_path, "tesseract");
        assert_eq!(config.convert.mode, ConversionMode::OpenCc);
        assert_eq!(config.convert.profile, "s2t.json");
        assert_eq!(config.media.ffmpeg_path, "ffmpeg");
        assert_eq!(config.output.suffix, "_tc");
        assert_eq!(config.style.font_size, 44);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subocr.toml");

        let mut config = Config::default();
        config.style.font_name = "Noto Sans TC".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.style.font_name, "Noto Sans TC");
        assert_eq!(loaded.ocr.page_segmentation_mode, 6);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subocr.toml");
        std::fs::write(&path, "[ocr]\nworkers = 0\n").unwrap();

        assert!(matches!(Config::from_file(&path), Err(SubocrError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_keeps_parser_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subocr.toml");
        std::fs::write(&path, "[ocr\nworkers = \"many\"\n").unwrap();

        match Config::from_file(&path) {
            Err(SubocrError::Toml(e)) => assert!(!e.to_string().is_empty()),
            other => panic!("expected a TOML error, got {:?}", other.map(|_| ())),
        }
    }
}
