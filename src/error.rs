use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubocrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Text conversion error: {0}")]
    Convert(String),

    #[error("Invalid region of interest: {0}")]
    Roi(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No video stream found in {0}")]
    NoVideoStream(String),

    #[error("Required tool '{tool}' is not usable: {reason}")]
    MissingTool { tool: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SubocrError>;
