// Media access through ffmpeg and ffprobe
//
// - Processor: probe, preview and frame sampling on top of the command builder
// - Commands: command builders and abstractions

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::{Result, SubocrError};
use crate::roi::Roi;

/// Dimensions and length of the first video stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

impl VideoInfo {
    /// Clamp a preview time into the playable range
    pub fn clamp_time(&self, seconds: f64) -> f64 {
        seconds.min((self.duration - 0.1).max(0.0)).max(0.0)
    }
}

/// Main trait for media operations
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Read stream dimensions and duration
    async fn probe(&self, video_path: &Path) -> Result<VideoInfo>;

    /// Write one frame at `seconds` to `output_path`, optionally outlining a region
    async fn extract_preview_frame(
        &self,
        video_path: &Path,
        output_path: &Path,
        seconds: f64,
        outline: Option<&Roi>,
    ) -> Result<()>;

    /// Sample `roi` at `sample_fps` into numbered PNGs; returns them in frame order
    async fn extract_frames(
        &self,
        video_path: &Path,
        frames_dir: &Path,
        sample_fps: f64,
        roi: &Roi,
    ) -> Result<Vec<PathBuf>>;

    /// Check that the media tools can be executed
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the ffmpeg-based processor, resolving bundled binaries
    pub fn create_processor(config: &MediaConfig) -> Box<dyn MediaProcessorTrait> {
        let resolved = MediaConfig {
            ffmpeg_path: resolve_binary(&config.ffmpeg_path),
            ffprobe_path: resolve_binary(&config.ffprobe_path),
        };
        Box::new(processor::MediaProcessorImpl::new(resolved))
    }
}

/// Resolve a configured tool name, preferring a copy shipped next to the executable.
///
/// Paths (anything with a separator) are returned unchanged.
pub fn resolve_binary(configured: &str) -> String {
    if Path::new(configured).components().count() != 1 {
        return configured.to_string();
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    match exe_dir.and_then(|dir| locate_beside(&dir, configured)) {
        Some(bundled) => {
            debug!("Using bundled {}", bundled.display());
            bundled.to_string_lossy().to_string()
        }
        None => configured.to_string(),
    }
}

/// Find `<name>.exe` or `<name>` inside `dir`
pub fn locate_beside(dir: &Path, name: &str) -> Option<PathBuf> {
    [format!("{}.exe", name), name.to_string()]
        .into_iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output
pub fn parse_probe_output(json: &str, source: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SubocrError::NoVideoStream(source.to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(SubocrError::Media(format!(
                "Video stream of {} has no dimensions",
                source
            )));
        }
    };

    let duration = probe
        .format
        .duration
        .as_deref()
        .or(stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| SubocrError::Media(format!("Unknown duration for {}", source)))?;

    Ok(VideoInfo { width, height, duration })
}
