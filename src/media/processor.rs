use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, SubocrError};
use crate::roi::Roi;
use super::{MediaCommandBuilder, MediaProcessorTrait, VideoInfo, parse_probe_output};

/// ffmpeg/ffprobe backed media processor
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);
        Self { command_builder }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe(&self, video_path: &Path) -> Result<VideoInfo> {
        debug!("Probing {}", video_path.display());

        let json = self.command_builder.probe(video_path).execute().await?;
        let info = parse_probe_output(&json, &video_path.display().to_string())?;

        info!(
            "Video: {}  {}x{}  {:.1}s",
            video_path.display(),
            info.width,
            info.height,
            info.duration
        );
        Ok(info)
    }

    async fn extract_preview_frame(
        &self,
        video_path: &Path,
        output_path: &Path,
        seconds: f64,
        outline: Option<&Roi>,
    ) -> Result<()> {
        info!("Extracting preview frame at {:.1}s to {}", seconds, output_path.display());

        self.command_builder
            .preview_frame(video_path, output_path, seconds, outline)
            .execute()
            .await?;

        Ok(())
    }

    async fn extract_frames(
        &self,
        video_path: &Path,
        frames_dir: &Path,
        sample_fps: f64,
        roi: &Roi,
    ) -> Result<Vec<PathBuf>> {
        if !(sample_fps.is_finite() && sample_fps > 0.0) {
            return Err(SubocrError::Media(format!("Invalid sample rate {}", sample_fps)));
        }

        info!("Sampling {} at {} fps, region {}", video_path.display(), sample_fps, roi);

        fs::create_dir_all(frames_dir).await?;
        clear_frames(frames_dir).await?;

        self.command_builder
            .sample_frames(video_path, frames_dir, sample_fps, roi)
            .execute()
            .await?;

        let frames = list_frames(frames_dir).await?;
        info!("Extracted {} frames", frames.len());
        Ok(frames)
    }

    async fn check_availability(&self) -> Result<()> {
        for command in [
            self.command_builder.ffmpeg_version(),
            self.command_builder.ffprobe_version(),
        ] {
            command.execute().await.map_err(|e| SubocrError::MissingTool {
                tool: command.binary_path.clone(),
                reason: e.to_string(),
            })?;
        }

        info!("ffmpeg and ffprobe are available");
        Ok(())
    }
}

/// Names written by the `frame_%06d.png` sampling pattern
fn is_frame_file(path: &Path) -> bool {
    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    let is_sample = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("frame_"));
    is_png && is_sample && path.is_file()
}

/// Remove frames left over from an earlier run. Other files in `dir` stay.
pub async fn clear_frames(dir: &Path) -> Result<()> {
    let stale = list_frames(dir).await?;
    if !stale.is_empty() {
        debug!("Removing {} old frames from {}", stale.len(), dir.display());
    }
    for frame in stale {
        fs::remove_file(&frame).await?;
    }
    Ok(())
}

/// Sampled frames in `dir`, sorted by name
pub async fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_frame_file(&path) {
            frames.push(path);
        }
    }

    frames.sort();
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_frames_sorted_pngs_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_000010.png", "frame_000002.PNG", "notes.txt", "cover.png", "frame_000001.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let frames = list_frames(dir.path()).await.unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["frame_000001.png", "frame_000002.PNG", "frame_000010.png"]);
    }

    #[tokio::test]
    async fn test_invalid_sample_rate_rejected_before_any_work() {
        let processor = MediaProcessorImpl::new(MediaConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let frames_dir = dir.path().join("frames");

        let result = processor
            .extract_frames(Path::new("x.mp4"), &frames_dir, 0.0, &Roi::new(0, 0, 10, 10))
            .await;
        assert!(result.is_err());
        assert!(!frames_dir.exists());
    }

    #[tokio::test]
    async fn test_kept_directory_only_loses_old_frames() {
        let config = MediaConfig {
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
        };
        let processor = MediaProcessorImpl::new(config);
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("precious.txt"), b"keep me").unwrap();
        std::fs::write(dir.path().join("cover.png"), b"").unwrap();
        std::fs::write(dir.path().join("frame_000001.png"), b"").unwrap();

        let result = processor
            .extract_frames(Path::new("x.mp4"), dir.path(), 3.0, &Roi::new(0, 0, 10, 10))
            .await;
        assert!(matches!(result, Err(SubocrError::Media(_))));

        assert_eq!(std::fs::read(dir.path().join("precious.txt")).unwrap(), b"keep me");
        assert!(dir.path().join("cover.png").exists());
        assert!(!dir.path().join("frame_000001.png").exists());
    }

    #[tokio::test]
    async fn test_missing_kept_directory_is_created() {
        let config = MediaConfig {
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
        };
        let processor = MediaProcessorImpl::new(config);
        let dir = tempfile::tempdir().unwrap();
        let frames_dir = dir.path().join("nested").join("frames");

        let result = processor
            .extract_frames(Path::new("x.mp4"), &frames_dir, 3.0, &Roi::new(0, 0, 10, 10))
            .await;
        assert!(result.is_err());
        assert!(frames_dir.is_dir());
    }
}
