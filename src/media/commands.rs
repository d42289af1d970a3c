use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubocrError};
use crate::roi::Roi;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Seek before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds.max(0.0)))
    }

    /// Limit the number of video frames written
    pub fn video_frames(self, count: u32) -> Self {
        self.arg("-frames:v").arg(count.to_string())
    }

    /// Add video filter chain
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Execute the command, returning its stdout
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| SubocrError::Media(format!(
                "Failed to execute {}: {}",
                self.binary_path, e
            )))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubocrError::Media(format!(
                "{} failed: {} {}\n{}",
                self.description,
                self.binary_path,
                self.args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Builder for the ffmpeg and ffprobe invocations the pipeline needs
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build stream/format probe command (JSON on stdout)
    pub fn probe<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Video probe")
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .output(video_path)
    }

    /// Build single preview frame extraction, optionally outlining a region
    pub fn preview_frame<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: P,
        seconds: f64,
        outline: Option<&Roi>,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg_path, "Preview frame extraction")
            .overwrite()
            .seek(seconds)
            .input(video_path)
            .video_frames(1);

        if let Some(roi) = outline {
            cmd = cmd.video_filter(roi.draw_filter());
        }

        cmd.output(output_path)
    }

    /// Build frame sampling command writing `frame_%06d.png` into `frames_dir`
    pub fn sample_frames<P: AsRef<Path>>(
        &self,
        video_path: P,
        frames_dir: P,
        sample_fps: f64,
        roi: &Roi,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Frame sampling")
            .overwrite()
            .input(video_path)
            .video_filter(format!("fps={},{}", sample_fps, roi.crop_filter()))
            .output(frames_dir.as_ref().join("frame_%06d.png"))
    }

    /// Build version check command for ffmpeg
    pub fn ffmpeg_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "ffmpeg version check").arg("-version")
    }

    /// Build version check command for ffprobe
    pub fn ffprobe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "ffprobe version check").arg("-version")
    }
}
