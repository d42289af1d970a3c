use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::ass::write_ass;
use crate::config::Config;
use crate::convert::{TextConverter, TextConverterFactory};
use crate::cues::{DetectionParams, Observation, detect_changes, fill_gaps, items_to_cues};
use crate::error::{Result, SubocrError};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait, VideoInfo};
use crate::ocr::{OcrEngine, OcrEngineFactory, pick_best_text_and_pos};
use crate::progress::{Stage, StageProgress};
use crate::roi::Roi;

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "avi", "webm"];

/// Which external tools a command relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolScope {
    /// ffmpeg and ffprobe
    Media,
    /// media tools, the OCR engine and the text converter
    All,
}

/// Outcome of a directory run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    ocr: Arc<dyn OcrEngine>,
    converter: Arc<dyn TextConverter>,
    progress: StageProgress,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let media = MediaProcessorFactory::create_processor(&config.media);
        let ocr = OcrEngineFactory::create_default(&config.ocr);
        let converter = TextConverterFactory::create(&config.convert);
        Ok(Self::with_backends(config, media, ocr, converter))
    }

    /// Assemble a workflow from explicit backends
    pub fn with_backends(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        ocr: Arc<dyn OcrEngine>,
        converter: Arc<dyn TextConverter>,
    ) -> Self {
        Self {
            config,
            media,
            ocr,
            converter,
            progress: StageProgress::silent(),
        }
    }

    pub fn with_progress(mut self, progress: StageProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Verify the external tools before touching any file
    pub async fn ensure_available(&self, scope: ToolScope) -> Result<()> {
        self.media.check_availability().await?;
        if scope == ToolScope::All {
            self.ocr.check_availability().await?;
            self.converter.check_availability().await?;
        }
        Ok(())
    }

    pub async fn probe<P: AsRef<Path>>(&self, video_path: P) -> Result<VideoInfo> {
        let video_path = video_path.as_ref();
        require_file(video_path)?;
        self.media.probe(video_path).await
    }

    /// Render a preview frame, outlining `roi` when given. Returns the clamped time used.
    pub async fn preview<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        seconds: f64,
        output_path: Q,
        roi: Option<&Roi>,
    ) -> Result<f64> {
        let video_path = video_path.as_ref();
        let info = self.probe(video_path).await?;
        let seconds = info.clamp_time(seconds);

        let outline = match roi {
            Some(roi) => Some(roi.clamp_to(info.width, info.height)?),
            None => None,
        };

        self.media
            .extract_preview_frame(video_path, output_path.as_ref(), seconds, outline.as_ref())
            .await?;
        Ok(seconds)
    }

    /// Subtitle path used when none is given: `<stem><suffix>.ass` beside the video
    pub fn default_output_path(&self, video_path: &Path) -> Result<PathBuf> {
        let stem = video_path
            .file_stem()
            .ok_or_else(|| SubocrError::Config("Invalid video filename".to_string()))?
            .to_string_lossy();
        Ok(video_path.with_file_name(format!("{}{}.ass", stem, self.config.output.suffix)))
    }

    /// Recognize the subtitles in `roi` and write them as an ASS file
    pub async fn process_video<P: AsRef<Path>>(
        &self,
        video_path: P,
        roi: &Roi,
        params: &DetectionParams,
        output_path: Option<&Path>,
        keep_frames: Option<&Path>,
    ) -> Result<PathBuf> {
        let video_path = video_path.as_ref();
        params.validate()?;
        require_file(video_path)?;

        let output_path = match output_path {
            Some(path) => path.to_path_buf(),
            None => self.default_output_path(video_path)?,
        };

        let info = self.media.probe(video_path).await?;
        let roi = roi.clamp_to(info.width, info.height)?;
        info!(
            "ROI: {}  |  fps={}  thr={}  hold={}  fill={}",
            roi, params.sample_fps, params.change_threshold, params.hold_gap, params.fill_gaps
        );

        // Stage 1: sample frames
        self.progress.begin(Stage::Extract);
        let temp_dir;
        let frames_dir = match keep_frames {
            Some(dir) => dir.to_path_buf(),
            None => {
                temp_dir = tempfile::tempdir()?;
                temp_dir.path().join("frames")
            }
        };
        let frames = self
            .media
            .extract_frames(video_path, &frames_dir, params.sample_fps, &roi)
            .await?;
        self.progress.update(Stage::Extract, 1.0, "Extracting frames… done");

        // Stage 2: OCR
        self.progress.begin(Stage::Ocr);
        let observations = recognize_frames(
            Arc::clone(&self.ocr),
            &frames,
            params.sample_fps,
            (roi.x as i64, roi.y as i64),
            self.config.ocr.workers,
            &self.progress,
        )
        .await?;

        let items = detect_changes(&observations, params.change_threshold, self.converter.as_ref()).await?;
        let mut cues = items_to_cues(&items, params.sample_fps, params.hold_gap);
        if params.fill_gaps > 0.0 {
            cues = fill_gaps(cues, params.fill_gaps);
        }
        info!("{} frames -> {} items -> {} cues", frames.len(), items.len(), cues.len());

        // Stage 3: write
        self.progress.begin(Stage::Write);
        write_ass(&cues, &output_path, info.width, info.height, &self.config.style).await?;
        self.progress.finish("Done");

        if let Some(dir) = keep_frames {
            info!("Frames kept in {}", dir.display());
        }

        Ok(output_path)
    }

    /// Process every video under `input_dir` with the same region and parameters
    pub async fn process_directory<P: AsRef<Path>>(
        &self,
        input_dir: P,
        roi: &Roi,
        params: &DetectionParams,
    ) -> Result<BatchSummary> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(SubocrError::Config(format!(
                "{} is not a directory",
                input_dir.display()
            )));
        }

        let videos = find_videos(input_dir);
        info!("Found {} video files to process", videos.len());

        let mut summary = BatchSummary::default();
        for video_path in videos {
            match self.process_video(&video_path, roi, params, None, None).await {
                Ok(output) => {
                    info!("Successfully processed: {}", video_path.display());
                    summary.written.push(output);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed.push((video_path, e.to_string()));
                }
            }
        }

        Ok(summary)
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SubocrError::FileNotFound(path.display().to_string()))
    }
}

/// Video files below `dir` in path order
pub fn find_videos(dir: &Path) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    videos.sort();
    videos
}

/// OCR sampled frames on a bounded worker pool, keeping frame order.
///
/// Frame `i` is stamped `i / sample_fps` seconds; positions are shifted by
/// `offset` into source-frame coordinates.
pub async fn recognize_frames(
    engine: Arc<dyn OcrEngine>,
    frames: &[PathBuf],
    sample_fps: f64,
    offset: (i64, i64),
    workers: usize,
    progress: &StageProgress,
) -> Result<Vec<Observation>> {
    let total = frames.len();
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    debug!("Recognizing {} frames with {} ({} workers)", total, engine.name(), workers);

    for (index, frame) in frames.iter().cloned().enumerate() {
        let engine = Arc::clone(&engine);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| SubocrError::Ocr(format!("Worker pool closed: {}", e)))?;
            let lines = engine.recognize(&frame).await?;
            Ok::<_, SubocrError>((index, lines))
        });
    }

    let mut slots: Vec<Option<Observation>> = vec![None; total];
    let mut done = 0;

    while let Some(joined) = tasks.join_next().await {
        let (index, lines) =
            joined.map_err(|e| SubocrError::Ocr(format!("OCR worker failed: {}", e)))??;

        let (text, pos) = pick_best_text_and_pos(&lines, offset.0, offset.1);
        slots[index] = Some(Observation {
            t: index as f64 / sample_fps,
            text,
            pos,
        });

        done += 1;
        progress.update(Stage::Ocr, done as f64 / total as f64, &format!("OCR frames… ({}/{})", done, total));
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let workflow = Workflow::new(Config::default()).unwrap();
        assert_eq!(
            workflow.default_output_path(Path::new("/videos/ep01.mp4")).unwrap(),
            PathBuf::from("/videos/ep01_tc.ass")
        );
    }

    #[test]
    fn test_find_videos() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("season1")).unwrap();
        for name in ["b.MKV", "a.mp4", "notes.txt", "season1/c.avi", "cover.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let videos = find_videos(dir.path());
        assert_eq!(
            videos,
            vec![
                dir.path().join("a.mp4"),
                dir.path().join("b.MKV"),
                dir.path().join("season1").join("c.avi"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_video_fails_before_probing() {
        let workflow = Workflow::new(Config::default()).unwrap();
        let result = workflow
            .process_video(
                "/no/such/video.mp4",
                &Roi::new(0, 0, 10, 10),
                &DetectionParams::default(),
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(SubocrError::FileNotFound(_))));
    }
}
