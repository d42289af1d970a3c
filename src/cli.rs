use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::roi::Roi;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Recognition parameters; anything omitted comes from the saved session
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Region to read subtitles from, as x,y,width,height
    #[arg(long)]
    pub roi: Option<Roi>,

    /// Frames sampled per second
    #[arg(long)]
    pub sample_fps: Option<f64>,

    /// Normalized edit distance below which text is treated as unchanged
    #[arg(long)]
    pub change_threshold: Option<f64>,

    /// Seconds a line stays visible after it was last seen
    #[arg(long)]
    pub hold_gap: Option<f64>,

    /// Close gaps between lines up to this many seconds (0 disables)
    #[arg(long)]
    pub fill_gaps: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show video dimensions and duration
    Probe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Render one frame with the saved region outlined
    Preview {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Position in seconds (defaults to the last preview time)
        #[arg(short, long)]
        time: Option<f64>,

        /// Output image
        #[arg(short, long, default_value = "_preview_frame.png")]
        output: PathBuf,

        /// Do not outline the saved region
        #[arg(long)]
        no_outline: bool,
    },

    /// Manage the saved subtitle region
    Roi {
        #[command(subcommand)]
        action: RoiAction,
    },

    /// Recognize subtitles in one video and write an ASS file
    Run {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file (defaults to <video stem>_tc.ass beside the video)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep sampled frames in this directory (earlier frame_*.png files are replaced)
        #[arg(long)]
        keep_frames: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Recognize subtitles in every video of a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },
}

#[derive(Subcommand)]
pub enum RoiAction {
    /// Save a region given in source pixels
    Set {
        /// x,y,width,height
        roi: Roi,
    },

    /// Save a region drawn on a scaled preview
    FromPreview {
        /// First corner on the preview, as x,y
        #[arg(long, value_parser = parse_point)]
        from: (i64, i64),

        /// Opposite corner on the preview, as x,y
        #[arg(long, value_parser = parse_point)]
        to: (i64, i64),

        /// Preview size divided by source size
        #[arg(long)]
        scale: f64,

        /// Preview width in pixels
        #[arg(long)]
        preview_width: u32,

        /// Preview height in pixels
        #[arg(long)]
        preview_height: u32,
    },

    /// Print the saved region
    Show,

    /// Forget the saved region
    Clear,
}

fn parse_point(s: &str) -> Result<(i64, i64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse().map_err(|_| format!("bad x in '{}'", s))?;
    let y = y.trim().parse().map_err(|_| format!("bad y in '{}'", s))?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_tuning() {
        let args = Args::try_parse_from([
            "subocr", "run", "-i", "ep01.mp4", "--roi", "0,900,1920,180", "--sample-fps", "5",
        ])
        .unwrap();

        match args.command {
            Commands::Run { input, tuning, output, .. } => {
                assert_eq!(input, PathBuf::from("ep01.mp4"));
                assert_eq!(tuning.roi, Some(Roi::new(0, 900, 1920, 180)));
                assert_eq!(tuning.sample_fps, Some(5.0));
                assert!(tuning.hold_gap.is_none());
                assert!(output.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_roi_from_preview() {
        let args = Args::try_parse_from([
            "subocr", "roi", "from-preview", "--from", "10,480", "--to", "950,530",
            "--scale", "0.5", "--preview-width", "960", "--preview-height", "540",
        ])
        .unwrap();

        match args.command {
            Commands::Roi { action: RoiAction::FromPreview { from, to, scale, .. } } => {
                assert_eq!(from, (10, 480));
                assert_eq!(to, (950, 530));
                assert_eq!(scale, 0.5);
            }
            _ => panic!("expected roi from-preview"),
        }
    }

    #[test]
    fn test_bad_roi_rejected() {
        assert!(Args::try_parse_from(["subocr", "roi", "set", "1,2,3"]).is_err());
    }
}
