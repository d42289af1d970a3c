//! subocr - burned-in subtitle OCR
//!
//! Command line entry point: pick a subtitle region from a preview frame,
//! then turn the region's text into an ASS subtitle file.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subocr::cli::{Args, Commands, RoiAction, TuningArgs};
use subocr::config::Config;
use subocr::cues::DetectionParams;
use subocr::progress::{IndicatifReporter, StageProgress};
use subocr::roi::Roi;
use subocr::state::{SessionState, StateStore};
use subocr::workflow::{ToolScope, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None if std::path::Path::new("subocr.toml").exists() => Config::from_file("subocr.toml")?,
        None => Config::default(),
    };

    // Tools are checked before the log directory or saved state is touched
    let workflow = Workflow::new(config)?;
    if let Some(scope) = required_tools(&args.command) {
        workflow.ensure_available(scope).await?;
    }

    let _log_guard = setup_logging(args.verbose)?;
    info!("Starting subocr");

    let store = StateStore::default_location();
    let mut state = store.load();

    match args.command {
        Commands::Probe { input } => {
            let info = workflow.probe(&input).await?;
            println!("{}: {}x{}, {:.1}s", input.display(), info.width, info.height, info.duration);
        }

        Commands::Preview { input, time, output, no_outline } => {
            let requested = time.unwrap_or(state.preview_time_sec);
            let outline = if no_outline { None } else { state.last_roi };
            let used = workflow
                .preview(&input, requested, &output, outline.as_ref())
                .await?;

            state.preview_time_sec = used;
            store.save(&state);

            match outline {
                Some(roi) => println!("Preview at {:.1}s written to {} (region {})", used, output.display(), roi),
                None => println!("Preview at {:.1}s written to {}", used, output.display()),
            }
        }

        Commands::Roi { action } => handle_roi(action, &store, &mut state)?,

        Commands::Run { input, output, keep_frames, tuning } => {
            let (roi, params) = resolve_tuning(&tuning, &state)?;
            remember(&store, &mut state, roi, &params);

            let workflow = workflow.with_progress(StageProgress::new(Arc::new(IndicatifReporter::new())));
            let written = workflow
                .process_video(&input, &roi, &params, output.as_deref(), keep_frames.as_deref())
                .await
                .with_context(|| format!("OCR failed for {}", input.display()))?;
            println!("ASS generated: {}", written.display());
        }

        Commands::Batch { input_dir, tuning } => {
            let (roi, params) = resolve_tuning(&tuning, &state)?;
            remember(&store, &mut state, roi, &params);

            let summary = workflow.process_directory(&input_dir, &roi, &params).await?;
            for path in &summary.written {
                println!("ASS generated: {}", path.display());
            }
            for (path, reason) in &summary.failed {
                eprintln!("Failed: {}: {}", path.display(), reason);
            }
            if !summary.failed.is_empty() {
                bail!("{} of {} videos failed", summary.failed.len(), summary.failed.len() + summary.written.len());
            }
        }
    }

    Ok(())
}

/// External tools a command needs; `None` for commands that only edit saved state
fn required_tools(command: &Commands) -> Option<ToolScope> {
    match command {
        Commands::Probe { .. } | Commands::Preview { .. } => Some(ToolScope::Media),
        Commands::Run { .. } | Commands::Batch { .. } => Some(ToolScope::All),
        Commands::Roi { .. } => None,
    }
}

fn handle_roi(action: RoiAction, store: &StateStore, state: &mut SessionState) -> Result<()> {
    match action {
        RoiAction::Set { roi } => {
            state.last_roi = Some(roi);
            store.save(state);
            println!("ROI saved: {}", roi);
        }
        RoiAction::FromPreview { from, to, scale, preview_width, preview_height } => {
            let roi = Roi::from_corners(from, to, scale, preview_width, preview_height)?;
            state.last_roi = Some(roi);
            store.save(state);
            println!("ROI saved: {}", roi);
        }
        RoiAction::Show => match state.last_roi {
            Some(roi) => println!("{}", roi),
            None => println!("No saved ROI (store: {})", store.path().display()),
        },
        RoiAction::Clear => {
            state.last_roi = None;
            store.save(state);
            println!("ROI cleared");
        }
    }
    Ok(())
}

/// Merge command line tuning over the saved session
fn resolve_tuning(tuning: &TuningArgs, state: &SessionState) -> Result<(Roi, DetectionParams)> {
    let Some(roi) = tuning.roi.or(state.last_roi) else {
        bail!("No ROI given and none saved. Render a preview and save a region with `subocr roi set x,y,w,h`.");
    };

    let saved = state.params();
    let params = DetectionParams {
        sample_fps: tuning.sample_fps.unwrap_or(saved.sample_fps),
        change_threshold: tuning.change_threshold.unwrap_or(saved.change_threshold),
        hold_gap: tuning.hold_gap.unwrap_or(saved.hold_gap),
        fill_gaps: tuning.fill_gaps.unwrap_or(saved.fill_gaps),
    };
    params.validate()?;

    Ok((roi, params))
}

fn remember(store: &StateStore, state: &mut SessionState, roi: Roi, params: &DetectionParams) {
    state.last_roi = Some(roi);
    state.set_params(params);
    store.save(state);
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".subocr").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotated file log next to the session state
    let file_appender = rolling::daily(&log_dir, "subocr.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
