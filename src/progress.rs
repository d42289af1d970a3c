//! Overall progress across the pipeline stages.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Pipeline stage with its share of overall progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Ocr,
    Write,
}

impl Stage {
    /// Overall fraction at which the stage starts and ends
    pub fn span(&self) -> (f64, f64) {
        match self {
            Stage::Extract => (0.0, 0.10),
            Stage::Ocr => (0.10, 0.95),
            Stage::Write => (0.95, 1.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Extract => "Stage 1/3: Extracting frames",
            Stage::Ocr => "Stage 2/3: OCR",
            Stage::Write => "Stage 3/3: Writing ASS",
        }
    }

    /// Map progress within the stage onto overall progress
    pub fn overall(&self, fraction: f64) -> f64 {
        let (start, end) = self.span();
        start + (end - start) * fraction.clamp(0.0, 1.0)
    }
}

/// Receives overall progress in `[0, 1]` with a status message
pub trait ProgressReporter: Send + Sync {
    fn report(&self, overall: f64, message: &str);

    fn finish(&self, message: &str) {
        self.report(1.0, message);
    }
}

/// Stage-aware wrapper around a reporter
#[derive(Clone)]
pub struct StageProgress {
    reporter: Arc<dyn ProgressReporter>,
}

impl StageProgress {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { reporter }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(NoopReporter))
    }

    pub fn begin(&self, stage: Stage) {
        self.reporter.report(stage.overall(0.0), &format!("{}…", stage.label()));
    }

    pub fn update(&self, stage: Stage, fraction: f64, message: &str) {
        self.reporter.report(stage.overall(fraction), message);
    }

    pub fn finish(&self, message: &str) {
        self.reporter.finish(message);
    }
}

pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _overall: f64, _message: &str) {}
}

/// Terminal progress bar scaled to 0..=1000
pub struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(1000);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, overall: f64, message: &str) {
        self.bar.set_position((overall.clamp(0.0, 1.0) * 1000.0).round() as u64);
        self.bar.set_message(message.to_string());
    }

    fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(f64, String)>>);

    impl ProgressReporter for Recorder {
        fn report(&self, overall: f64, message: &str) {
            self.0.lock().unwrap().push((overall, message.to_string()));
        }
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(Stage::Extract.overall(1.0), 0.10);
        assert_eq!(Stage::Ocr.overall(0.0), 0.10);
        assert!((Stage::Ocr.overall(0.5) - 0.525).abs() < 1e-9);
        assert_eq!(Stage::Write.overall(2.0), 1.0);
    }

    #[test]
    fn test_stage_progress_reports_overall() {
        let recorder = Arc::new(Recorder::default());
        let progress = StageProgress::new(recorder.clone());

        progress.begin(Stage::Ocr);
        progress.update(Stage::Ocr, 1.0, "OCR frames… (4/4)");
        progress.finish("Done");

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], (0.10, "Stage 2/3: OCR…".to_string()));
        assert_eq!(events[1].0, 0.95);
        assert_eq!(events[2], (1.0, "Done".to_string()));
    }
}
