//! Session state remembered between runs: the last region, preview time and
//! the tuning parameters last used for recognition.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cues::DetectionParams;
use crate::roi::Roi;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub last_roi: Option<Roi>,
    pub preview_time_sec: f64,
    pub sample_fps: f64,
    pub change_threshold: f64,
    pub hold_gap: f64,
    pub fill_gaps: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        let params = DetectionParams::default();
        Self {
            last_roi: None,
            preview_time_sec: 30.0,
            sample_fps: params.sample_fps,
            change_threshold: params.change_threshold,
            hold_gap: params.hold_gap,
            fill_gaps: params.fill_gaps,
        }
    }
}

impl SessionState {
    pub fn params(&self) -> DetectionParams {
        DetectionParams {
            sample_fps: self.sample_fps,
            change_threshold: self.change_threshold,
            hold_gap: self.hold_gap,
            fill_gaps: self.fill_gaps,
        }
    }

    pub fn set_params(&mut self, params: &DetectionParams) {
        self.sample_fps = params.sample_fps;
        self.change_threshold = params.change_threshold;
        self.hold_gap = params.hold_gap;
        self.fill_gaps = params.fill_gaps;
    }
}

/// JSON-backed store for [`SessionState`]. Persistence is best effort.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `.subocr/state.json` under the current directory
    pub fn default_location() -> Self {
        let base = std::env::current_dir().unwrap_or_default();
        Self::new(base.join(".subocr").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved state, falling back to defaults when missing or unreadable
    pub fn load(&self) -> SessionState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No session state at {}: {}", self.path.display(), e);
                return SessionState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring unreadable session state {}: {}", self.path.display(), e);
                SessionState::default()
            }
        }
    }

    /// Save the state; failures are logged and swallowed
    pub fn save(&self, state: &SessionState) {
        if let Err(e) = self.try_save(state) {
            warn!("Failed to save session state {}: {}", self.path.display(), e);
        }
    }

    fn try_save(&self, state: &SessionState) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nope").join("state.json"));

        let state = store.load();
        assert_eq!(state, SessionState::default());
        assert_eq!(state.preview_time_sec, 30.0);
        assert_eq!(state.sample_fps, 3.0);
        assert!(state.last_roi.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join(".subocr").join("state.json"));

        let mut state = SessionState::default();
        state.last_roi = Some(Roi::new(0, 900, 1920, 180));
        state.change_threshold = 0.3;
        store.save(&state);

        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_partial_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);

        std::fs::write(&path, r#"{"hold_gap": 0.5}"#).unwrap();
        let state = store.load();
        assert_eq!(state.hold_gap, 0.5);
        assert_eq!(state.fill_gaps, 2.0);

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(store.load(), SessionState::default());
    }

    #[test]
    fn test_roi_saved_as_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"last_roi": [0, 900, 1920, 180], "sample_fps": 5.0}"#).unwrap();

        let state = StateStore::new(&path).load();
        assert_eq!(state.last_roi, Some(Roi::new(0, 900, 1920, 180)));
        assert_eq!(state.sample_fps, 5.0);

        std::fs::write(&path, r#"{"last_roi": [0, 900, 1920]}"#).unwrap();
        assert_eq!(StateStore::new(&path).load(), SessionState::default());
    }
}
