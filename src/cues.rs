//! Turning per-frame recognitions into timed subtitle cues.

use tracing::debug;

use crate::convert::TextConverter;
use crate::error::{Result, SubocrError};

/// Tuning knobs for sampling and grouping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Frames sampled per second of video
    pub sample_fps: f64,
    /// Normalized edit distance below which two texts count as the same line
    pub change_threshold: f64,
    /// Seconds a cue stays on screen after its last sighting
    pub hold_gap: f64,
    /// Gaps between cues up to this many seconds are closed; 0 disables
    pub fill_gaps: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            sample_fps: 3.0,
            change_threshold: 0.18,
            hold_gap: 0.25,
            fill_gaps: 2.0,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_fps.is_finite() && self.sample_fps > 0.0) {
            return Err(SubocrError::Config(format!(
                "sample_fps must be positive, got {}",
                self.sample_fps
            )));
        }
        for (name, value) in [
            ("change_threshold", self.change_threshold),
            ("hold_gap", self.hold_gap),
            ("fill_gaps", self.fill_gaps),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SubocrError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Best text recognized in one sampled frame
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub t: f64,
    pub text: String,
    pub pos: (i64, i64),
}

/// Observation accepted by change detection
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub t: f64,
    /// Text as recognized
    pub source_text: String,
    /// Text after conversion
    pub text: String,
    pub pos: (i64, i64),
}

/// A timed, positioned subtitle line
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub pos: (i64, i64),
}

/// Character-level Levenshtein distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

/// Edit distance normalized by the longer text's length
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count()).max(1);
    levenshtein(a, b) as f64 / max_len as f64
}

/// Debounce OCR jitter: a text close to the previous one repeats the previous text.
///
/// Blank frames emit nothing and forget the previous text.
pub async fn detect_changes(
    observations: &[Observation],
    change_threshold: f64,
    converter: &dyn TextConverter,
) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut prev = String::new();

    for obs in observations {
        let text = obs.text.trim();
        if text.is_empty() {
            prev.clear();
            continue;
        }

        if !prev.is_empty() && levenshtein_ratio(&prev, text) < change_threshold {
            items.push(Item {
                t: obs.t,
                source_text: prev.clone(),
                text: converter.convert(&prev).await?,
                pos: obs.pos,
            });
        } else {
            items.push(Item {
                t: obs.t,
                source_text: text.to_string(),
                text: converter.convert(text).await?,
                pos: obs.pos,
            });
            prev = text.to_string();
        }
    }

    debug!("{} of {} observations carry text", items.len(), observations.len());
    Ok(items)
}

/// Merge runs of identical text into cues.
///
/// Items join the current cue while the text is unchanged and they follow
/// within one and a half sampling intervals.
pub fn items_to_cues(items: &[Item], sample_fps: f64, hold_gap: f64) -> Vec<Cue> {
    let Some(first) = items.first() else {
        return Vec::new();
    };

    let max_step = 1.5 / sample_fps;
    let mut cues = Vec::new();
    let mut text = first.text.clone();
    let mut start = first.t;
    let mut last_t = first.t;
    let mut positions = vec![first.pos];

    for item in &items[1..] {
        if item.text == text && item.t - last_t <= max_step {
            positions.push(item.pos);
            last_t = item.t;
            continue;
        }

        cues.push(Cue {
            start,
            end: last_t + hold_gap,
            text: std::mem::replace(&mut text, item.text.clone()),
            pos: median_pos(&positions),
        });
        start = item.t;
        last_t = item.t;
        positions = vec![item.pos];
    }

    cues.push(Cue {
        start,
        end: last_t + hold_gap,
        text,
        pos: median_pos(&positions),
    });
    cues
}

/// Upper median of x and of y, taken independently
fn median_pos(positions: &[(i64, i64)]) -> (i64, i64) {
    let mut xs: Vec<i64> = positions.iter().map(|p| p.0).collect();
    let mut ys: Vec<i64> = positions.iter().map(|p| p.1).collect();
    xs.sort_unstable();
    ys.sort_unstable();
    (xs[xs.len() / 2], ys[ys.len() / 2])
}

/// Sort cues by start, cut overlaps and close gaps of at most `max_gap` seconds
pub fn fill_gaps(mut cues: Vec<Cue>, max_gap: f64) -> Vec<Cue> {
    cues.sort_by(|a, b| a.start.total_cmp(&b.start));

    for i in 0..cues.len().saturating_sub(1) {
        let next_start = cues[i + 1].start;
        let gap = next_start - cues[i].end;
        if gap < 0.0 || (gap > 0.0 && gap <= max_gap) {
            cues[i].end = next_start;
        }
    }

    cues
}
