// Text recognition backends
//
// The pipeline only needs lines of text with their bounding boxes, so every
// engine maps its own output onto `OcrLine`. Tesseract is the default backend.

pub mod tesseract;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use tesseract::*;

use crate::config::OcrConfig;
use crate::error::Result;

/// Axis-aligned box in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl BoundingBox {
    pub fn from_xywh(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// One recognized line of text
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    pub bbox: BoundingBox,
}

/// Main trait for OCR operations
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name used in logs
    fn name(&self) -> &'static str;

    /// Check that the engine can be executed
    async fn check_availability(&self) -> Result<()>;

    /// Recognize the lines of text in an image
    async fn recognize(&self, image_path: &Path) -> Result<Vec<OcrLine>>;
}

/// Factory for creating OCR engine instances
pub struct OcrEngineFactory;

impl OcrEngineFactory {
    /// Create the default engine (tesseract)
    pub fn create_default(config: &OcrConfig) -> Arc<dyn OcrEngine> {
        Arc::new(TesseractEngine::new(config.clone()))
    }
}

/// Trim, collapse whitespace runs and normalize the vertical bar look-alike
pub fn clean_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('丨', "｜")
}

/// Merge all recognized lines into one text and a centre position.
///
/// The position is the centre of the union of all line boxes, shifted by the
/// region offset into source-frame coordinates. Without usable lines the
/// result is an empty text at the origin.
pub fn pick_best_text_and_pos(lines: &[OcrLine], x_off: i64, y_off: i64) -> (String, (i64, i64)) {
    let mut texts = Vec::new();
    let mut bounds: Option<BoundingBox> = None;

    for line in lines {
        let text = clean_text(&line.text);
        if text.is_empty() {
            continue;
        }
        texts.push(text);
        bounds = Some(match bounds {
            Some(b) => b.union(&line.bbox),
            None => line.bbox,
        });
    }

    match bounds {
        Some(b) => {
            let cx = (b.left + b.right).div_euclid(2) + x_off;
            let cy = (b.top + b.bottom).div_euclid(2) + y_off;
            (texts.join(" ").trim().to_string(), (cx, cy))
        }
        None => (String::new(), (0, 0)),
    }
}
