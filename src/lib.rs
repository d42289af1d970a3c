//! subocr - burned-in subtitle OCR
//!
//! Samples a region of a video with ffmpeg, recognizes the text in every
//! sampled frame with tesseract and writes the result as timed, positioned
//! ASS subtitles.

pub mod ass;
pub mod cli;
pub mod config;
pub mod convert;
pub mod cues;
pub mod error;
pub mod media;
pub mod ocr;
pub mod progress;
pub mod roi;
pub mod state;
pub mod workflow;
