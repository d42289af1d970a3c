use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{Result, SubocrError};
use super::{BoundingBox, OcrEngine, OcrLine};

/// TSV row level for single words
const WORD_LEVEL: u32 = 5;

/// Tesseract CLI engine, reading its TSV output
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn command_args(&self, image_path: &Path) -> Vec<String> {
        vec![
            image_path.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
            "--psm".to_string(),
            self.config.page_segmentation_mode.to_string(),
            "tsv".to_string(),
        ]
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| SubocrError::MissingTool {
                tool: self.config.binary_path.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SubocrError::MissingTool {
                tool: self.config.binary_path.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("tesseract is available (language {})", self.config.language);
        Ok(())
    }

    async fn recognize(&self, image_path: &Path) -> Result<Vec<OcrLine>> {
        let output = Command::new(&self.config.binary_path)
            .args(self.command_args(image_path))
            .output()
            .await
            .map_err(|e| SubocrError::Ocr(format!("Failed to execute tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubocrError::Ocr(format!(
                "tesseract failed on {}: {}",
                image_path.display(),
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let lines = parse_tsv(&tsv, self.config.min_confidence)?;
        debug!("{}: {} line(s)", image_path.display(), lines.len());
        Ok(lines)
    }
}

/// Group tesseract TSV word rows into lines.
///
/// Words with a confidence below `min_confidence` or blank text are skipped.
pub fn parse_tsv(tsv: &str, min_confidence: f64) -> Result<Vec<OcrLine>> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), (Vec<String>, BoundingBox)> = BTreeMap::new();

    for (row_no, row) in tsv.lines().enumerate() {
        if row.starts_with("level") || row.trim().is_empty() {
            continue;
        }

        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 11 {
            return Err(SubocrError::Ocr(format!(
                "Malformed tesseract TSV row {}: '{}'",
                row_no + 1,
                row
            )));
        }

        let num = |i: usize| -> Result<i64> {
            cols[i].trim().parse::<i64>().map_err(|_| {
                SubocrError::Ocr(format!("Bad number '{}' in TSV row {}", cols[i], row_no + 1))
            })
        };

        if num(0)? != WORD_LEVEL as i64 {
            continue;
        }

        let text = cols.get(11).copied().unwrap_or("").trim();
        let conf: f64 = cols[10].trim().parse().unwrap_or(-1.0);
        if text.is_empty() || conf < min_confidence {
            continue;
        }

        let key = (num(1)? as u32, num(2)? as u32, num(3)? as u32, num(4)? as u32);
        let bbox = BoundingBox::from_xywh(num(6)?, num(7)?, num(8)?, num(9)?);

        lines
            .entry(key)
            .and_modify(|(words, b)| {
                words.push(text.to_string());
                *b = b.union(&bbox);
            })
            .or_insert_with(|| (vec![text.to_string()], bbox));
    }

    Ok(lines
        .into_values()
        .map(|(words, bbox)| OcrLine {
            text: join_words(&words),
            bbox,
        })
        .collect())
}

/// Join words with spaces, except between two CJK characters
pub fn join_words(words: &[String]) -> String {
    let mut out = String::new();
    for word in words {
        let glue = match (out.chars().last(), word.chars().next()) {
            (None, _) => false,
            (Some(prev), Some(next)) => !(is_cjk(prev) && is_cjk(next)),
            (Some(_), None) => false,
        };
        if glue {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F     // CJK symbols and punctuation
        | 0x3040..=0x30FF   // kana
        | 0x3400..=0x4DBF   // extension A
        | 0x4E00..=0x9FFF   // unified ideographs
        | 0xAC00..=0xD7AF   // hangul
        | 0xF900..=0xFAFF   // compatibility ideographs
        | 0xFF00..=0xFFEF   // full-width forms
        | 0x20000..=0x2A6DF)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for row in rows {
            s.push('\n');
            s.push_str(row);
        }
        s
    }

    #[test]
    fn test_parse_groups_words_into_lines() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t120\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t10\t300\t40\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t40\t40\t91.5\t你",
            "5\t1\t1\t1\t1\t2\t52\t12\t40\t38\t88.0\t好",
            "5\t1\t1\t1\t1\t3\t100\t10\t90\t40\t95\tHello",
            "5\t1\t1\t1\t2\t1\t10\t60\t40\t40\t12\t噪",
            "5\t1\t1\t1\t2\t2\t60\t60\t40\t40\t80\t二",
        ]);

        let lines = parse_tsv(&input, 30.0).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "你好 Hello");
        assert_eq!(lines[0].bbox, BoundingBox { left: 10, top: 10, right: 190, bottom: 50 });
        assert_eq!(lines[1].text, "二");
    }

    #[test]
    fn test_parse_skips_blank_words_and_empty_output() {
        assert!(parse_tsv("", 0.0).unwrap().is_empty());
        assert!(parse_tsv(HEADER, 0.0).unwrap().is_empty());

        let input = tsv(&["5\t1\t1\t1\t1\t1\t0\t0\t5\t5\t90\t   "]);
        assert!(parse_tsv(&input, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_rows() {
        let input = tsv(&["5\t1\t1"]);
        assert!(matches!(parse_tsv(&input, 0.0), Err(SubocrError::Ocr(_))));
    }

    #[test]
    fn test_join_words() {
        let words: Vec<String> = ["我们", "走", "OK", "go", "，", "吧"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(join_words(&words), "我们走 OK go ，吧");
    }

    #[test]
    fn test_command_args() {
        let engine = TesseractEngine::new(OcrConfig::default());
        assert_eq!(
            engine.command_args(Path::new("f.png")),
            vec!["f.png", "stdout", "-l", "chi_sim", "--psm", "6", "tsv"]
        );
    }
}
