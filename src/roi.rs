use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SubocrError};

/// Smallest rectangle side, in preview pixels, accepted when selecting a region.
pub const MIN_SELECTION_SIZE: u32 = 5;

/// Rectangular region of a video frame, in source pixel coordinates.
///
/// Deserializes from either `{"x", "y", "width", "height"}` or an
/// `[x, y, w, h]` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoiRepr {
    Fields { x: u32, y: u32, width: u32, height: u32 },
    List([u32; 4]),
}

impl<'de> Deserialize<'de> for Roi {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match RoiRepr::deserialize(deserializer)? {
            RoiRepr::Fields { x, y, width, height } => Roi::new(x, y, width, height),
            RoiRepr::List([x, y, width, height]) => Roi::new(x, y, width, height),
        })
    }
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Intersect the region with a `frame_width` x `frame_height` frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Result<Roi> {
        let x2 = frame_width.min(self.x.saturating_add(self.width));
        let y2 = frame_height.min(self.y.saturating_add(self.height));

        if self.x >= x2 || self.y >= y2 {
            return Err(SubocrError::Roi(format!(
                "{} lies outside the {}x{} frame",
                self, frame_width, frame_height
            )));
        }

        Ok(Roi::new(self.x, self.y, x2 - self.x, y2 - self.y))
    }

    /// Map a rectangle dragged on a preview scaled by `scale` back to source pixels.
    ///
    /// Corners may come in any order. They are clamped to the preview bounds
    /// (`preview_width` x `preview_height`) and the selection is rejected when
    /// either side is smaller than [`MIN_SELECTION_SIZE`].
    pub fn from_corners(
        (x1, y1): (i64, i64),
        (x2, y2): (i64, i64),
        scale: f64,
        preview_width: u32,
        preview_height: u32,
    ) -> Result<Roi> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SubocrError::Roi(format!("invalid preview scale {}", scale)));
        }

        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));

        let cw = preview_width as i64;
        let ch = preview_height as i64;
        let (x1, x2) = (x1.clamp(0, cw), x2.clamp(0, cw));
        let (y1, y2) = (y1.clamp(0, ch), y2.clamp(0, ch));

        if x2 - x1 < MIN_SELECTION_SIZE as i64 || y2 - y1 < MIN_SELECTION_SIZE as i64 {
            return Err(SubocrError::Roi(
                "selection too small, drag a bigger rectangle".to_string(),
            ));
        }

        let ox1 = (x1 as f64 / scale) as u32;
        let oy1 = (y1 as f64 / scale) as u32;
        let ox2 = (x2 as f64 / scale) as u32;
        let oy2 = (y2 as f64 / scale) as u32;

        Ok(Roi::new(
            ox1,
            oy1,
            ox2.saturating_sub(ox1).max(1),
            oy2.saturating_sub(oy1).max(1),
        ))
    }

    /// ffmpeg `crop` filter selecting this region
    pub fn crop_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }

    /// ffmpeg `drawbox` filter outlining this region
    pub fn draw_filter(&self) -> String {
        format!(
            "drawbox=x={}:y={}:w={}:h={}:color=red:t=2",
            self.x, self.y, self.width, self.height
        )
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Roi {
    type Err = SubocrError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() != 4 {
            return Err(SubocrError::Roi(format!(
                "expected x,y,width,height but got '{}'",
                s
            )));
        }

        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| SubocrError::Roi(format!("'{}' is not a pixel value", part)))?;
        }

        let [x, y, width, height] = values;
        if width == 0 || height == 0 {
            return Err(SubocrError::Roi(format!("'{}' has an empty side", s)));
        }

        Ok(Roi::new(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roi() {
        let roi: Roi = "100, 900, 1720,120".parse().unwrap();
        assert_eq!(roi, Roi::new(100, 900, 1720, 120));
        assert_eq!(roi.to_string(), "100,900,1720,120");

        assert!("1,2,3".parse::<Roi>().is_err());
        assert!("1,2,-3,4".parse::<Roi>().is_err());
        assert!("1,2,0,4".parse::<Roi>().is_err());
    }

    #[test]
    fn test_clamp_to_frame() {
        let roi = Roi::new(100, 1000, 2000, 200);
        assert_eq!(roi.clamp_to(1920, 1080).unwrap(), Roi::new(100, 1000, 1820, 80));

        assert!(Roi::new(1920, 0, 10, 10).clamp_to(1920, 1080).is_err());
    }

    #[test]
    fn test_from_corners_scales_back() {
        // preview at half size, dragged right-to-left and bottom-to-top
        let roi = Roi::from_corners((600, 540), (100, 480), 0.5, 960, 540).unwrap();
        assert_eq!(roi, Roi::new(200, 960, 1000, 120));
    }

    #[test]
    fn test_from_corners_clamps_and_rejects_small() {
        let roi = Roi::from_corners((-20, -20), (50, 50), 1.0, 40, 40).unwrap();
        assert_eq!(roi, Roi::new(0, 0, 40, 40));

        assert!(Roi::from_corners((10, 10), (14, 100), 1.0, 200, 200).is_err());
        assert!(Roi::from_corners((10, 10), (100, 100), 0.0, 200, 200).is_err());
    }

    #[test]
    fn test_filters() {
        let roi = Roi::new(10, 20, 300, 40);
        assert_eq!(roi.crop_filter(), "crop=300:40:10:20");
        assert_eq!(roi.draw_filter(), "drawbox=x=10:y=20:w=300:h=40:color=red:t=2");
    }
}
