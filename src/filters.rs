//! Edit requests and their translation into engine stages.
//!
//! A request may combine a temporal cut with any of crop, rotate and rescale.
//! The cut runs as its own stream-copy pass so the trim never costs quality.
//! The spatial edits are folded into one filter graph, always ordered
//! crop → rotate → scale: crop coordinates refer to the source axes, which a
//! quarter-turn rotation would swap.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ReelcutError};
use crate::metadata::MediaMetadata;

/// Keep the span `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutSpec {
    pub start: f64,
    pub end: f64,
}

impl CutSpec {
    /// Whole-clip cuts are no-ops. Compared on whole seconds.
    pub fn spans_whole_clip(&self, duration: Option<f64>) -> bool {
        match duration {
            Some(duration) => self.start == 0.0 && self.end.trunc() == duration.trunc(),
            None => false,
        }
    }
}

/// Rectangle of `width`x`height` with its top-left corner at (`x`, `y`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSpec {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropSpec {
    /// Shrink to the source frame. Never grows either side.
    pub fn clamped_to(&self, source_width: u32, source_height: u32) -> CropSpec {
        CropSpec {
            width: self.width.min(source_width),
            height: self.height.min(source_height),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateSpec {
    pub degree: i32,
}

impl RotateSpec {
    pub fn rotation(&self) -> Rotation {
        Rotation::from_degrees(self.degree)
    }

    /// Only whole turns are no-ops. A request that quantizes to no transpose
    /// is still an edit.
    pub fn is_full_turn(&self) -> bool {
        self.degree.rem_euclid(360) == 0
    }
}

/// Target output width in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySpec {
    pub quality: u32,
}

/// Clockwise rotation quantized to quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Clockwise90,
    Half,
    CounterClockwise90,
}

impl Rotation {
    /// Nearest quarter turn; exact halves round up (45 → 90, 315 → 0).
    pub fn from_degrees(degree: i32) -> Self {
        let normalized = degree.rem_euclid(360);
        match ((normalized + 45) / 90) % 4 {
            0 => Rotation::None,
            1 => Rotation::Clockwise90,
            2 => Rotation::Half,
            _ => Rotation::CounterClockwise90,
        }
    }

    /// Transpose steps that realize this rotation
    pub fn transposes(&self) -> Vec<Transpose> {
        match self {
            Rotation::None => vec![],
            Rotation::Clockwise90 => vec![Transpose::Clockwise],
            Rotation::Half => vec![Transpose::Clockwise, Transpose::Clockwise],
            Rotation::CounterClockwise90 => vec![Transpose::CounterClockwise],
        }
    }
}

/// ffmpeg `transpose` directions used for rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    Clockwise,
    CounterClockwise,
}

impl Transpose {
    pub fn inverse(&self) -> Transpose {
        match self {
            Transpose::Clockwise => Transpose::CounterClockwise,
            Transpose::CounterClockwise => Transpose::Clockwise,
        }
    }
}

/// One sub-expression of the filter graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Crop(CropSpec),
    Transpose(Transpose),
    /// Width-driven rescale, height follows the aspect ratio
    Scale { width: u32 },
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Crop(crop) => write!(f, "crop={}:{}:{}:{}", crop.width, crop.height, crop.x, crop.y),
            FilterOp::Transpose(Transpose::Clockwise) => write!(f, "transpose=1"),
            FilterOp::Transpose(Transpose::CounterClockwise) => write!(f, "transpose=2"),
            // -2 keeps the derived height divisible by two
            FilterOp::Scale { width } => write!(f, "scale={}:-2", width),
        }
    }
}

/// Ordered filter graph applied in a single re-encoding pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGraph {
    ops: Vec<FilterOp>,
}

impl FilterGraph {
    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn expression(&self) -> String {
        self.ops
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

/// Stream-copy trim pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutStage {
    pub start: f64,
    pub length: f64,
}

/// Everything a caller may ask for in one edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    pub cut: Option<CutSpec>,
    pub crop: Option<CropSpec>,
    pub rotate: Option<RotateSpec>,
    pub quality: Option<QualitySpec>,
}

impl EditRequest {
    /// Reject requests no engine invocation could satisfy
    pub fn validate(&self) -> Result<()> {
        if let Some(cut) = &self.cut {
            if !cut.start.is_finite() || !cut.end.is_finite() {
                return Err(ReelcutError::InvalidEditRequest("cut bounds must be finite".to_string()));
            }
            if cut.start < 0.0 {
                return Err(ReelcutError::InvalidEditRequest(format!(
                    "cut start must not be negative, got {}",
                    cut.start
                )));
            }
            if cut.end <= cut.start {
                return Err(ReelcutError::InvalidEditRequest(format!(
                    "cut end ({}) must be after start ({})",
                    cut.end, cut.start
                )));
            }
        }
        if let Some(crop) = &self.crop {
            if crop.width == 0 || crop.height == 0 {
                return Err(ReelcutError::InvalidEditRequest(format!(
                    "crop dimensions must be positive, got {}x{}",
                    crop.width, crop.height
                )));
            }
        }
        if let Some(quality) = &self.quality {
            if quality.quality == 0 {
                return Err(ReelcutError::InvalidEditRequest("quality width must be positive".to_string()));
            }
        }
        Ok(())
    }
}

/// Outcome of composing a request against the source metadata
#[derive(Debug, Clone, PartialEq)]
pub struct EditPlan {
    pub needs_edit: bool,
    pub cut_stage: Option<CutStage>,
    pub filter_graph: Option<FilterGraph>,
}

impl EditPlan {
    fn passthrough() -> Self {
        Self {
            needs_edit: false,
            cut_stage: None,
            filter_graph: None,
        }
    }

    pub fn filter_expression(&self) -> Option<String> {
        self.filter_graph.as_ref().map(|graph| graph.expression())
    }
}

/// Decide whether `request` changes anything and build the stages if so
pub fn compose(metadata: &MediaMetadata, request: &EditRequest) -> Result<EditPlan> {
    request.validate()?;

    let cut_stage = request
        .cut
        .filter(|cut| !cut.spans_whole_clip(metadata.duration))
        .map(|cut| CutStage {
            start: cut.start,
            length: cut.end - cut.start,
        });
    let rotation = request
        .rotate
        .map(|rotate| rotate.rotation())
        .unwrap_or(Rotation::None);

    let needs_edit = cut_stage.is_some()
        || request.crop.is_some()
        || request.rotate.is_some_and(|rotate| !rotate.is_full_turn())
        || request.quality.is_some();
    if !needs_edit {
        return Ok(EditPlan::passthrough());
    }

    let mut ops = Vec::new();
    if let Some(crop) = &request.crop {
        let (width, height) = metadata.dimensions().ok_or_else(|| {
            ReelcutError::InvalidEditRequest("cannot crop media without known video dimensions".to_string())
        })?;
        ops.push(FilterOp::Crop(crop.clamped_to(width, height)));
    }
    ops.extend(rotation.transposes().into_iter().map(FilterOp::Transpose));
    if let Some(quality) = &request.quality {
        ops.push(FilterOp::Scale { width: quality.quality });
    }

    let filter_graph = if ops.is_empty() { None } else { Some(FilterGraph { ops }) };

    Ok(EditPlan {
        needs_edit,
        cut_stage,
        filter_graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MediaMetadata {
        MediaMetadata {
            width: Some(1280),
            height: Some(720),
            duration: Some(10.4),
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            size: 1_000_000,
            ..MediaMetadata::default()
        }
    }

    #[test]
    fn test_empty_request_is_passthrough() {
        let plan = compose(&source(), &EditRequest::default()).unwrap();
        assert!(!plan.needs_edit);
        assert!(plan.cut_stage.is_none());
        assert!(plan.filter_graph.is_none());
    }

    #[test]
    fn test_whole_clip_cut_is_passthrough() {
        let request = EditRequest {
            cut: Some(CutSpec { start: 0.0, end: 10.9 }),
            ..Default::default()
        };
        assert!(!compose(&source(), &request).unwrap().needs_edit);
    }

    #[test]
    fn test_full_turn_rotation_is_passthrough() {
        for degree in [0, 360, -360, 720] {
            let request = EditRequest {
                rotate: Some(RotateSpec { degree }),
                ..Default::default()
            };
            assert!(!compose(&source(), &request).unwrap().needs_edit, "degree {}", degree);
        }
    }

    #[test]
    fn test_small_rotation_is_edit_without_filter() {
        for degree in [10, 44, -20, 315] {
            let request = EditRequest {
                rotate: Some(RotateSpec { degree }),
                ..Default::default()
            };
            let plan = compose(&source(), &request).unwrap();
            assert!(plan.needs_edit, "degree {}", degree);
            assert!(plan.cut_stage.is_none());
            assert!(plan.filter_graph.is_none(), "degree {}", degree);
        }
    }

    #[test]
    fn test_partial_cut_builds_stream_copy_stage() {
        let request = EditRequest {
            cut: Some(CutSpec { start: 1.5, end: 6.0 }),
            ..Default::default()
        };
        let plan = compose(&source(), &request).unwrap();

        assert!(plan.needs_edit);
        assert_eq!(plan.cut_stage, Some(CutStage { start: 1.5, length: 4.5 }));
        assert!(plan.filter_graph.is_none());
    }

    #[test]
    fn test_trivial_cut_is_dropped_when_other_edits_exist() {
        let request = EditRequest {
            cut: Some(CutSpec { start: 0.0, end: 10.0 }),
            quality: Some(QualitySpec { quality: 640 }),
            ..Default::default()
        };
        let plan = compose(&source(), &request).unwrap();

        assert!(plan.cut_stage.is_none());
        assert_eq!(plan.filter_expression().as_deref(), Some("scale=640:-2"));
    }

    #[test]
    fn test_cut_without_known_duration_is_applied() {
        let metadata = MediaMetadata {
            duration: None,
            ..source()
        };
        let request = EditRequest {
            cut: Some(CutSpec { start: 0.0, end: 10.0 }),
            ..Default::default()
        };
        assert!(compose(&metadata, &request).unwrap().cut_stage.is_some());
    }

    #[test]
    fn test_filter_order_is_crop_rotate_scale() {
        let request = EditRequest {
            cut: None,
            crop: Some(CropSpec { width: 640, height: 360, x: 10, y: 20 }),
            rotate: Some(RotateSpec { degree: 90 }),
            quality: Some(QualitySpec { quality: 480 }),
        };
        let plan = compose(&source(), &request).unwrap();

        assert_eq!(
            plan.filter_expression().as_deref(),
            Some("crop=640:360:10:20,transpose=1,scale=480:-2")
        );
    }

    #[test]
    fn test_oversized_crop_clamps_to_source() {
        let request = EditRequest {
            crop: Some(CropSpec { width: 4000, height: 3000, x: 0, y: 0 }),
            ..Default::default()
        };
        let plan = compose(&source(), &request).unwrap();
        assert_eq!(plan.filter_expression().as_deref(), Some("crop=1280:720:0:0"));

        for (width, height) in [(1, 1), (1280, 720), (1281, 10), (10, 721), (u32::MAX, u32::MAX)] {
            let clamped = CropSpec { width, height, x: 5, y: 5 }.clamped_to(1280, 720);
            assert!(clamped.width <= 1280 && clamped.height <= 720);
            assert_eq!(clamped.width, width.min(1280));
            assert_eq!(clamped.height, height.min(720));
            assert_eq!((clamped.x, clamped.y), (5, 5));
        }
    }

    #[test]
    fn test_crop_without_video_dimensions_is_rejected() {
        let metadata = MediaMetadata {
            width: None,
            height: None,
            ..source()
        };
        let request = EditRequest {
            crop: Some(CropSpec { width: 10, height: 10, x: 0, y: 0 }),
            ..Default::default()
        };
        assert!(matches!(
            compose(&metadata, &request),
            Err(ReelcutError::InvalidEditRequest(_))
        ));
    }

    #[test]
    fn test_rotation_classes() {
        assert_eq!(Rotation::from_degrees(90), Rotation::Clockwise90);
        assert_eq!(Rotation::from_degrees(180), Rotation::Half);
        assert_eq!(Rotation::from_degrees(270), Rotation::CounterClockwise90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::CounterClockwise90);
        assert_eq!(Rotation::from_degrees(45), Rotation::Clockwise90);
        assert_eq!(Rotation::from_degrees(135), Rotation::Half);
        assert_eq!(Rotation::from_degrees(225), Rotation::CounterClockwise90);
        assert_eq!(Rotation::from_degrees(315), Rotation::None);
        assert_eq!(Rotation::from_degrees(44), Rotation::None);
    }

    #[test]
    fn test_rotation_invariant_under_full_turns() {
        for degree in -720..=720 {
            assert_eq!(Rotation::from_degrees(degree), Rotation::from_degrees(degree + 360));
        }
    }

    #[test]
    fn test_quarter_turns_are_inverse_and_half_is_double_quarter() {
        let cw = Rotation::Clockwise90.transposes();
        let ccw = Rotation::CounterClockwise90.transposes();
        assert_eq!(cw.len(), 1);
        assert_eq!(ccw, vec![cw[0].inverse()]);
        assert_eq!(Rotation::Half.transposes(), [cw.clone(), cw].concat());

        let request = EditRequest {
            rotate: Some(RotateSpec { degree: 180 }),
            ..Default::default()
        };
        let plan = compose(&source(), &request).unwrap();
        assert_eq!(plan.filter_expression().as_deref(), Some("transpose=1,transpose=1"));
    }

    #[test]
    fn test_invalid_requests_rejected() {
        let cases = [
            EditRequest { cut: Some(CutSpec { start: 5.0, end: 5.0 }), ..Default::default() },
            EditRequest { cut: Some(CutSpec { start: -1.0, end: 5.0 }), ..Default::default() },
            EditRequest { cut: Some(CutSpec { start: 0.0, end: f64::NAN }), ..Default::default() },
            EditRequest { crop: Some(CropSpec { width: 0, height: 10, x: 0, y: 0 }), ..Default::default() },
            EditRequest { quality: Some(QualitySpec { quality: 0 }), ..Default::default() },
        ];
        for request in cases {
            assert!(matches!(
                compose(&source(), &request),
                Err(ReelcutError::InvalidEditRequest(_))
            ));
        }
    }
}
