//! Segment and line geometry
//!
//! The extraction collaborator hands over text as flat records: per page, an
//! ordered list of lines, each line an ordered list of segments with a
//! bounding box, font name, and font size. Coordinates are in page points
//! with y increasing downward. This module models those records and their
//! validated in-memory form.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::LayoutError;

/// A typographic run: a stretch of text sharing one font and size, with its
/// bounding box in page coordinates.
///
/// Segments are produced once by the extractor and never mutated afterward;
/// reconstruction derives new data from them instead of rewriting geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    /// Text content. May be empty or whitespace-only.
    pub text: String,
    /// Left edge in points.
    pub x0: f32,
    /// Right edge in points.
    pub x1: f32,
    /// Top edge in points (y increases downward).
    pub top: f32,
    /// Bottom edge in points.
    pub bottom: f32,
    /// Font name as reported by the extractor.
    pub font: String,
    /// Raw font size in points.
    pub size: f32,
}

impl TextSegment {
    /// Font size rounded to the nearest 0.5pt.
    pub fn rounded_size(&self) -> f32 {
        (self.size * 2.0).round() / 2.0
    }

    /// A content segment carries visible text. Segments whose stripped text
    /// is empty are positional-only: their bounding box still contributes to
    /// gap measurement between neighboring content segments.
    pub fn is_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Derived bounding box of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

/// An ordered sequence of segments sharing one baseline.
///
/// Construction restores ascending-x0 order, which reconstruction relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    segments: Vec<TextSegment>,
}

impl Line {
    pub fn new(mut segments: Vec<TextSegment>) -> Self {
        segments.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));
        Self { segments }
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Bounding box spanning all segments: min x0, max x1, min top,
    /// max bottom. `None` for a line with no segments.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let first = self.segments.first()?;
        let mut bbox = BoundingBox {
            x0: first.x0,
            x1: first.x1,
            top: first.top,
            bottom: first.bottom,
        };
        for seg in &self.segments[1..] {
            bbox.x0 = bbox.x0.min(seg.x0);
            bbox.x1 = bbox.x1.max(seg.x1);
            bbox.top = bbox.top.min(seg.top);
            bbox.bottom = bbox.bottom.max(seg.bottom);
        }
        Some(bbox)
    }
}

/// Raw segment record as delivered by the extraction collaborator.
///
/// Geometry fields are optional so that a malformed record surfaces as a
/// diagnosed [`LayoutError::MalformedSegment`] carrying its position instead
/// of aborting deserialization of the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentRecord {
    /// Absent text is treated as empty.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub x0: Option<f32>,
    #[serde(default)]
    pub x1: Option<f32>,
    #[serde(default)]
    pub top: Option<f32>,
    #[serde(default)]
    pub bottom: Option<f32>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub size: Option<f32>,
}

impl SegmentRecord {
    /// Validate into a [`TextSegment`]. The page number and line/segment
    /// indices locate the offending record in error messages.
    pub fn into_segment(
        self,
        page: u32,
        line: usize,
        segment: usize,
    ) -> Result<TextSegment, LayoutError> {
        Ok(TextSegment {
            text: self.text.unwrap_or_default(),
            x0: required(self.x0, "x0", page, line, segment)?,
            x1: required(self.x1, "x1", page, line, segment)?,
            top: required(self.top, "top", page, line, segment)?,
            bottom: required(self.bottom, "bottom", page, line, segment)?,
            font: self.font.unwrap_or_default(),
            size: required(self.size, "size", page, line, segment)?,
        })
    }
}

fn required(
    value: Option<f32>,
    field: &str,
    page: u32,
    line: usize,
    segment: usize,
) -> Result<f32, LayoutError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(LayoutError::MalformedSegment {
            page,
            line,
            segment,
            reason: format!("non-finite `{field}`"),
        }),
        None => Err(LayoutError::MalformedSegment {
            page,
            line,
            segment,
            reason: format!("missing `{field}`"),
        }),
    }
}

/// One page of extractor output: dimensions plus per-line segment records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRecord {
    /// 1-based page number. Defaults to the record's position when absent.
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub lines: Vec<Vec<SegmentRecord>>,
}
