//! Document assembly from extractor records
//!
//! Converts the raw per-page records handed over by the extraction
//! collaborator into reconstructed pages. Malformed segment records
//! disqualify their line only: the line is skipped with a diagnostic and
//! assembly of the rest of the page continues. Pages missing dimensions are
//! kept for scanning but flagged so that statistics can refuse them.

use crate::segment::{Line, PageRecord, SegmentRecord};
use crate::spacing::{reconstruct_line, ReconstructedLine, SpacingOptions};
use crate::LayoutError;

/// One reconstructed page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Page width in points. Zero when the record carried no usable value.
    pub width: f32,
    /// Page height in points. Zero when the record carried no usable value.
    pub height: f32,
    /// Lines in top-to-bottom extraction order.
    pub lines: Vec<ReconstructedLine>,
}

impl Page {
    /// Whether the page carried usable dimensions. Statistics require them;
    /// pattern scanning does not.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A full multi-page document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A line dropped during assembly, with the error that disqualified it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    pub page: u32,
    /// 0-based index of the line within its page record.
    pub line: usize,
    pub error: LayoutError,
}

/// Non-fatal problems found while assembling a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyDiagnostics {
    pub skipped_lines: Vec<SkippedLine>,
    /// Pages whose record was missing width or height.
    pub invalid_pages: Vec<u32>,
}

impl AssemblyDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.skipped_lines.is_empty() && self.invalid_pages.is_empty()
    }
}

/// Build a document from extractor records, reconstructing whitespace for
/// every line. Returns the document together with diagnostics for whatever
/// had to be skipped.
pub fn build_document(
    records: Vec<PageRecord>,
    options: &SpacingOptions,
) -> (Document, AssemblyDiagnostics) {
    let mut pages = Vec::with_capacity(records.len());
    let mut diagnostics = AssemblyDiagnostics::default();

    for (index, record) in records.into_iter().enumerate() {
        let number = record.number.unwrap_or(index as u32 + 1);

        let (width, height) = match (record.width, record.height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() => (w, h),
            _ => {
                log::warn!("page {number}: missing or invalid dimensions, statistics unavailable");
                diagnostics.invalid_pages.push(number);
                (0.0, 0.0)
            }
        };

        let mut lines = Vec::with_capacity(record.lines.len());
        for (line_index, segments) in record.lines.into_iter().enumerate() {
            match line_from_records(segments, number, line_index) {
                Ok(line) => lines.push(reconstruct_line(line, options)),
                Err(error) => {
                    log::warn!("skipping line: {error}");
                    diagnostics.skipped_lines.push(SkippedLine {
                        page: number,
                        line: line_index,
                        error,
                    });
                }
            }
        }

        pages.push(Page {
            number,
            width,
            height,
            lines,
        });
    }

    (Document { pages }, diagnostics)
}

/// Parse the extractor's JSON record stream and build a document from it.
pub fn document_from_json(
    json: &str,
    options: &SpacingOptions,
) -> Result<(Document, AssemblyDiagnostics), LayoutError> {
    let records: Vec<PageRecord> = serde_json::from_str(json)?;
    Ok(build_document(records, options))
}

fn line_from_records(
    records: Vec<SegmentRecord>,
    page: u32,
    line: usize,
) -> Result<Line, LayoutError> {
    let mut segments = Vec::with_capacity(records.len());
    for (segment_index, record) in records.into_iter().enumerate() {
        segments.push(record.into_segment(page, line, segment_index)?);
    }
    Ok(Line::new(segments))
}
