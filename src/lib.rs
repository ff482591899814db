//! Text layout reconstruction and structural scanning for paginated documents
//!
//! This crate consumes geometry-only text fragments produced by an upstream
//! extractor and provides:
//! - Whitespace reconstruction from segment bounding boxes (`spacing`)
//! - Per-page and per-document layout statistics: margins, spacing
//!   histograms, font usage, running headers/footers (`statistics`)
//! - An ordered catalog of structural patterns with declaration-order
//!   tie-breaking (`patterns`)
//! - Document-wide pattern scanning with aggregate statistics and body-font
//!   inference (`scanner`)
//!
//! It performs no document parsing, no file I/O, and no semantic analysis;
//! those belong to the surrounding pipeline.

pub mod document;
pub mod patterns;
pub mod scanner;
pub mod segment;
pub mod spacing;
pub mod statistics;

pub use document::{
    build_document, document_from_json, AssemblyDiagnostics, Document, Page, SkippedLine,
};
pub use patterns::{CatalogError, PatternCatalog, PatternCategory, PatternRecord};
pub use scanner::{
    classify_line, format_for_llm_analysis, scan_document, LlmAnalysisInput, Match, ScanResult,
};
pub use segment::{BoundingBox, Line, PageRecord, SegmentRecord, TextSegment};
pub use spacing::{reconstruct_line, ReconstructedLine, SpacingEvent, SpacingOptions};
pub use statistics::{
    detect_running_lines, document_margins, histogram_for_document, histogram_for_page,
    page_margins, page_regions, LayoutRegion, PageMargins, RunningLine, RunningLineKind,
    SpacingHistogram, StatisticsOptions,
};

/// Errors raised while validating extractor input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// A segment record is missing or carries an unusable required field.
    /// Localized to one line; assembly of the rest of the page continues.
    #[error("page {page} line {line} segment {segment}: {reason}")]
    MalformedSegment {
        page: u32,
        line: usize,
        segment: usize,
        reason: String,
    },
    /// A page record is structurally unusable for statistics.
    #[error("page {page}: {reason}")]
    InvalidStructure { page: u32, reason: String },
    /// The input record stream could not be parsed.
    #[error("input parsing error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        LayoutError::Parse(e.to_string())
    }
}

/// Full analysis of one document: reconstruction, layout statistics, and a
/// pattern scan, with the diagnostics accumulated along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub scan: ScanResult,
    pub margins: Vec<(u32, PageMargins)>,
    pub running_lines: Vec<RunningLine>,
    pub diagnostics: AssemblyDiagnostics,
}

/// Reconstruct a document from extractor records and analyze it.
///
/// The catalog is supplied by the caller; `PatternCatalog::default_catalog()`
/// is the stock choice. Malformed lines and dimension-less pages are
/// reported in `diagnostics`, never silently dropped.
pub fn analyze_records(
    records: Vec<PageRecord>,
    catalog: &PatternCatalog,
    spacing_options: &SpacingOptions,
    statistics_options: &StatisticsOptions,
) -> AnalysisResult {
    let (document, diagnostics) = build_document(records, spacing_options);
    let scan = scan_document(catalog, &document);
    let margins = document_margins(&document);
    let running_lines = detect_running_lines(&document, statistics_options);
    AnalysisResult {
        scan,
        margins,
        running_lines,
        diagnostics,
    }
}

/// Analyze a document from the extractor's JSON record stream, with default
/// options.
pub fn analyze_json(json: &str, catalog: &PatternCatalog) -> Result<AnalysisResult, LayoutError> {
    let records: Vec<PageRecord> = serde_json::from_str(json)?;
    Ok(analyze_records(
        records,
        catalog,
        &SpacingOptions::default(),
        &StatisticsOptions::default(),
    ))
}
