//! Document-wide pattern scanning
//!
//! Applies a [`PatternCatalog`] across every line of a document and produces
//! a [`ScanResult`]: the full match list, per-pattern statistics, inferred
//! body-text font, and document context. Scanning is a pure function of
//! (catalog, document): re-scanning the same inputs yields identical
//! results, with matches ordered page-major, then line-major, then by
//! catalog declaration within a line.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::document::{Document, Page};
use crate::patterns::{PatternCatalog, PatternCategory, PatternDefinition};

/// One pattern hit on one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Name of the matching pattern.
    pub pattern: String,
    pub category: PatternCategory,
    /// 1-based page number.
    pub page: u32,
    /// 1-based line number within the page.
    pub line: usize,
    /// Full matched span.
    pub matched: String,
    /// Canonical token from the pattern's first capture group.
    pub token: String,
    /// Normalized text of the source line.
    pub text: String,
    /// Whether the line's dominant font size exceeds the inferred body
    /// size, a cheap typographic confidence signal for headings.
    pub oversized: bool,
}

/// Aggregate statistics for one pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStats {
    pub pattern: String,
    pub count: usize,
    /// Distinct pages the pattern matched on, ascending.
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStatistics {
    pub total_matches: usize,
    pub pages_scanned: usize,
    pub pages_with_matches: usize,
    pub patterns_matched: usize,
}

/// Body-text font inference over the whole document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontAnalysis {
    /// Font name of the most frequent (font, rounded size) pair.
    pub body_font: Option<String>,
    /// Rounded size of that pair, in points.
    pub body_size: Option<f32>,
    /// Total distinct (font, rounded size) pairs observed.
    pub unique_fonts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentContext {
    pub page_count: usize,
    /// Dimensions of the first page that carried them; zero otherwise.
    pub page_width: f32,
    pub page_height: f32,
}

/// Aggregated result of scanning one document with one catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub matches: Vec<Match>,
    /// Statistics for every pattern that matched, in catalog order.
    pub pattern_statistics: Vec<PatternStats>,
    pub scan_statistics: ScanStatistics,
    pub font_analysis: FontAnalysis,
    pub document_context: DocumentContext,
}

/// Matches grouped by category for hand-off to the downstream
/// language-model confirmation stage. Heading matches travel with the
/// section group; no network call happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmAnalysisInput {
    pub section_pattern_matches: Vec<Match>,
    pub toc_pattern_matches: Vec<Match>,
    pub figure_table_pattern_matches: Vec<Match>,
}

/// Scan every line of the document against every catalog pattern.
///
/// Pages fan out across rayon workers; collection re-imposes page order, so
/// the result is deterministic regardless of scheduling.
pub fn scan_document(catalog: &PatternCatalog, document: &Document) -> ScanResult {
    let font_analysis = infer_body_font(document);
    let body_size = font_analysis.body_size;

    let per_page: Vec<Vec<Match>> = document
        .pages
        .par_iter()
        .map(|page| scan_page(catalog, page, body_size))
        .collect();
    let matches: Vec<Match> = per_page.into_iter().flatten().collect();

    log::debug!(
        "scanned {} pages, {} matches",
        document.page_count(),
        matches.len()
    );

    let pattern_statistics = per_pattern_statistics(catalog, &matches);
    let pages_with_matches = matches
        .iter()
        .map(|m| m.page)
        .collect::<BTreeSet<u32>>()
        .len();

    let scan_statistics = ScanStatistics {
        total_matches: matches.len(),
        pages_scanned: document.page_count(),
        pages_with_matches,
        patterns_matched: pattern_statistics.len(),
    };

    let (page_width, page_height) = document
        .pages
        .iter()
        .find(|page| page.has_dimensions())
        .map(|page| (page.width, page.height))
        .unwrap_or((0.0, 0.0));

    ScanResult {
        matches,
        pattern_statistics,
        scan_statistics,
        font_analysis,
        document_context: DocumentContext {
            page_count: document.page_count(),
            page_width,
            page_height,
        },
    }
}

fn scan_page(catalog: &PatternCatalog, page: &Page, body_size: Option<f32>) -> Vec<Match> {
    let mut matches = Vec::new();
    for (index, line) in page.lines.iter().enumerate() {
        let text = line.normalized();
        if text.is_empty() {
            continue;
        }
        let oversized = match (line.dominant_size(), body_size) {
            (Some(size), Some(body)) => size > body,
            _ => false,
        };
        for pattern in catalog.patterns() {
            if let Some((matched, token)) = pattern.find(text) {
                matches.push(Match {
                    pattern: pattern.name.clone(),
                    category: pattern.category,
                    page: page.number,
                    line: index + 1,
                    matched: matched.to_string(),
                    token: token.to_string(),
                    text: text.to_string(),
                    oversized,
                });
            }
        }
    }
    matches
}

/// First-declared pattern that matches the line, per the catalog-order
/// tie-break contract. Use this when a single classification per line is
/// needed.
pub fn classify_line<'c>(catalog: &'c PatternCatalog, text: &str) -> Option<&'c PatternDefinition> {
    catalog
        .patterns()
        .iter()
        .find(|pattern| pattern.find(text).is_some())
}

fn per_pattern_statistics(catalog: &PatternCatalog, matches: &[Match]) -> Vec<PatternStats> {
    let mut by_pattern: HashMap<&str, (usize, BTreeSet<u32>)> = HashMap::new();
    for m in matches {
        let entry = by_pattern.entry(m.pattern.as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(m.page);
    }

    // Catalog order keeps the statistics stable run to run.
    catalog
        .patterns()
        .iter()
        .filter_map(|pattern| {
            by_pattern
                .get(pattern.name.as_str())
                .map(|(count, pages)| PatternStats {
                    pattern: pattern.name.clone(),
                    count: *count,
                    pages: pages.iter().copied().collect(),
                })
        })
        .collect()
}

fn infer_body_font(document: &Document) -> FontAnalysis {
    let mut counts: HashMap<(String, i32), usize> = HashMap::new();
    for page in &document.pages {
        for line in &page.lines {
            for seg in line.segments() {
                if !seg.is_content() {
                    continue;
                }
                let key = (seg.font.clone(), (seg.size * 2.0).round() as i32);
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    let unique_fonts = counts.len();
    // Ties resolve to the lexicographically first (font, size) pair.
    let body = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

    match body {
        Some(((font, half_points), _)) => FontAnalysis {
            body_font: Some(font),
            body_size: Some(half_points as f32 / 2.0),
            unique_fonts,
        },
        None => FontAnalysis {
            body_font: None,
            body_size: None,
            unique_fonts,
        },
    }
}

/// Group a scan result's matches by category for the downstream
/// confirmation stage.
pub fn format_for_llm_analysis(result: &ScanResult) -> LlmAnalysisInput {
    let mut input = LlmAnalysisInput {
        section_pattern_matches: Vec::new(),
        toc_pattern_matches: Vec::new(),
        figure_table_pattern_matches: Vec::new(),
    };
    for m in &result.matches {
        match m.category {
            PatternCategory::Section | PatternCategory::Heading => {
                input.section_pattern_matches.push(m.clone())
            }
            PatternCategory::Toc => input.toc_pattern_matches.push(m.clone()),
            PatternCategory::Figure | PatternCategory::Table => {
                input.figure_table_pattern_matches.push(m.clone())
            }
        }
    }
    input
}
