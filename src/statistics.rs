//! Page and document layout statistics
//!
//! Derives layout regions from vertically adjacent lines, aggregates them
//! into used/unused spacing histograms, computes page margins and font usage,
//! and flags running headers/footers that repeat across pages. Everything
//! here is recomputed per analysis run; nothing is persisted on the lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::document::{Document, Page};
use crate::spacing::ReconstructedLine;
use crate::LayoutError;

/// Number of characters kept in a region's text preview.
const PREVIEW_CHARS: usize = 60;

/// How far apart the tops of repeated lines may drift while still counting
/// as the same running band, in points.
const BAND_TOLERANCE_PT: f32 = 4.0;

/// Options controlling statistics aggregation.
#[derive(Debug, Clone)]
pub struct StatisticsOptions {
    /// Quantum used to bucket spacing values, in points.
    pub quantum_pt: f32,
    /// Minimum number of pages a line must repeat on to qualify as a
    /// running header/footer.
    pub running_line_min_pages: usize,
    /// Fraction of pages a line must repeat on to qualify.
    pub running_line_page_ratio: f32,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            quantum_pt: 0.25,
            running_line_min_pages: 3,
            running_line_page_ratio: 0.5,
        }
    }
}

/// Vertical-space accounting for one line, or for the space trailing the
/// last line of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRegion {
    /// Unused space above: top of this line minus bottom of the previous
    /// one (or minus the page top for the first line).
    pub unused_before_pt: f32,
    /// Line height. `None` for the final trailing region.
    pub used_pt: Option<f32>,
    /// Distance from the page's left edge to the line's left edge.
    pub left_indent_pt: f32,
    /// Distance from the line's right edge to the page's right edge.
    pub right_indent_pt: f32,
    /// Distinct (font, rounded size) pairs present on the line.
    pub fonts: Vec<(String, f32)>,
    /// Leading characters of the line's normalized text.
    pub preview: String,
}

/// Derive layout regions for a page, one per line in top-to-bottom order,
/// plus a final trailing region for the space after the last line.
///
/// Fails with [`LayoutError::InvalidStructure`] when the page record carried
/// no usable dimensions; lines without geometry are passed over.
pub fn page_regions(page: &Page) -> Result<Vec<LayoutRegion>, LayoutError> {
    require_dimensions(page)?;

    let mut regions = Vec::with_capacity(page.lines.len() + 1);
    let mut prev_bottom = 0.0f32;

    for line in &page.lines {
        let bbox = match line.bbox() {
            Some(bbox) => bbox,
            None => continue,
        };
        regions.push(LayoutRegion {
            unused_before_pt: bbox.top - prev_bottom,
            used_pt: Some(bbox.bottom - bbox.top),
            left_indent_pt: bbox.x0,
            right_indent_pt: page.width - bbox.x1,
            fonts: line_fonts(line),
            preview: preview_of(line.normalized()),
        });
        prev_bottom = bbox.bottom;
    }

    regions.push(LayoutRegion {
        unused_before_pt: page.height - prev_bottom,
        used_pt: None,
        left_indent_pt: 0.0,
        right_indent_pt: 0.0,
        fonts: Vec::new(),
        preview: String::new(),
    });

    Ok(regions)
}

fn require_dimensions(page: &Page) -> Result<(), LayoutError> {
    if page.has_dimensions() {
        Ok(())
    } else {
        Err(LayoutError::InvalidStructure {
            page: page.number,
            reason: "page has no usable dimensions".to_string(),
        })
    }
}

fn line_fonts(line: &ReconstructedLine) -> Vec<(String, f32)> {
    let mut keys: BTreeSet<(String, i32)> = BTreeSet::new();
    for seg in line.segments() {
        if seg.is_content() {
            keys.insert((seg.font.clone(), (seg.size * 2.0).round() as i32));
        }
    }
    keys.into_iter()
        .map(|(font, half_points)| (font, half_points as f32 / 2.0))
        .collect()
}

fn preview_of(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Histogram of used/unused vertical spacing, bucketed to a quantum, with a
/// per-used-value breakdown by left indent.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingHistogram {
    quantum_pt: f32,
    used: BTreeMap<i64, usize>,
    unused: BTreeMap<i64, usize>,
    used_by_indent: BTreeMap<i64, BTreeMap<i64, usize>>,
}

impl SpacingHistogram {
    pub fn new(quantum_pt: f32) -> Self {
        Self {
            quantum_pt,
            used: BTreeMap::new(),
            unused: BTreeMap::new(),
            used_by_indent: BTreeMap::new(),
        }
    }

    pub fn quantum_pt(&self) -> f32 {
        self.quantum_pt
    }

    pub fn add_region(&mut self, region: &LayoutRegion) {
        let unused_bucket = self.bucket(region.unused_before_pt);
        *self.unused.entry(unused_bucket).or_insert(0) += 1;

        if let Some(used) = region.used_pt {
            let used_bucket = self.bucket(used);
            let indent_bucket = self.bucket(region.left_indent_pt);
            *self.used.entry(used_bucket).or_insert(0) += 1;
            *self
                .used_by_indent
                .entry(used_bucket)
                .or_default()
                .entry(indent_bucket)
                .or_insert(0) += 1;
        }
    }

    /// Used-space values and their counts, ascending.
    pub fn used_values(&self) -> Vec<(f32, usize)> {
        self.used
            .iter()
            .map(|(&bucket, &count)| (self.value(bucket), count))
            .collect()
    }

    /// Unused-space values and their counts, ascending.
    pub fn unused_values(&self) -> Vec<(f32, usize)> {
        self.unused
            .iter()
            .map(|(&bucket, &count)| (self.value(bucket), count))
            .collect()
    }

    /// Left-indent breakdown for one used-space value, ascending by indent.
    pub fn indent_breakdown(&self, used_pt: f32) -> Vec<(f32, usize)> {
        match self.used_by_indent.get(&self.bucket(used_pt)) {
            Some(indents) => indents
                .iter()
                .map(|(&bucket, &count)| (self.value(bucket), count))
                .collect(),
            None => Vec::new(),
        }
    }

    fn bucket(&self, value_pt: f32) -> i64 {
        (value_pt / self.quantum_pt).round() as i64
    }

    fn value(&self, bucket: i64) -> f32 {
        bucket as f32 * self.quantum_pt
    }
}

/// Spacing histogram for a single page.
pub fn histogram_for_page(
    page: &Page,
    options: &StatisticsOptions,
) -> Result<SpacingHistogram, LayoutError> {
    let mut histogram = SpacingHistogram::new(options.quantum_pt);
    for region in page_regions(page)? {
        histogram.add_region(&region);
    }
    Ok(histogram)
}

/// Spacing histogram across a whole document. Pages without usable
/// dimensions are passed over with a warning; their lines still exist for
/// pattern scanning elsewhere.
pub fn histogram_for_document(document: &Document, options: &StatisticsOptions) -> SpacingHistogram {
    let mut histogram = SpacingHistogram::new(options.quantum_pt);
    for page in &document.pages {
        match page_regions(page) {
            Ok(regions) => {
                for region in &regions {
                    histogram.add_region(region);
                }
            }
            Err(error) => log::warn!("excluding page from histogram: {error}"),
        }
    }
    histogram
}

/// Page margins derived from line extremes against the page box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageMargins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Margins of one page: left = min x0 over lines, right = width − max x1,
/// top = min top, bottom = height − max bottom. `Ok(None)` when the page has
/// no lines with geometry.
pub fn page_margins(page: &Page) -> Result<Option<PageMargins>, LayoutError> {
    require_dimensions(page)?;

    let mut extent: Option<(f32, f32, f32, f32)> = None;
    for line in &page.lines {
        if let Some(bbox) = line.bbox() {
            extent = Some(match extent {
                Some((x0, x1, top, bottom)) => (
                    x0.min(bbox.x0),
                    x1.max(bbox.x1),
                    top.min(bbox.top),
                    bottom.max(bbox.bottom),
                ),
                None => (bbox.x0, bbox.x1, bbox.top, bbox.bottom),
            });
        }
    }

    Ok(extent.map(|(x0, x1, top, bottom)| PageMargins {
        left: x0,
        right: page.width - x1,
        top,
        bottom: page.height - bottom,
    }))
}

/// Margins for every page that has dimensions and content.
pub fn document_margins(document: &Document) -> Vec<(u32, PageMargins)> {
    let mut margins = Vec::new();
    for page in &document.pages {
        match page_margins(page) {
            Ok(Some(m)) => margins.push((page.number, m)),
            Ok(None) => {}
            Err(error) => log::warn!("excluding page from margins: {error}"),
        }
    }
    margins
}

/// Rounded font sizes observed per font name on one page, ascending.
pub fn collect_fonts(page: &Page) -> BTreeMap<String, Vec<f32>> {
    let mut sizes: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
    for line in &page.lines {
        for seg in line.segments() {
            if seg.is_content() {
                sizes
                    .entry(seg.font.clone())
                    .or_default()
                    .insert((seg.size * 2.0).round() as i32);
            }
        }
    }
    sizes
        .into_iter()
        .map(|(font, half_points)| {
            (
                font,
                half_points.into_iter().map(|hp| hp as f32 / 2.0).collect(),
            )
        })
        .collect()
}

static PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}$").unwrap());

/// Grouping key for running-line detection. Standalone page numbers change
/// text on every page, so they are folded into one group.
const PAGE_NUMBER_KEY: &str = "<page-number>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningLineKind {
    Header,
    Footer,
}

/// A line that repeats at the same vertical band on many pages: a running
/// header, footer, or page-number furniture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningLine {
    /// Repeated text, or `"<page-number>"` for the folded page-number group.
    pub text: String,
    pub kind: RunningLineKind,
    /// Pages the line was seen on, ascending.
    pub pages: Vec<u32>,
    /// Mean top coordinate of the band, in points.
    pub band_top_pt: f32,
    pub is_page_number: bool,
}

/// Detect running headers and footers: lines whose text repeats at the same
/// vertical band on at least `running_line_min_pages` pages and
/// `running_line_page_ratio` of the pages with dimensions, within the top or
/// bottom quarter of the page.
pub fn detect_running_lines(document: &Document, options: &StatisticsOptions) -> Vec<RunningLine> {
    // (page number, top, top as a fraction of page height) per occurrence.
    let mut groups: HashMap<String, Vec<(u32, f32, f32)>> = HashMap::new();
    let mut measurable_pages = 0usize;

    for page in &document.pages {
        if !page.has_dimensions() {
            continue;
        }
        measurable_pages += 1;
        for line in &page.lines {
            let text = line.normalized().trim();
            if text.is_empty() {
                continue;
            }
            let bbox = match line.bbox() {
                Some(bbox) => bbox,
                None => continue,
            };
            let key = if PAGE_NUMBER_RE.is_match(text) {
                PAGE_NUMBER_KEY.to_string()
            } else {
                text.to_string()
            };
            groups
                .entry(key)
                .or_default()
                .push((page.number, bbox.top, bbox.top / page.height));
        }
    }

    let threshold = options
        .running_line_min_pages
        .max((options.running_line_page_ratio * measurable_pages as f32).ceil() as usize);

    let mut running = Vec::new();
    for (text, occurrences) in groups {
        let pages: BTreeSet<u32> = occurrences.iter().map(|&(page, _, _)| page).collect();
        if pages.len() < threshold {
            continue;
        }

        let tops: Vec<f32> = occurrences.iter().map(|&(_, top, _)| top).collect();
        let min_top = tops.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_top = tops.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if max_top - min_top > BAND_TOLERANCE_PT {
            continue;
        }

        let mean_fraction: f32 =
            occurrences.iter().map(|&(_, _, f)| f).sum::<f32>() / occurrences.len() as f32;
        let kind = if mean_fraction <= 0.25 {
            RunningLineKind::Header
        } else if mean_fraction >= 0.75 {
            RunningLineKind::Footer
        } else {
            continue;
        };

        let band_top_pt = tops.iter().sum::<f32>() / tops.len() as f32;
        running.push(RunningLine {
            is_page_number: text == PAGE_NUMBER_KEY,
            text,
            kind,
            pages: pages.into_iter().collect(),
            band_top_pt,
        });
    }

    running.sort_by(|a, b| a.text.cmp(&b.text));
    running
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Line, TextSegment};
    use crate::spacing::{reconstruct_line, SpacingOptions};

    fn seg(text: &str, x0: f32, x1: f32, top: f32, bottom: f32, size: f32) -> TextSegment {
        TextSegment {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom,
            font: "Helvetica".to_string(),
            size,
        }
    }

    fn line(text: &str, x0: f32, x1: f32, top: f32, bottom: f32) -> ReconstructedLine {
        reconstruct_line(
            Line::new(vec![seg(text, x0, x1, top, bottom, 12.0)]),
            &SpacingOptions::default(),
        )
    }

    fn page(number: u32, lines: Vec<ReconstructedLine>) -> Page {
        Page {
            number,
            width: 612.0,
            height: 792.0,
            lines,
        }
    }

    #[test]
    fn test_page_regions_order_and_policy() {
        let page = page(
            1,
            vec![
                line("First", 72.0, 300.0, 72.0, 84.0),
                line("Second", 72.0, 280.0, 100.0, 112.0),
            ],
        );
        let regions = page_regions(&page).unwrap();
        assert_eq!(regions.len(), 3);

        // First line: unused space measured from the page top.
        assert_eq!(regions[0].unused_before_pt, 72.0);
        assert_eq!(regions[0].used_pt, Some(12.0));
        assert_eq!(regions[0].left_indent_pt, 72.0);
        assert_eq!(regions[0].right_indent_pt, 312.0);

        // Second line: measured from the previous bottom.
        assert_eq!(regions[1].unused_before_pt, 16.0);

        // Trailing region: no used value, space to the page bottom.
        assert_eq!(regions[2].used_pt, None);
        assert_eq!(regions[2].unused_before_pt, 792.0 - 112.0);
    }

    #[test]
    fn test_page_regions_requires_dimensions() {
        let mut bad = page(4, vec![line("text", 72.0, 300.0, 72.0, 84.0)]);
        bad.width = 0.0;
        let err = page_regions(&bad).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidStructure { page: 4, .. }));
    }

    #[test]
    fn test_histogram_quantizes_to_quantum() {
        let page = page(
            1,
            vec![
                line("a", 72.0, 300.0, 72.0, 84.1),
                line("b", 72.0, 300.0, 100.0, 112.1),
            ],
        );
        let histogram = histogram_for_page(&page, &StatisticsOptions::default()).unwrap();
        // Both lines are 12.1pt tall, which buckets to 12.0 at quantum 0.25.
        let used = histogram.used_values();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0], (12.0, 2));
    }

    #[test]
    fn test_histogram_indent_breakdown() {
        let page = page(
            1,
            vec![
                line("flush", 72.0, 300.0, 72.0, 84.0),
                line("indented", 90.0, 300.0, 100.0, 112.0),
            ],
        );
        let histogram = histogram_for_page(&page, &StatisticsOptions::default()).unwrap();
        let breakdown = histogram.indent_breakdown(12.0);
        assert_eq!(breakdown, vec![(72.0, 1), (90.0, 1)]);
    }

    #[test]
    fn test_page_margins() {
        let page = page(
            1,
            vec![
                line("wide", 60.0, 540.0, 72.0, 84.0),
                line("narrow", 72.0, 300.0, 700.0, 712.0),
            ],
        );
        let margins = page_margins(&page).unwrap().unwrap();
        assert_eq!(margins.left, 60.0);
        assert_eq!(margins.right, 612.0 - 540.0);
        assert_eq!(margins.top, 72.0);
        assert_eq!(margins.bottom, 792.0 - 712.0);
    }

    #[test]
    fn test_empty_page_has_no_margins() {
        let page = page(1, Vec::new());
        assert_eq!(page_margins(&page).unwrap(), None);
    }

    #[test]
    fn test_collect_fonts() {
        let mut styled = seg("Bold head", 72.0, 200.0, 40.0, 54.0, 14.2);
        styled.font = "Helvetica-Bold".to_string();
        let lines = vec![
            reconstruct_line(Line::new(vec![styled]), &SpacingOptions::default()),
            line("body", 72.0, 300.0, 72.0, 84.0),
        ];
        let fonts = collect_fonts(&page(1, lines));
        assert_eq!(fonts["Helvetica"], vec![12.0]);
        assert_eq!(fonts["Helvetica-Bold"], vec![14.0]);
    }

    #[test]
    fn test_detect_running_headers_and_page_numbers() {
        let mut pages = Vec::new();
        for n in 1..=6u32 {
            pages.push(page(
                n,
                vec![
                    line("Draft Standard", 72.0, 200.0, 30.0, 40.0),
                    line("Body text differs on every page", 72.0, 400.0, 200.0 + n as f32, 212.0),
                    line(&n.to_string(), 300.0, 312.0, 760.0, 770.0),
                ],
            ));
        }
        let document = Document { pages };
        let running = detect_running_lines(&document, &StatisticsOptions::default());

        assert_eq!(running.len(), 2);
        let header = running
            .iter()
            .find(|r| r.text == "Draft Standard")
            .expect("header detected");
        assert_eq!(header.kind, RunningLineKind::Header);
        assert_eq!(header.pages, vec![1, 2, 3, 4, 5, 6]);

        let numbers = running
            .iter()
            .find(|r| r.is_page_number)
            .expect("page numbers detected");
        assert_eq!(numbers.kind, RunningLineKind::Footer);
    }

    #[test]
    fn test_running_lines_ignore_sparse_repeats() {
        let mut pages = Vec::new();
        for n in 1..=6u32 {
            let mut lines = vec![line("unique body", 72.0, 300.0, 200.0, 212.0)];
            if n <= 2 {
                lines.push(line("Rare note", 72.0, 200.0, 30.0, 40.0));
            }
            pages.push(page(n, lines));
        }
        let document = Document { pages };
        let running = detect_running_lines(&document, &StatisticsOptions::default());
        assert!(running.iter().all(|r| r.text != "Rare note"));
    }
}
