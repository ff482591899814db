//! Whitespace reconstruction for a single line
//!
//! Extractors deliver text runs with no inter-run whitespace; the spacing
//! between them exists only as geometry. This module rebuilds it from the
//! gaps between segment bounding boxes, producing two renditions of each
//! line:
//!
//! - *normalized*: exactly one space per inferred gap, so no two content
//!   segments ever run together
//! - *proportional*: a run of spaces sized to the measured gap, useful for
//!   indentation-sensitive pattern matching
//!
//! Every inferred gap is recorded as a [`SpacingEvent`] for downstream
//! statistics.

use std::collections::HashMap;

use crate::segment::{BoundingBox, Line, TextSegment};

/// Options controlling whitespace reconstruction.
#[derive(Debug, Clone)]
pub struct SpacingOptions {
    /// Estimated space width as a fraction of the preceding content
    /// segment's font size. The default of 0.3 assumes a 12pt font renders
    /// a space of roughly 3.6pt.
    pub space_width_ratio: f32,
    /// Floor for the proportional space count. Keeps overlapping or
    /// zero-gap content segments separated.
    pub min_space_count: usize,
}

impl Default for SpacingOptions {
    fn default() -> Self {
        Self {
            space_width_ratio: 0.3,
            min_space_count: 1,
        }
    }
}

/// One inferred gap between two consecutive content segments.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingEvent {
    /// Byte index in the normalized text where the space was inserted.
    pub text_index: usize,
    /// Measured gap between the neighboring content segments, in points.
    /// Negative when the segments overlap; preserved unmodified.
    pub raw_gap_pt: f32,
    /// Space width estimate used for the proportional count, in points.
    pub space_width_pt: f32,
    /// Number of spaces inserted in the proportional text.
    pub space_count: usize,
}

/// A line plus its reconstructed text renditions and spacing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedLine {
    line: Line,
    normalized: String,
    proportional: String,
    events: Vec<SpacingEvent>,
}

impl ReconstructedLine {
    /// Line text with one space per inferred gap.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Line text with gap-proportional space runs.
    pub fn proportional(&self) -> &str {
        &self.proportional
    }

    pub fn events(&self) -> &[SpacingEvent] {
        &self.events
    }

    pub fn segments(&self) -> &[TextSegment] {
        self.line.segments()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.line.bbox()
    }

    /// Most frequent rounded font size among the line's content segments,
    /// weighted by character count. Ties resolve to the larger size.
    pub fn dominant_size(&self) -> Option<f32> {
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for seg in self.line.segments() {
            if !seg.is_content() {
                continue;
            }
            let key = (seg.size * 2.0).round() as i32;
            *counts.entry(key).or_insert(0) += seg.text.trim().chars().count();
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(key, _)| key as f32 / 2.0)
    }
}

/// Space width estimate for a font size, floored to avoid a zero divisor
/// for degenerate sizes.
pub fn estimated_space_width(font_size: f32, options: &SpacingOptions) -> f32 {
    (font_size * options.space_width_ratio).max(0.1)
}

/// Rebuild the whitespace of one line.
///
/// Positional-only segments contribute no text; the gap between two content
/// segments is measured edge to edge, so any number of positional-only
/// segments in between collapses into a single gap and a single event.
/// Content segment text is stripped before joining; boundaries come from
/// geometry, not from whatever padding the extractor left in the runs.
pub fn reconstruct_line(line: Line, options: &SpacingOptions) -> ReconstructedLine {
    let mut normalized = String::new();
    let mut proportional = String::new();
    let mut events = Vec::new();
    // Right edge and font size of the previous content segment.
    let mut prev: Option<(f32, f32)> = None;

    for seg in line.segments() {
        if !seg.is_content() {
            continue;
        }
        let text = seg.text.trim();
        if let Some((prev_x1, prev_size)) = prev {
            let raw_gap = seg.x0 - prev_x1;
            let space_width = estimated_space_width(prev_size, options);
            let count = ((raw_gap / space_width).round() as i64)
                .max(options.min_space_count as i64) as usize;
            events.push(SpacingEvent {
                text_index: normalized.len(),
                raw_gap_pt: raw_gap,
                space_width_pt: space_width,
                space_count: count,
            });
            normalized.push(' ');
            proportional.extend(std::iter::repeat(' ').take(count));
        }
        normalized.push_str(text);
        proportional.push_str(text);
        prev = Some((seg.x1, seg.size));
    }

    ReconstructedLine {
        line,
        normalized,
        proportional,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, x0: f32, x1: f32, size: f32) -> TextSegment {
        TextSegment {
            text: text.to_string(),
            x0,
            x1,
            top: 100.0,
            bottom: 100.0 + size,
            font: "Helvetica".to_string(),
            size,
        }
    }

    #[test]
    fn test_byte_stuffing_scenario() {
        // A numbered heading whose gap is bridged by a positional-only run.
        let line = Line::new(vec![
            seg("9.3.4.6", 20.0, 50.0, 10.0),
            seg("", 50.0, 62.0, 10.0),
            seg("Byte stuffing process", 62.0, 160.0, 10.0),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());

        assert_eq!(rec.normalized(), "9.3.4.6 Byte stuffing process");
        // 12pt gap at 10pt font: 12 / 3.0 rounds to 4 spaces.
        assert_eq!(rec.proportional(), "9.3.4.6    Byte stuffing process");
        assert_eq!(rec.events().len(), 1);
        let event = &rec.events()[0];
        assert_eq!(event.raw_gap_pt, 12.0);
        assert!((event.space_width_pt - 3.0).abs() < 0.001);
        assert_eq!(event.space_count, 4);
        assert_eq!(event.text_index, "9.3.4.6".len());
    }

    #[test]
    fn test_single_segment_line() {
        let line = Line::new(vec![seg("Lonely", 10.0, 60.0, 12.0)]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.normalized(), "Lonely");
        assert_eq!(rec.proportional(), "Lonely");
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_all_positional_line() {
        let line = Line::new(vec![seg("", 10.0, 20.0, 12.0), seg("  ", 30.0, 40.0, 12.0)]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.normalized(), "");
        assert_eq!(rec.proportional(), "");
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_consecutive_positional_segments_collapse() {
        // Two positional-only bridges between two content segments must
        // yield one event spanning the whole gap.
        let line = Line::new(vec![
            seg("left", 10.0, 30.0, 12.0),
            seg(" ", 30.0, 38.0, 12.0),
            seg("", 38.0, 45.0, 12.0),
            seg("right", 45.0, 80.0, 12.0),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.normalized(), "left right");
        assert_eq!(rec.events().len(), 1);
        assert_eq!(rec.events()[0].raw_gap_pt, 15.0);
    }

    #[test]
    fn test_overlapping_segments_still_separated() {
        let line = Line::new(vec![
            seg("first", 10.0, 52.0, 12.0),
            seg("second", 50.0, 90.0, 12.0),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.normalized(), "first second");
        assert_eq!(rec.proportional(), "first second");
        let event = &rec.events()[0];
        assert_eq!(event.raw_gap_pt, -2.0);
        assert_eq!(event.space_count, 1);
    }

    #[test]
    fn test_zero_gap_segments_still_separated() {
        // Adjacent runs that touch exactly must not concatenate: "6" + "Byte"
        // style defects are the whole point of the one-space guarantee.
        let line = Line::new(vec![
            seg("6", 10.0, 16.0, 12.0),
            seg("Byte", 16.0, 40.0, 12.0),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.normalized(), "6 Byte");
    }

    #[test]
    fn test_segment_padding_does_not_double_spaces() {
        let line = Line::new(vec![
            seg("padded ", 10.0, 50.0, 12.0),
            seg(" tail", 55.0, 80.0, 12.0),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.normalized(), "padded tail");
    }

    #[test]
    fn test_space_width_ratio_is_configurable() {
        let options = SpacingOptions {
            space_width_ratio: 0.5,
            min_space_count: 1,
        };
        // 12pt gap at 10pt font with a 5pt space estimate: 2 spaces.
        let line = Line::new(vec![
            seg("a", 10.0, 20.0, 10.0),
            seg("b", 32.0, 40.0, 10.0),
        ]);
        let rec = reconstruct_line(line, &options);
        assert_eq!(rec.events()[0].space_count, 2);
        assert_eq!(rec.proportional(), "a  b");
    }

    #[test]
    fn test_event_indices_address_normalized_text() {
        let line = Line::new(vec![
            seg("one", 0.0, 20.0, 12.0),
            seg("two", 30.0, 50.0, 12.0),
            seg("three", 60.0, 100.0, 12.0),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.events().len(), 2);
        for event in rec.events() {
            assert_eq!(&rec.normalized()[event.text_index..=event.text_index], " ");
        }
    }

    #[test]
    fn test_dominant_size_prefers_most_text() {
        let line = Line::new(vec![
            seg("1", 0.0, 8.0, 14.0),
            seg("a much longer body run", 10.0, 150.0, 9.8),
        ]);
        let rec = reconstruct_line(line, &SpacingOptions::default());
        assert_eq!(rec.dominant_size(), Some(10.0));
    }
}
