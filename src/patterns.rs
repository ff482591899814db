//! Structural pattern catalog
//!
//! Patterns are declarative `{name, description, regex, category}` records
//! compiled into an ordered catalog. Declaration order is a contract: when
//! several patterns match the same line, the first-declared pattern wins.
//! Validation collects every problem instead of stopping at the first, and
//! construction only fails outright when no valid pattern remains.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Routing category for a structural pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Section,
    Toc,
    Figure,
    Table,
    Heading,
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternCategory::Section => "section",
            PatternCategory::Toc => "toc",
            PatternCategory::Figure => "figure",
            PatternCategory::Table => "table",
            PatternCategory::Heading => "heading",
        };
        f.write_str(name)
    }
}

/// Declarative catalog entry, before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub name: String,
    pub description: String,
    pub regex: String,
    pub category: PatternCategory,
}

/// A compiled, validated pattern. The regex declares at least one capturing
/// group; group 1 is the canonical matched token.
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    pub name: String,
    pub description: String,
    pub category: PatternCategory,
    source: String,
    matcher: Regex,
}

impl PatternDefinition {
    /// Match against one line of text, returning the full matched span and
    /// the canonical token.
    pub fn find<'t>(&self, text: &'t str) -> Option<(&'t str, &'t str)> {
        let captures = self.matcher.captures(text)?;
        let full = captures.get(0)?.as_str();
        let token = captures.get(1).map_or(full, |m| m.as_str());
        Some((full, token))
    }

    /// The regex source the pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A catalog entry rejected during validation, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIssue {
    pub name: String,
    pub reason: String,
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog has no valid patterns ({} entries rejected)", .issues.len())]
    NoValidPatterns { issues: Vec<CatalogIssue> },
    #[error("pattern set {set:?} references unknown pattern {name:?}")]
    UnknownSetMember { set: String, name: String },
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered collection of compiled patterns with named, possibly overlapping
/// pattern sets.
///
/// Never a global: callers construct one (typically via
/// [`PatternCatalog::default_catalog`]) and pass it by reference. Once built
/// it is read-only and safe to share across scanning workers.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: Vec<PatternDefinition>,
    by_name: HashMap<String, usize>,
    sets: Vec<(String, Vec<usize>)>,
    issues: Vec<CatalogIssue>,
}

impl PatternCatalog {
    /// Compile a catalog from declarative records.
    ///
    /// Invalid entries (regex that does not compile, regex without a
    /// capturing group, duplicate name) are collected as issues and logged,
    /// and the catalog proceeds with the valid subset. Construction fails
    /// only when nothing valid remains.
    pub fn from_records(records: Vec<PatternRecord>) -> Result<Self, CatalogError> {
        let mut patterns = Vec::with_capacity(records.len());
        let mut by_name = HashMap::new();
        let mut issues = Vec::new();

        for record in records {
            if by_name.contains_key(&record.name) {
                issues.push(CatalogIssue {
                    name: record.name,
                    reason: "duplicate pattern name".to_string(),
                });
                continue;
            }
            match Regex::new(&record.regex) {
                Ok(matcher) if matcher.captures_len() < 2 => {
                    issues.push(CatalogIssue {
                        name: record.name,
                        reason: "regex declares no capturing group".to_string(),
                    });
                }
                Ok(matcher) => {
                    by_name.insert(record.name.clone(), patterns.len());
                    patterns.push(PatternDefinition {
                        name: record.name,
                        description: record.description,
                        category: record.category,
                        source: record.regex,
                        matcher,
                    });
                }
                Err(error) => {
                    issues.push(CatalogIssue {
                        name: record.name,
                        reason: format!("regex does not compile: {error}"),
                    });
                }
            }
        }

        for issue in &issues {
            log::warn!("rejected pattern {issue}");
        }

        if patterns.is_empty() {
            return Err(CatalogError::NoValidPatterns { issues });
        }

        Ok(Self {
            patterns,
            by_name,
            sets: Vec::new(),
            issues,
        })
    }

    /// Compile a catalog from a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<PatternRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// The built-in catalog: decimal and top-level section numbering,
    /// annex/appendix headings, TOC entries, figure and table titles, and
    /// all-caps headings, with the standard pattern sets declared.
    pub fn default_catalog() -> Self {
        let mut catalog = Self::from_records(default_records())
            .expect("built-in patterns are valid");
        catalog
            .add_set(
                "section_patterns",
                &["decimal_section", "top_level_section", "appendix_section"],
            )
            .expect("built-in set members exist");
        catalog
            .add_set("toc_patterns", &["toc_numbered_entry", "toc_dot_leader"])
            .expect("built-in set members exist");
        catalog
            .add_set("figure_table_patterns", &["figure_title", "table_title"])
            .expect("built-in set members exist");
        catalog
            .add_set("heading_patterns", &["caps_heading"])
            .expect("built-in set members exist");
        catalog
    }

    /// Declare a named pattern set. Members are stored in catalog-declaration
    /// order regardless of the order given here; re-declaring a name
    /// replaces the set.
    pub fn add_set(&mut self, set: &str, members: &[&str]) -> Result<(), CatalogError> {
        let mut indices = Vec::with_capacity(members.len());
        for &name in members {
            match self.by_name.get(name) {
                Some(&index) => indices.push(index),
                None => {
                    return Err(CatalogError::UnknownSetMember {
                        set: set.to_string(),
                        name: name.to_string(),
                    })
                }
            }
        }
        indices.sort_unstable();
        indices.dedup();

        if let Some(existing) = self.sets.iter_mut().find(|(name, _)| name == set) {
            existing.1 = indices;
        } else {
            self.sets.push((set.to_string(), indices));
        }
        Ok(())
    }

    /// Direct lookup by pattern name.
    pub fn get_pattern(&self, name: &str) -> Option<&PatternDefinition> {
        self.by_name.get(name).map(|&index| &self.patterns[index])
    }

    /// Members of a named set, in catalog-declaration order.
    pub fn get_pattern_set(&self, name: &str) -> Option<Vec<&PatternDefinition>> {
        self.sets
            .iter()
            .find(|(set, _)| set == name)
            .map(|(_, indices)| indices.iter().map(|&i| &self.patterns[i]).collect())
    }

    pub fn set_names(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|(name, _)| name.as_str())
    }

    /// All patterns in declaration order.
    pub fn patterns(&self) -> &[PatternDefinition] {
        &self.patterns
    }

    /// Entries rejected during construction.
    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn record(name: &str, description: &str, regex: &str, category: PatternCategory) -> PatternRecord {
    PatternRecord {
        name: name.to_string(),
        description: description.to_string(),
        regex: regex.to_string(),
        category,
    }
}

/// Records behind [`PatternCatalog::default_catalog`], exposed so callers
/// can extend the preset before compiling their own catalog.
pub fn default_records() -> Vec<PatternRecord> {
    vec![
        record(
            "decimal_section",
            "Multi-level decimal section heading, e.g. \"9.3.2.1 Initialization process\"",
            r"^(\d+(?:\.\d+)+)\.?\s+\S.*",
            PatternCategory::Section,
        ),
        record(
            "top_level_section",
            "Single-number top-level section heading, e.g. \"7 Frame formats\"",
            r"^(\d{1,2})\.?\s+[A-Z].*",
            PatternCategory::Section,
        ),
        record(
            "appendix_section",
            "Annex or appendix heading, e.g. \"Annex B (informative)\"",
            r"^((?i:annex|appendix)\s+[A-Z])(?:[.\s].*)?$",
            PatternCategory::Section,
        ),
        record(
            "toc_numbered_entry",
            "Numbered table-of-contents entry with dot leader and page number",
            r"^(\d+(?:\.\d+)*)\.?\s+.*?\.{2,}\s*\d{1,4}$",
            PatternCategory::Toc,
        ),
        record(
            "toc_dot_leader",
            "Table-of-contents entry with dot leader and trailing page number",
            r"^(.{2,}?)\s*\.{4,}\s*\d{1,4}$",
            PatternCategory::Toc,
        ),
        record(
            "figure_title",
            "Figure caption with figure number, e.g. \"Figure 3-2 Block diagram\"",
            r"^(?i:fig(?:ure)?\.?)\s+(\d+(?:[.\-]\d+)*)\s*[-:.]?\s*.*",
            PatternCategory::Figure,
        ),
        record(
            "table_title",
            "Table caption with table number, e.g. \"Table 12.1: Field values\"",
            r"^(?i:table)\s+(\d+(?:[.\-]\d+)*)\s*[-:.]?\s*.*",
            PatternCategory::Table,
        ),
        record(
            "caps_heading",
            "Line set entirely in capitals",
            r"^([A-Z][A-Z0-9][A-Z0-9 .,&'\-]{2,})$",
            PatternCategory::Heading,
        ),
    ]
}
