// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filename patterns
//!
//! A pattern such as `{Year}-{Author}-{Title}` is parsed once into an
//! ordered list of segments and then rendered against a metadata record.
//! Rendering sanitizes every substituted value, collapses the separator
//! runs left behind by empty fields, and never yields an empty stem.

use std::fmt;

use crate::metadata::MetadataRecord;

/// Pattern used when the user has not chosen one
pub const DEFAULT_PATTERN: &str = "{Year}-{Author}-{Title}";

/// Predefined placeholder orderings offered to the user
pub const PRESET_PATTERNS: &[&str] = &[
    "{Year}-{Author}-{Title}",
    "{Author}-{Year}-{Title}",
    "{Year}-{Author}-{Journal}-{Title}",
    "{Journal}-{Year}-{Author}",
    "{Year}-{Author}-{Title}-{Tags}",
];

/// Default upper bound on the stem length, in characters
pub const DEFAULT_MAX_LENGTH: usize = 150;

const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
const SEPARATORS: &[char] = &['-', '_', ' '];

/// Stem used if both the pattern and the original name come out empty
pub const LAST_RESORT_STEM: &str = "untitled";

/// Look up a preset by its 1-based position
pub fn preset(number: usize) -> Option<&'static str> {
    number.checked_sub(1).and_then(|i| PRESET_PATTERNS.get(i)).copied()
}

/// A recognized placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Year,
    Author,
    Title,
    Journal,
    Tags,
}

impl Field {
    pub const ALL: [Field; 5] = [Field::Year, Field::Author, Field::Title, Field::Journal, Field::Tags];

    pub fn name(self) -> &'static str {
        match self {
            Field::Year => "Year",
            Field::Author => "Author",
            Field::Title => "Title",
            Field::Journal => "Journal",
            Field::Tags => "Tags",
        }
    }

    /// Placeholder names match case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// One piece of a parsed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Field),
    /// A `{Token}` that is not a known placeholder, kept verbatim
    Unknown(String),
}

/// A parsed filename pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern string. Parsing never fails: stray braces are
    /// literal text and unknown tokens become [`Segment::Unknown`].
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find(|c: char| c == '{' || c == '}') {
                Some(close) if after[close..].starts_with('}') => {
                    let name = &after[..close];
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(match Field::from_name(name) {
                        Some(field) => Segment::Placeholder(field),
                        None => Segment::Unknown(format!("{{{}}}", name)),
                    });
                    rest = &after[close + 1..];
                }
                _ => {
                    // Unclosed, or another '{' comes first
                    literal.push('{');
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Recognized placeholders in order of appearance
    pub fn placeholders(&self) -> Vec<Field> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(f) => Some(*f),
                _ => None,
            })
            .collect()
    }

    /// Tokens that look like placeholders but are not recognized
    pub fn unknown_placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Unknown(token) => Some(token.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::parse(DEFAULT_PATTERN)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Outcome of resolving a pattern for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Filename without extension
    pub stem: String,
    /// True when the pattern rendered empty and the original name was kept
    pub fallback: bool,
}

/// Renders a pattern with the user's tags and naming limits
#[derive(Debug, Clone)]
pub struct Resolver {
    pattern: Pattern,
    tags: Vec<String>,
    max_length: usize,
}

impl Resolver {
    pub fn new(pattern: Pattern, tags: Vec<String>) -> Self {
        Self {
            pattern,
            tags,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(1);
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Render the pattern. The result may be empty when every field is missing.
    pub fn render(&self, record: &MetadataRecord) -> String {
        let mut out = String::new();

        for segment in &self.pattern.segments {
            match segment {
                Segment::Literal(text) | Segment::Unknown(text) => out.push_str(&strip_illegal(text)),
                Segment::Placeholder(field) => out.push_str(&self.field_value(*field, record)),
            }
        }

        truncate_stem(&collapse_separators(&out), self.max_length)
    }

    /// Render the pattern, falling back to `original_stem` if nothing is left
    pub fn resolve(&self, record: &MetadataRecord, original_stem: &str) -> Resolution {
        let stem = self.render(record);
        if !stem.is_empty() {
            return Resolution { stem, fallback: false };
        }

        let fallback = truncate_stem(&clean_stem(original_stem), self.max_length);
        Resolution {
            stem: if fallback.is_empty() { truncate_stem(LAST_RESORT_STEM, self.max_length) } else { fallback },
            fallback: true,
        }
    }

    fn field_value(&self, field: Field, record: &MetadataRecord) -> String {
        match field {
            Field::Year => record.year.map(|y| y.to_string()).unwrap_or_default(),
            Field::Author => record.author.as_deref().map(sanitize_component).unwrap_or_default(),
            Field::Title => record.title.as_deref().map(sanitize_component).unwrap_or_default(),
            Field::Journal => record.journal.as_deref().map(sanitize_component).unwrap_or_default(),
            Field::Tags => self
                .tags
                .iter()
                .map(|t| sanitize_component(t))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("-"),
        }
    }
}

/// Sanitize a substituted value: illegal characters removed, whitespace
/// runs turned into single hyphens.
pub fn sanitize_component(value: &str) -> String {
    let joined = value
        .split_whitespace()
        .map(strip_illegal)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    collapse_separators(&joined)
}

/// Sanitize a user-typed or original stem, keeping its spacing style
pub fn clean_stem(name: &str) -> String {
    let name = name.trim();
    let name = match name.len().checked_sub(4) {
        Some(idx) if name.is_char_boundary(idx) && name[idx..].eq_ignore_ascii_case(".pdf") => &name[..idx],
        _ => name,
    };
    collapse_separators(&strip_illegal(name))
}

fn strip_illegal(text: &str) -> String {
    text.chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect()
}

/// Collapse separator runs to their first character and trim the ends
fn collapse_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_was_separator = false;

    for c in text.chars() {
        let is_separator = SEPARATORS.contains(&c);
        if is_separator && previous_was_separator {
            continue;
        }
        out.push(c);
        previous_was_separator = is_separator;
    }

    trim_edges(&out).to_string()
}

fn trim_edges(text: &str) -> &str {
    text.trim_matches(|c| SEPARATORS.contains(&c) || c == '.')
}

fn truncate_stem(stem: &str, max_length: usize) -> String {
    if stem.chars().count() <= max_length {
        return stem.to_string();
    }
    let truncated: String = stem.chars().take(max_length).collect();
    trim_edges(&truncated).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: Option<i32>, author: Option<&str>, title: Option<&str>, journal: Option<&str>) -> MetadataRecord {
        MetadataRecord::new(
            year,
            author.map(String::from),
            title.map(String::from),
            journal.map(String::from),
        )
    }

    fn resolver(pattern: &str) -> Resolver {
        Resolver::new(Pattern::parse(pattern), Vec::new())
    }

    #[test]
    fn test_parse_segments() {
        let pattern = Pattern::parse("{Year}-{Author}_x{Nope}");
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Placeholder(Field::Year),
                Segment::Literal("-".to_string()),
                Segment::Placeholder(Field::Author),
                Segment::Literal("_x".to_string()),
                Segment::Unknown("{Nope}".to_string()),
            ]
        );
        assert_eq!(pattern.placeholders(), vec![Field::Year, Field::Author]);
        assert_eq!(pattern.unknown_placeholders(), vec!["{Nope}"]);
    }

    #[test]
    fn test_parse_stray_braces_are_literal() {
        let pattern = Pattern::parse("{{Year} draft {");
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("{".to_string()),
                Segment::Placeholder(Field::Year),
                Segment::Literal(" draft {".to_string()),
            ]
        );
    }

    #[test]
    fn test_placeholders_are_case_insensitive() {
        assert_eq!(Pattern::parse("{year}{TITLE}").placeholders(), vec![Field::Year, Field::Title]);
    }

    #[test]
    fn test_full_record() {
        let r = record(Some(2024), Some("Zhang"), Some("Room temperature plasticity in amorphous SiO2"), None);
        assert_eq!(
            resolver("{Year}-{Author}-{Title}").render(&r),
            "2024-Zhang-Room-temperature-plasticity-in-amorphous-SiO2"
        );
    }

    #[test]
    fn test_missing_year_has_no_leading_hyphen() {
        let r = record(None, Some("Zhang"), Some("X"), None);
        assert_eq!(resolver("{Year}-{Author}-{Title}").render(&r), "Zhang-X");
    }

    #[test]
    fn test_missing_fields_never_double_separators() {
        let patterns = PRESET_PATTERNS.iter().copied().chain(["{Title}__{Year} {Journal}"]);
        for pattern in patterns {
            let resolver = Resolver::new(Pattern::parse(pattern), vec![String::new(), "  ".to_string()]);
            for mask in 0u8..16 {
                let r = record(
                    (mask & 1 != 0).then_some(1999),
                    (mask & 2 != 0).then_some("van der Berg"),
                    (mask & 4 != 0).then_some("A - study: of things?"),
                    (mask & 8 != 0).then_some("Phys. Rev. Lett."),
                );
                let stem = resolver.render(&r);
                for doubled in ["--", "__", "  ", "-_", "_-"] {
                    assert!(!stem.contains(doubled), "{pattern:?} mask {mask}: {stem:?}");
                }
                assert!(!stem.starts_with(SEPARATORS), "{pattern:?} mask {mask}: {stem:?}");
                assert!(!stem.ends_with(SEPARATORS), "{pattern:?} mask {mask}: {stem:?}");
            }
        }
    }

    #[test]
    fn test_substituted_values_can_be_recovered() {
        let r = record(Some(2021), Some("O'Neil"), Some("Grain boundaries in copper"), Some("Acta Materialia"));
        let resolver = Resolver::new(Pattern::parse("{Year}_{Author}_{Journal}_{Title}"), Vec::new());
        let stem = resolver.render(&r);
        let parts: Vec<&str> = stem.split('_').collect();
        assert_eq!(parts, vec!["2021", "O'Neil", "Acta-Materialia", "Grain-boundaries-in-copper"]);
        assert_eq!(parts[3], sanitize_component(r.title.as_deref().unwrap()));
    }

    #[test]
    fn test_illegal_characters_are_removed() {
        let r = record(Some(2020), Some("Müller"), Some("What is <this>? A/B: \"test\" | 2"), None);
        assert_eq!(resolver("{Author}-{Title}").render(&r), "Müller-What-is-this-AB-test-2");
    }

    #[test]
    fn test_tags_are_hyphen_joined() {
        let resolver = Resolver::new(
            Pattern::parse("{Year}-{Tags}"),
            vec!["dislocations".to_string(), "".to_string(), "md sim".to_string()],
        );
        let r = record(Some(2023), None, None, None);
        assert_eq!(resolver.render(&r), "2023-dislocations-md-sim");
    }

    #[test]
    fn test_unknown_placeholder_kept_verbatim() {
        let r = record(Some(2024), Some("Zhang"), None, None);
        assert_eq!(resolver("{Year}-{Volume}-{Author}").render(&r), "2024-{Volume}-Zhang");
    }

    #[test]
    fn test_fallback_to_original_name() {
        let resolution = resolver("{Year}-{Author}").resolve(&MetadataRecord::default(), "scan 0042");
        assert_eq!(
            resolution,
            Resolution {
                stem: "scan 0042".to_string(),
                fallback: true
            }
        );

        let resolution = resolver("{Year}").resolve(&MetadataRecord::default(), "???");
        assert_eq!(resolution.stem, LAST_RESORT_STEM);
        assert!(resolution.fallback);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let r = record(None, None, Some("ééééé ééééé"), None);
        let stem = resolver("{Title}").with_max_length(6).render(&r);
        assert_eq!(stem, "ééééé");
    }

    #[test]
    fn test_journal_trailing_dot_trimmed() {
        let r = record(Some(2019), None, None, Some("Phys. Rev. Lett."));
        assert_eq!(resolver("{Year}-{Journal}").render(&r), "2019-Phys.-Rev.-Lett");
    }

    #[test]
    fn test_clean_stem_drops_pdf_extension() {
        assert_eq!(clean_stem("  My  paper: final.PDF "), "My paper final");
    }

    #[test]
    fn test_presets() {
        assert_eq!(preset(1), Some(DEFAULT_PATTERN));
        assert_eq!(preset(0), None);
        assert_eq!(preset(PRESET_PATTERNS.len() + 1), None);
        for p in PRESET_PATTERNS {
            assert!(Pattern::parse(p).unknown_placeholders().is_empty());
        }
    }
}
