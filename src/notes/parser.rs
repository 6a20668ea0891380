//! Loan notes decoder
//!
//! Reads the damage / suggestion blocks back out of a notes field. Decoding
//! is best-effort: the field is user-editable, so anything that does not
//! match the grammar is skipped rather than reported.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::damage_report::{DamageReport, DecodedNotes};

/// Context used for blocks that appear before any `[Resource ID ..]` marker
pub const DEFAULT_RESOURCE: &str = "default";

/// Line written between the notes given at loan creation and the return event
pub const EVENT_SEPARATOR: &str = "---";

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(.*)\]$").unwrap());

static RESOURCE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[Resource ID\s+([^\]]*?)\s*\]$").unwrap());

static DAMAGE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^Damages:\s*\[(.*?)\](?:\s*\|\s*Notes:\s*"(.*)")?\s*$"#).unwrap()
});

static SUGGESTION_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^Suggestions:\s*\[(.*?)\](?:\s*\|\s*Additional Notes:\s*"(.*)")?\s*$"#).unwrap()
});

/// Classification of a single notes line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Timestamp(&'a str),
    ResourceMarker(&'a str),
    DamageBlock { tags: Vec<&'a str>, note: &'a str },
    SuggestionBlock { tags: Vec<&'a str>, note: &'a str },
    Unrecognized,
}

impl<'a> LineKind<'a> {
    /// Classify a trimmed, non-blank line. Only the first line may be a timestamp.
    pub fn classify(line: &'a str, first: bool) -> Self {
        if let Some(caps) = RESOURCE_MARKER.captures(line) {
            let id = caps.get(1).map_or("", |m| m.as_str());
            return if id.is_empty() {
                LineKind::Unrecognized
            } else {
                LineKind::ResourceMarker(id)
            };
        }

        if first && !line.contains("Resource ID") {
            if let Some(caps) = BRACKETED.captures(line) {
                return LineKind::Timestamp(caps.get(1).map_or("", |m| m.as_str()).trim());
            }
        }

        if let Some(caps) = DAMAGE_BLOCK.captures(line) {
            return LineKind::DamageBlock {
                tags: split_tags(caps.get(1).map_or("", |m| m.as_str())),
                note: caps.get(2).map_or("", |m| m.as_str()).trim(),
            };
        }

        if let Some(caps) = SUGGESTION_BLOCK.captures(line) {
            return LineKind::SuggestionBlock {
                tags: split_tags(caps.get(1).map_or("", |m| m.as_str())),
                note: caps.get(2).map_or("", |m| m.as_str()).trim(),
            };
        }

        LineKind::Unrecognized
    }
}

/// Decode a notes field into its timestamp and per-resource reports.
///
/// Never fails; empty or absent input yields an empty result.
pub fn decode(text: Option<&str>) -> DecodedNotes {
    let Some(text) = text else {
        return DecodedNotes::default();
    };

    let mut timestamp = None;
    let mut current = DEFAULT_RESOURCE.to_string();
    let mut reports: IndexMap<String, DamageReport> = IndexMap::new();

    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    for (idx, line) in lines.enumerate() {
        match LineKind::classify(line, idx == 0) {
            LineKind::Timestamp(ts) => timestamp = Some(ts.to_string()),
            LineKind::ResourceMarker(id) => current = id.to_string(),
            LineKind::DamageBlock { tags, note } => {
                let report = reports
                    .entry(current.clone())
                    .or_insert_with(|| DamageReport::new(current.as_str()));
                report.damages.extend(tags.into_iter().map(String::from));
                merge_note(&mut report.damage_note, note);
            }
            LineKind::SuggestionBlock { tags, note } => {
                let report = reports
                    .entry(current.clone())
                    .or_insert_with(|| DamageReport::new(current.as_str()));
                report.suggestions.extend(tags.into_iter().map(String::from));
                merge_note(&mut report.suggestion_note, note);
            }
            LineKind::Unrecognized => {
                tracing::debug!("Skipping unrecognized notes line: {}", line);
            }
        }
    }

    DecodedNotes {
        timestamp,
        reports: reports.into_values().filter(|r| !r.is_empty()).collect(),
    }
}

/// Text after the last [`EVENT_SEPARATOR`] line, or the whole text when there is none
pub fn latest_event(notes: &str) -> &str {
    let mut start = 0;
    let mut offset = 0;
    for line in notes.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == EVENT_SEPARATOR {
            start = offset;
        }
    }
    &notes[start..]
}

fn split_tags(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
}

fn merge_note(target: &mut String, note: &str) {
    if note.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(note);
}
