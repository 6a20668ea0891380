//! Loan notes encoder
//!
//! Produces the persisted text form of a list of damage reports:
//!
//! ```text
//! [2024-03-01 10:00:00]
//! [Resource ID 12]
//! Damages: [Cracked Screen, Broken Hinge] | Notes: "dropped"
//! Suggestions: [Add case] | Additional Notes: "fragile"
//! ```

use crate::models::damage_report::DamageReport;

use super::parser::EVENT_SEPARATOR;

/// Whether a resource id can be written into a `[Resource ID ..]` marker and read back
pub fn is_writable_resource_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && !id.contains(|c: char| matches!(c, ']' | '\n' | '\r'))
}

/// Encode reports into notes text, optionally preceded by a `[<timestamp>]` line.
///
/// Reports without a writable resource id or without any content are skipped.
/// Returns an empty string when nothing is left to write.
pub fn encode(reports: &[DamageReport], timestamp: Option<&str>) -> String {
    let mut lines = Vec::new();

    for report in reports {
        if !is_writable_resource_id(&report.resource_id) {
            if !report.resource_id.trim().is_empty() {
                tracing::warn!("Skipping damage report with unwritable resource id {:?}", report.resource_id);
            }
            continue;
        }
        let resource_id = report.resource_id.trim();

        let damages = clean_tags(&report.damages);
        let damage_note = clean_note(&report.damage_note);
        let suggestions = clean_tags(&report.suggestions);
        let suggestion_note = clean_note(&report.suggestion_note);

        if damages.is_empty()
            && damage_note.is_empty()
            && suggestions.is_empty()
            && suggestion_note.is_empty()
        {
            continue;
        }

        lines.push(format!("[Resource ID {}]", resource_id));
        if !damages.is_empty() || !damage_note.is_empty() {
            lines.push(block_line("Damages", &damages, "Notes", &damage_note));
        }
        if !suggestions.is_empty() || !suggestion_note.is_empty() {
            lines.push(block_line(
                "Suggestions",
                &suggestions,
                "Additional Notes",
                &suggestion_note,
            ));
        }
    }

    if lines.is_empty() {
        return String::new();
    }

    if let Some(ts) = timestamp
        .map(|ts| ts.replace(|c: char| matches!(c, '\n' | '\r'), " "))
        .map(|ts| ts.trim().to_string())
        .filter(|ts| !ts.is_empty())
    {
        lines.insert(0, format!("[{}]", ts));
    }

    lines.join("\n")
}

/// Append the text of a return event to existing loan notes.
///
/// When notes already exist, a separator line is always written so that
/// [`latest_event`](super::latest_event) finds the event and never the
/// notes given before it. Separator lines inside the event text are dropped.
pub fn append_event(existing: Option<&str>, event: Option<&str>) -> Option<String> {
    let event = event.map(|text| {
        text.lines()
            .filter(|line| line.trim() != EVENT_SEPARATOR)
            .collect::<Vec<_>>()
            .join("\n")
    });
    let event = event.as_deref().filter(|text| !text.trim().is_empty());
    let existing = existing.map(str::trim_end).filter(|s| !s.trim().is_empty());

    match (existing, event) {
        (Some(existing), Some(event)) => Some(format!("{}\n{}\n{}", existing, EVENT_SEPARATOR, event)),
        (Some(existing), None) => Some(format!("{}\n{}", existing, EVENT_SEPARATOR)),
        (None, event) => event.map(String::from),
    }
}

fn block_line(label: &str, tags: &[String], note_label: &str, note: &str) -> String {
    let mut line = format!("{}: [{}]", label, tags.join(", "));
    if !note.is_empty() {
        line.push_str(&format!(" | {}: \"{}\"", note_label, note));
    }
    line
}

/// Tags are written comma-separated inside brackets, so they cannot carry
/// separators of their own.
fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.replace(|c: char| matches!(c, ',' | '[' | ']' | '\n' | '\r'), " "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Notes must stay on one line; other whitespace is kept as written.
fn clean_note(note: &str) -> String {
    note.replace("\r\n", " ")
        .replace(|c: char| matches!(c, '\n' | '\r'), " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::{decode, latest_event};

    fn report(id: &str, damages: &[&str], note: &str, suggestions: &[&str], extra: &str) -> DamageReport {
        DamageReport {
            resource_id: id.to_string(),
            damages: damages.iter().map(|s| s.to_string()).collect(),
            damage_note: note.to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            suggestion_note: extra.to_string(),
        }
    }

    #[test]
    fn test_encode_full_report() {
        let text = encode(
            &[report("R1", &["Cracked Screen", "Broken Hinge"], "dropped", &["Add case"], "fragile")],
            Some("2024-03-01 10:00:00"),
        );
        assert_eq!(
            text,
            "[2024-03-01 10:00:00]\n\
             [Resource ID R1]\n\
             Damages: [Cracked Screen, Broken Hinge] | Notes: \"dropped\"\n\
             Suggestions: [Add case] | Additional Notes: \"fragile\""
        );
    }

    #[test]
    fn test_encode_omits_empty_note_suffix() {
        let text = encode(&[report("9", &["Dent"], "", &[], "")], None);
        assert_eq!(text, "[Resource ID 9]\nDamages: [Dent]");
    }

    #[test]
    fn test_encode_skips_empty_and_anonymous_reports() {
        let text = encode(
            &[report("1", &[], "", &[], ""), report("  ", &["Dent"], "", &[], "")],
            Some("2024-03-01"),
        );
        assert_eq!(text, "");
    }

    #[test]
    fn test_encode_folds_multiline_notes() {
        let text = encode(&[report("2", &["Scratch"], "top\r\nand  bottom", &[], "")], None);
        assert_eq!(text, "[Resource ID 2]\nDamages: [Scratch] | Notes: \"top and  bottom\"");
    }

    #[test]
    fn test_round_trip() {
        let reports = vec![
            report("1", &["Cracked Screen", "Broken Hinge"], "dropped", &[], ""),
            report("2", &[], "", &["Replace battery"], "drains fast"),
            report("3", &["Dent"], "", &["Check hinge"], ""),
            report("4", &[], "only a note", &[], ""),
            report("5", &[], "", &[], ""),
        ];

        let text = encode(&reports, Some("2024-01-15 09:30:00"));
        let decoded = decode(Some(text.as_str()));

        assert_eq!(decoded.timestamp.as_deref(), Some("2024-01-15 09:30:00"));
        let expected: Vec<_> = reports.into_iter().filter(|r| !r.is_empty()).collect();
        assert_eq!(decoded.reports.len(), expected.len());
        for report in &expected {
            assert!(decoded.reports.contains(report), "missing {:?}", report);
        }
    }

    #[test]
    fn test_round_trip_keeps_note_spacing() {
        let reports = vec![report("8", &["Dent"], "left  side,  near hinge", &[], "")];
        let decoded = decode(Some(encode(&reports, None).as_str()));
        assert_eq!(decoded.reports, reports);
    }

    #[test]
    fn test_unwritable_resource_ids() {
        assert!(is_writable_resource_id("12"));
        assert!(is_writable_resource_id(" R1 "));
        assert!(!is_writable_resource_id(""));
        assert!(!is_writable_resource_id("7]"));
        assert!(!is_writable_resource_id("5\nDamages: [Injected]"));
        assert!(!is_writable_resource_id("5\r"));
    }

    #[test]
    fn test_hostile_ids_do_not_leak_into_other_reports() {
        let reports = vec![
            report("1", &["Dent"], "", &[], ""),
            report("7]", &["Crack"], "", &[], ""),
            report("5\nDamages: [Injected]", &[], "", &["Wipe"], ""),
        ];

        let text = encode(&reports, Some("2024-01-15 09:30:00"));
        assert_eq!(text, "[2024-01-15 09:30:00]\n[Resource ID 1]\nDamages: [Dent]");

        let decoded = decode(Some(text.as_str()));
        assert_eq!(decoded.reports, vec![report("1", &["Dent"], "", &[], "")]);
    }

    #[test]
    fn test_timestamp_stays_on_one_line() {
        let text = encode(&[report("1", &["Dent"], "", &[], "")], Some("2024-01-15\nDamages: [Fake]"));
        let decoded = decode(Some(text.as_str()));
        assert_eq!(decoded.timestamp.as_deref(), Some("2024-01-15 Damages: [Fake]"));
        assert_eq!(decoded.reports[0].damages, vec!["Dent"]);
    }

    #[test]
    fn test_append_event() {
        assert_eq!(append_event(None, None), None);
        assert_eq!(append_event(Some("  "), Some("x")), Some("x".to_string()));
        assert_eq!(append_event(Some("prior\n"), None), Some("prior\n---".to_string()));
        assert_eq!(
            append_event(Some("prior"), Some("[Resource ID 1]")),
            Some("prior\n---\n[Resource ID 1]".to_string())
        );
        assert_eq!(append_event(None, Some("a\n---\nb")), Some("a\nb".to_string()));
    }

    #[test]
    fn test_event_after_creation_notes_keeps_timestamp() {
        let event = encode(&[report("3", &["Dent"], "", &[], "")], Some("2024-01-15 09:30:00"));
        let notes = append_event(Some("[fragile] handle with care"), Some(event.as_str())).unwrap();

        let decoded = decode(Some(latest_event(&notes)));
        assert_eq!(decoded.timestamp.as_deref(), Some("2024-01-15 09:30:00"));
        assert_eq!(decoded.reports, vec![report("3", &["Dent"], "", &[], "")]);
    }

    #[test]
    fn test_creation_notes_with_separator_are_not_decoded() {
        let notes = append_event(Some("before\n---\nDamages: [Old]"), None).unwrap();
        assert!(decode(Some(latest_event(&notes))).reports.is_empty());
    }
}
