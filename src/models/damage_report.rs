//! Damage / suggestion report carried in a loan's notes

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-resource damage and suggestion report for one return event.
///
/// Never stored as a row: it only exists as the decoding of the loan notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DamageReport {
    /// Resource identifier as written in the notes (`default` when no marker preceded it)
    pub resource_id: String,
    #[serde(default)]
    pub damages: Vec<String>,
    #[serde(default)]
    pub damage_note: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub suggestion_note: String,
}

impl DamageReport {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }

    /// True when the report carries no damage, suggestion or note
    pub fn is_empty(&self) -> bool {
        self.damages.is_empty()
            && self.suggestions.is_empty()
            && self.damage_note.is_empty()
            && self.suggestion_note.is_empty()
    }

    pub fn has_damage(&self) -> bool {
        !self.damages.is_empty()
    }
}

/// Result of decoding a notes field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DecodedNotes {
    /// Leading `[<timestamp>]` line, verbatim
    pub timestamp: Option<String>,
    pub reports: Vec<DamageReport>,
}
