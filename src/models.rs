//! Core data types for the Covet backend.
//!
//! A [`Pin`] is a stored image+text record; a [`PinCandidate`] is the
//! transient form the curation endpoint accepts; a [`CuratedItem`] is a
//! candidate annotated with the reason it was picked.

use serde::{Deserialize, Serialize};

/// A saved pin, as persisted in SQLite and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub id: i64,
    pub image: String,
    #[serde(default)]
    pub text: String,
    /// Milliseconds since the Unix epoch; listing sorts by this, newest first.
    #[serde(rename = "savedAt")]
    pub saved_at: i64,
}

/// Curation input: a pin as the client sees it. The `id` is optional so the
/// extension can curate over pins it has not saved (or re-send stored ones).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub image: String,
    #[serde(default)]
    pub text: String,
}

impl From<Pin> for PinCandidate {
    fn from(pin: Pin) -> Self {
        Self {
            id: Some(pin.id),
            image: pin.image,
            text: pin.text,
        }
    }
}

/// A curated pick: the candidate plus a human-readable justification.
/// Built per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub image: String,
    #[serde(default)]
    pub text: String,
    pub reason: String,
}

impl CuratedItem {
    pub fn new(candidate: &PinCandidate, reason: impl Into<String>) -> Self {
        Self {
            id: candidate.id,
            image: candidate.image.clone(),
            text: candidate.text.clone(),
            reason: reason.into(),
        }
    }
}
