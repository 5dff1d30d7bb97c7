//! Subject entity types (C10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SubjectError;

/// The kind of persistent entity a [`Subject`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// A named character.
    Character,
    /// A named animal.
    Animal,
    /// A named inanimate object.
    Object,
    /// A named vehicle.
    Vehicle,
    /// A background or setting.
    Background,
}

impl SubjectType {
    /// A short glyph used by [`crate::subjects::SubjectRegistry::build_carryover_prompt`]
    /// to visually distinguish subject kinds.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Character => "🧑",
            Self::Animal => "🐾",
            Self::Object => "📦",
            Self::Vehicle => "🚗",
            Self::Background => "🏞",
        }
    }
}

/// An inline reference image attached to a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImageData {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
}

/// Caller-supplied fields for [`crate::subjects::SubjectRegistry::register`]
///. The registry assigns `id` and `created_at`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectInput {
    /// Display name. Must be non-empty.
    pub name: String,
    /// The kind of entity.
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    /// Free-form description. Must be non-empty.
    pub description: String,
    /// Distinguishing visual features. Must contain at least one entry.
    pub key_features: Vec<String>,
    /// The cut (shot) this subject was first introduced in.
    pub origin_cut_id: String,
    /// Whether this subject's description should be re-injected into
    /// subsequent prompts in the session.
    #[serde(default)]
    pub carryover: bool,
    /// Free-form tags, indexed for [`crate::subjects::SubjectRegistry::search`].
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional inline reference image.
    #[serde(default)]
    pub reference_image: Option<ReferenceImageData>,
}

impl SubjectInput {
    pub(crate) fn validate(&self) -> Result<(), SubjectError> {
        if self.name.trim().is_empty() {
            return Err(SubjectError::InvalidSubject("name must not be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(SubjectError::InvalidSubject("description must not be empty".to_string()));
        }
        if self.key_features.is_empty() {
            return Err(SubjectError::InvalidSubject("key_features must have at least one entry".to_string()));
        }
        Ok(())
    }
}

/// A persistent entity carried across generation calls within a session
/// (spec §3, GLOSSARY: "Carryover").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identity, assigned at registration.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// The kind of entity.
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    /// Free-form description.
    pub description: String,
    /// Distinguishing visual features.
    pub key_features: Vec<String>,
    /// The cut this subject was first introduced in.
    pub origin_cut_id: String,
    /// Whether this subject's description is injected into subsequent prompts.
    pub carryover: bool,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// When this subject was registered.
    pub created_at: DateTime<Utc>,
    /// The most recent cut this subject was used in, if any.
    pub last_used_in_cut_id: Option<String>,
    /// Optional inline reference image.
    pub reference_image: Option<ReferenceImageData>,
}

impl Subject {
    pub(crate) fn from_input(input: SubjectInput, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            subject_type: input.subject_type,
            description: input.description,
            key_features: input.key_features,
            origin_cut_id: input.origin_cut_id,
            carryover: input.carryover,
            tags: input.tags,
            created_at,
            last_used_in_cut_id: None,
            reference_image: input.reference_image,
        }
    }
}

/// Predicates for [`crate::subjects::SubjectRegistry::search`]; every
/// supplied field must match (spec §4.12: "intersected across supplied predicates").
#[derive(Debug, Clone, Default)]
pub struct SubjectQuery {
    /// Case-insensitive substring match against `name`.
    pub name: Option<String>,
    /// Exact match against any of `tags`.
    pub tag: Option<String>,
    /// Exact match against `subject_type`.
    pub subject_type: Option<SubjectType>,
    /// If true, only subjects with `carryover == true` match.
    pub carryover_only: bool,
}
