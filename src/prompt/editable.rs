//! Sectioned prompt model with deterministic recombination (C11).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PromptError;

/// Where a section's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionSource {
    /// Typed or pasted directly by a human.
    Manual,
    /// Produced by the streaming axis analysis pipeline (C8).
    Analysis,
    /// Produced by a refinement pass over an earlier section.
    Refined,
}

/// One section of an [`EditablePrompt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditablePromptSection {
    /// Stable identifier, unique within one prompt.
    pub id: String,
    /// Short human-readable label.
    pub label: String,
    /// The section's text.
    pub content: String,
    /// Where this content originated.
    pub source: SectionSource,
    /// Whether [`EditablePrompt::edit_section`] has touched this section
    /// since it was added.
    pub modified: bool,
}

/// The plain-record form produced by [`EditablePrompt::to_data`] and
/// consumed by [`EditablePrompt::from_data`], round-tripping losslessly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditablePromptData {
    /// Sections, in insertion order.
    pub sections: Vec<EditablePromptSection>,
    /// The result of [`EditablePrompt::combine`] at the time of export.
    pub combined: String,
    /// When this data was produced.
    pub updated_at: DateTime<Utc>,
}

/// An ordered collection of named prompt sections that recombine
/// deterministically.
///
/// Sections are kept in a plain `Vec` rather than a map: the spec's
/// invariant is insertion order, and a linear scan over the handful of
/// sections a single prompt ever holds is simpler than maintaining a
/// separate index.
#[derive(Debug, Clone, Default)]
pub struct EditablePrompt {
    sections: Vec<EditablePromptSection>,
}

impl EditablePrompt {
    /// Construct an empty prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new section with `modified = false`. If `id` already
    /// exists, its section is replaced in place (position preserved).
    pub fn add_section(&mut self, id: impl Into<String>, label: impl Into<String>, content: impl Into<String>, source: SectionSource) {
        let id = id.into();
        let section = EditablePromptSection {
            id: id.clone(),
            label: label.into(),
            content: content.into(),
            source,
            modified: false,
        };
        if let Some(existing) = self.sections.iter_mut().find(|s| s.id == id) {
            *existing = section;
        } else {
            self.sections.push(section);
        }
    }

    /// Update a section's content, marking it `modified`.
    ///
    /// Returns [`PromptError::UnknownSection`] if no section with `id` exists.
    pub fn edit_section(&mut self, id: &str, content: impl Into<String>) -> Result<(), PromptError> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PromptError::UnknownSection(id.to_string()))?;
        section.content = content.into();
        section.modified = true;
        Ok(())
    }

    /// A section by id, if present.
    pub fn section(&self, id: &str) -> Option<&EditablePromptSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// All sections, in insertion order.
    pub fn sections(&self) -> &[EditablePromptSection] {
        &self.sections
    }

    /// Join the non-empty, trimmed contents of every section with `". "`
    /// and append a trailing period.
    pub fn combine(&self) -> String {
        let parts: Vec<&str> = self
            .sections
            .iter()
            .map(|s| s.content.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if parts.is_empty() {
            return String::new();
        }
        format!("{}.", parts.join(". "))
    }

    /// Export this prompt as a plain record.
    pub fn to_data(&self) -> EditablePromptData {
        EditablePromptData {
            sections: self.sections.clone(),
            combined: self.combine(),
            updated_at: Utc::now(),
        }
    }

    /// Reconstruct a prompt from a previously exported [`EditablePromptData`],
    /// preserving section order, content, source, and the `modified` flag
    ///.
    pub fn from_data(data: EditablePromptData) -> Self {
        Self { sections: data.sections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_marks_modified_and_updates_content() {
        let mut prompt = EditablePrompt::new();
        prompt.add_section("intro", "Intro", "a cat", SectionSource::Manual);
        prompt.edit_section("intro", "a fluffy cat").unwrap();
        let section = prompt.section("intro").unwrap();
        assert!(section.modified);
        assert_eq!(section.content, "a fluffy cat");
    }

    #[test]
    fn editing_unknown_section_errors() {
        let mut prompt = EditablePrompt::new();
        let err = prompt.edit_section("missing", "x").unwrap_err();
        assert!(matches!(err, PromptError::UnknownSection(_)));
    }

    #[test]
    fn combine_joins_nonempty_trimmed_sections_with_trailing_period() {
        let mut prompt = EditablePrompt::new();
        prompt.add_section("a", "A", "  first  ", SectionSource::Manual);
        prompt.add_section("b", "B", "", SectionSource::Analysis);
        prompt.add_section("c", "C", "second", SectionSource::Refined);
        assert_eq!(prompt.combine(), "first. second.");
    }

    #[test]
    fn combine_of_empty_prompt_is_empty_string() {
        let prompt = EditablePrompt::new();
        assert_eq!(prompt.combine(), "");
    }

    #[test]
    fn round_trip_preserves_order_content_source_and_modified() {
        let mut prompt = EditablePrompt::new();
        prompt.add_section("a", "A", "alpha", SectionSource::Manual);
        prompt.add_section("b", "B", "beta", SectionSource::Analysis);
        prompt.edit_section("b", "beta-edited").unwrap();

        let data = prompt.to_data();
        let restored = EditablePrompt::from_data(data);

        assert_eq!(restored.sections().len(), 2);
        assert_eq!(restored.sections()[0].id, "a");
        assert_eq!(restored.sections()[1].id, "b");
        assert_eq!(restored.sections()[1].content, "beta-edited");
        assert!(restored.sections()[1].modified);
        assert!(!restored.sections()[0].modified);
    }
}
