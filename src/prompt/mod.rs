//! Sectioned, deterministically-recombining prompt model (C11).

mod editable;

pub use editable::{EditablePrompt, EditablePromptData, EditablePromptSection, SectionSource};
