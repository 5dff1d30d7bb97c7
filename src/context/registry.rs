//! Process-wide mutable agent context with a deduplicating session window (C5).
//!
//! Owned exclusively by the agent worker: single-threaded
//! access means no external locking is needed, and callers only ever see
//! immutable snapshots produced by [`ContextRegistry::get`].

use chrono::{DateTime, Utc};

use crate::resilience::{SlidingWindow, SlidingWindowConfig};

const SESSION_WINDOW_CAPACITY: usize = 20;
const SESSION_WINDOW_TTL_MS: u64 = 60 * 60 * 1000;

/// A partial update applied by [`ContextRegistry::update`]; unset fields are
/// left untouched.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ContextUpdate {
    /// New value for the last prompt seen, if the caller set one.
    pub last_prompt: Option<String>,
    /// New value for the last refined prompt, if the caller set one.
    pub last_refined_prompt: Option<String>,
    /// New value for the active shot count, if the caller set one.
    pub active_shot_count: Option<u32>,
    /// Session identifiers to merge into the deduplicating session window.
    pub session_ids: Vec<String>,
    /// New value for the cached flag, if the caller set one.
    pub cached: Option<bool>,
}

/// An immutable snapshot of the agent context at the moment of [`ContextRegistry::get`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentContextSnapshot {
    /// The last prompt observed, if any.
    pub last_prompt: Option<String>,
    /// The last refined prompt observed, if any.
    pub last_refined_prompt: Option<String>,
    /// Number of shots currently considered active.
    pub active_shot_count: u32,
    /// Deduplicated session identifiers currently within the session window.
    pub session_ids: Vec<String>,
    /// Whether the last operation was served from cache.
    pub cached: bool,
    /// When the context was last mutated.
    pub last_activity: DateTime<Utc>,
    /// Milliseconds since a prompt field was last set; `0` if never set.
    pub prompt_edit_idle_ms: u64,
}

/// The mutable context registry. Not `Send`/`Sync` by design — it is meant
/// to live entirely inside the single-threaded agent worker task.
pub struct ContextRegistry {
    last_prompt: Option<String>,
    last_refined_prompt: Option<String>,
    active_shot_count: u32,
    cached: bool,
    last_activity: DateTime<Utc>,
    last_prompt_timestamp: Option<DateTime<Utc>>,
    session_window: SlidingWindow<String, String>,
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self {
            last_prompt: None,
            last_refined_prompt: None,
            active_shot_count: 0,
            cached: false,
            last_activity: Utc::now(),
            last_prompt_timestamp: None,
            session_window: SlidingWindow::new(SlidingWindowConfig {
                max_entries: SESSION_WINDOW_CAPACITY,
                max_age: std::time::Duration::from_millis(SESSION_WINDOW_TTL_MS),
            }),
        }
    }

    /// Merge a partial update into the context.
    ///
    /// Non-session fields are overwritten only where the update sets them.
    /// Each session id is added to the deduplicating, age-bounded session
    /// window. Setting either prompt field records the current time as the
    /// prompt-edit timestamp, which [`Self::get`] uses to derive
    /// `prompt_edit_idle_ms`.
    pub fn update(&mut self, update: ContextUpdate) {
        let mut touched_prompt = false;

        if let Some(prompt) = update.last_prompt {
            self.last_prompt = Some(prompt);
            touched_prompt = true;
        }
        if let Some(refined) = update.last_refined_prompt {
            self.last_refined_prompt = Some(refined);
            touched_prompt = true;
        }
        if let Some(count) = update.active_shot_count {
            self.active_shot_count = count;
        }
        if let Some(cached) = update.cached {
            self.cached = cached;
        }
        for id in update.session_ids {
            self.session_window.add(id.clone(), id);
        }

        self.last_activity = Utc::now();
        if touched_prompt {
            self.last_prompt_timestamp = Some(self.last_activity);
        }
    }

    /// Produce an immutable snapshot of the current context.
    pub fn get(&mut self) -> AgentContextSnapshot {
        let prompt_edit_idle_ms = self
            .last_prompt_timestamp
            .map(|ts| (Utc::now() - ts).num_milliseconds().max(0) as u64)
            .unwrap_or(0);

        AgentContextSnapshot {
            last_prompt: self.last_prompt.clone(),
            last_refined_prompt: self.last_refined_prompt.clone(),
            active_shot_count: self.active_shot_count,
            session_ids: self.session_window.get_keys().into_iter().cloned().collect(),
            cached: self.cached,
            last_activity: self.last_activity,
            prompt_edit_idle_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_deduplicated() {
        let mut registry = ContextRegistry::new();
        registry.update(ContextUpdate {
            session_ids: vec!["s1".to_string(), "s2".to_string()],
            ..Default::default()
        });
        registry.update(ContextUpdate {
            session_ids: vec!["s1".to_string()],
            ..Default::default()
        });
        let snapshot = registry.get();
        assert_eq!(snapshot.session_ids.len(), 2);
    }

    #[test]
    fn prompt_edit_idle_is_zero_before_any_prompt() {
        let mut registry = ContextRegistry::new();
        let snapshot = registry.get();
        assert_eq!(snapshot.prompt_edit_idle_ms, 0);
    }

    #[test]
    fn non_session_fields_merge_without_clobbering_others() {
        let mut registry = ContextRegistry::new();
        registry.update(ContextUpdate {
            last_prompt: Some("a prompt".to_string()),
            active_shot_count: Some(3),
            ..Default::default()
        });
        registry.update(ContextUpdate {
            cached: Some(true),
            ..Default::default()
        });
        let snapshot = registry.get();
        assert_eq!(snapshot.last_prompt.as_deref(), Some("a prompt"));
        assert_eq!(snapshot.active_shot_count, 3);
        assert!(snapshot.cached);
    }
}
