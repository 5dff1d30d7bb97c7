//! Bounded keyed subject store with secondary name/tag indexes (C10).

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use uuid::Uuid;

use crate::error::SubjectError;

use super::similarity::{find_similar, SimilarityMatch};
use super::types::{Subject, SubjectInput, SubjectQuery, SubjectType};

const DEFAULT_CAPACITY: usize = 50;

/// Indexed, capacity-bounded store of [`Subject`] entities.
///
/// Eviction is LRU over insertion *and* access: every [`Self::register`],
/// [`Self::recall`], and [`Self::recall_by_name`] moves the touched subject
/// to the back of an internal recency queue; when a new subject would push
/// the store over capacity, the front of that queue is evicted first and
/// scrubbed from every index, so all three indexes stay consistent.
pub struct SubjectRegistry {
    capacity: usize,
    by_id: HashMap<Uuid, Subject>,
    by_name: HashMap<String, HashSet<Uuid>>,
    by_tag: HashMap<String, HashSet<Uuid>>,
    recency: VecDeque<Uuid>,
}

impl Default for SubjectRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SubjectRegistry {
    /// Construct a registry with the given capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            by_tag: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    fn touch(&mut self, id: Uuid) {
        if let Some(pos) = self.recency.iter().position(|existing| *existing == id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(id);
    }

    fn index_insert(&mut self, subject: &Subject) {
        self.by_name
            .entry(subject.name.to_lowercase())
            .or_default()
            .insert(subject.id);
        for tag in &subject.tags {
            self.by_tag.entry(tag.clone()).or_default().insert(subject.id);
        }
    }

    fn index_remove(&mut self, subject: &Subject) {
        if let Some(ids) = self.by_name.get_mut(&subject.name.to_lowercase()) {
            ids.remove(&subject.id);
            if ids.is_empty() {
                self.by_name.remove(&subject.name.to_lowercase());
            }
        }
        for tag in &subject.tags {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.remove(&subject.id);
                if ids.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    fn evict_lru(&mut self) {
        if let Some(evicted_id) = self.recency.pop_front() {
            if let Some(subject) = self.by_id.remove(&evicted_id) {
                self.index_remove(&subject);
            }
        }
    }

    /// Validate, assign a fresh id and `created_at`, and insert `input` into
    /// every index. Evicts the least-recently-used subject first if the
    /// registry is at capacity.
    pub fn register(&mut self, input: SubjectInput) -> Result<Subject, SubjectError> {
        input.validate()?;

        while self.by_id.len() >= self.capacity {
            self.evict_lru();
        }

        let id = Uuid::new_v4();
        let subject = Subject::from_input(input, id, Utc::now());
        self.index_insert(&subject);
        self.by_id.insert(id, subject.clone());
        self.touch(id);
        Ok(subject)
    }

    /// Recall a subject by id, refreshing its recency on a hit.
    pub fn recall(&mut self, id: Uuid) -> Option<Subject> {
        if self.by_id.contains_key(&id) {
            self.touch(id);
        }
        self.by_id.get(&id).cloned()
    }

    /// Recall by name: an exact (case-insensitive) match first, falling
    /// back to a case-insensitive substring match.
    pub fn recall_by_name(&mut self, name: &str) -> Option<Subject> {
        let lower = name.to_lowercase();
        if let Some(ids) = self.by_name.get(&lower) {
            if let Some(id) = ids.iter().next().copied() {
                return self.recall(id);
            }
        }

        let matched_id = self
            .by_id
            .values()
            .find(|subject| subject.name.to_lowercase().contains(&lower))
            .map(|subject| subject.id)?;
        self.recall(matched_id)
    }

    /// Search subjects matching every supplied predicate in `query`.
    pub fn search(&self, query: &SubjectQuery) -> Vec<Subject> {
        let tag_ids: Option<&HashSet<Uuid>> = match &query.tag {
            Some(tag) => self.by_tag.get(tag),
            None => None,
        };
        if query.tag.is_some() && tag_ids.is_none() {
            return Vec::new();
        }

        self.by_id
            .values()
            .filter(|subject| {
                query
                    .name
                    .as_ref()
                    .is_none_or(|name| subject.name.to_lowercase().contains(&name.to_lowercase()))
            })
            .filter(|subject| tag_ids.is_none_or(|ids| ids.contains(&subject.id)))
            .filter(|subject| query.subject_type.is_none_or(|t| subject.subject_type == t))
            .filter(|subject| !query.carryover_only || subject.carryover)
            .cloned()
            .collect()
    }

    /// Set a subject's `carryover` flag.
    pub fn set_carryover(&mut self, id: Uuid, carryover: bool) -> Result<(), SubjectError> {
        let subject = self.by_id.get_mut(&id).ok_or(SubjectError::NotFound(id))?;
        subject.carryover = carryover;
        Ok(())
    }

    /// All subjects currently flagged `carryover == true`.
    pub fn carryover_subjects(&self) -> Vec<Subject> {
        self.by_id.values().filter(|s| s.carryover).cloned().collect()
    }

    /// Record that `id` was used in `cut_id`.
    pub fn mark_used_in_cut(&mut self, id: Uuid, cut_id: impl Into<String>) -> Result<(), SubjectError> {
        let subject = self.by_id.get_mut(&id).ok_or(SubjectError::NotFound(id))?;
        subject.last_used_in_cut_id = Some(cut_id.into());
        Ok(())
    }

    /// Remove a subject from every index atomically.
    pub fn delete(&mut self, id: Uuid) -> Option<Subject> {
        let subject = self.by_id.remove(&id)?;
        self.index_remove(&subject);
        if let Some(pos) = self.recency.iter().position(|existing| *existing == id) {
            self.recency.remove(pos);
        }
        Some(subject)
    }

    /// Empty every index.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
        self.by_tag.clear();
        self.recency.clear();
    }

    /// Number of subjects currently registered.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry holds no subjects.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Score every registered subject against `target_name`/`target_features`
    /// (spec §4.12, delegates to [`find_similar`]).
    pub fn find_similar(&self, target_name: &str, target_features: &[String]) -> Vec<SimilarityMatch> {
        let all: Vec<Subject> = self.by_id.values().cloned().collect();
        find_similar(&all, target_name, target_features)
    }

    /// All current subjects, for serialization (spec §4.12 `toJSON`).
    pub fn to_json(&self) -> Vec<Subject> {
        self.by_id.values().cloned().collect()
    }

    /// Rebuild a registry's contents from previously exported subjects,
    /// silently skipping entries that fail validation (spec §4.12 `fromJSON`).
    pub fn from_json(&mut self, subjects: Vec<Subject>) {
        for subject in subjects {
            if subject.name.trim().is_empty() || subject.description.trim().is_empty() || subject.key_features.is_empty() {
                continue;
            }
            while self.by_id.len() >= self.capacity {
                self.evict_lru();
            }
            self.index_insert(&subject);
            let id = subject.id;
            self.by_id.insert(id, subject);
            self.touch(id);
        }
    }

    /// Build the canonical multi-line carryover block: one line per
    /// carryover subject with a type glyph, its description, and its
    /// features; empty when no subject is carried over.
    pub fn build_carryover_prompt(&self) -> String {
        let mut carried: Vec<Subject> = self.carryover_subjects();
        carried.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        carried
            .iter()
            .map(|subject| {
                format!(
                    "{} {} ({}): {} [{}]",
                    subject.subject_type.glyph(),
                    subject.name,
                    subject.description,
                    subject.key_features.join(", "),
                    subject.origin_cut_id
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> SubjectInput {
        SubjectInput {
            name: name.to_string(),
            subject_type: SubjectType::Character,
            description: "a description".to_string(),
            key_features: vec!["tall".to_string()],
            origin_cut_id: "cut-1".to_string(),
            carryover: false,
            tags: vec!["hero".to_string()],
            reference_image: None,
        }
    }

    #[test]
    fn register_validates_required_fields() {
        let mut registry = SubjectRegistry::default();
        let mut bad = input("");
        bad.name = String::new();
        assert!(registry.register(bad).is_err());
    }

    #[test]
    fn recall_by_name_exact_then_substring() {
        let mut registry = SubjectRegistry::default();
        let subject = registry.register(input("Captain Orion")).unwrap();
        assert_eq!(registry.recall_by_name("Captain Orion").unwrap().id, subject.id);
        assert_eq!(registry.recall_by_name("orion").unwrap().id, subject.id);
    }

    #[test]
    fn indexes_stay_consistent_after_delete() {
        let mut registry = SubjectRegistry::default();
        let subject = registry.register(input("Fox")).unwrap();
        registry.delete(subject.id);
        assert!(registry.recall(subject.id).is_none());
        assert!(registry.recall_by_name("Fox").is_none());
        assert!(registry.search(&SubjectQuery { tag: Some("hero".to_string()), ..Default::default() }).is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut registry = SubjectRegistry::new(2);
        let first = registry.register(input("A")).unwrap();
        let _second = registry.register(input("B")).unwrap();
        registry.recall(first.id); // refresh A's recency
        let _third = registry.register(input("C")).unwrap(); // evicts B, not A
        assert!(registry.recall(first.id).is_some());
        assert_eq!(registry.len(), 2);
        assert!(registry.recall_by_name("B").is_none());
    }

    #[test]
    fn search_intersects_predicates() {
        let mut registry = SubjectRegistry::default();
        let mut hero = input("Hero");
        hero.carryover = true;
        registry.register(hero).unwrap();
        registry.register(input("Sidekick")).unwrap();

        let results = registry.search(&SubjectQuery {
            tag: Some("hero".to_string()),
            carryover_only: true,
            ..Default::default()
        });
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Hero");
    }

    #[test]
    fn round_trip_preserves_fields() {
        let mut registry = SubjectRegistry::default();
        let subject = registry.register(input("Fox")).unwrap();
        let exported = registry.to_json();

        let mut restored = SubjectRegistry::default();
        restored.from_json(exported);

        let found = restored.recall(subject.id).unwrap();
        assert_eq!(found.name, subject.name);
        assert_eq!(found.subject_type, subject.subject_type);
        assert_eq!(found.key_features, subject.key_features);
        assert_eq!(found.carryover, subject.carryover);
        assert_eq!(found.tags, subject.tags);
    }

    #[test]
    fn from_json_skips_malformed_entries() {
        let mut registry = SubjectRegistry::default();
        let mut good = registry.register(input("Fox")).unwrap();
        good.key_features.clear();
        let mut restored = SubjectRegistry::default();
        restored.from_json(vec![good]);
        assert!(restored.is_empty());
    }

    #[test]
    fn carryover_prompt_empty_when_none_carried() {
        let mut registry = SubjectRegistry::default();
        registry.register(input("Fox")).unwrap();
        assert_eq!(registry.build_carryover_prompt(), "");
    }

    #[test]
    fn carryover_prompt_lists_each_carried_subject() {
        let mut registry = SubjectRegistry::default();
        let mut carried = input("Fox");
        carried.carryover = true;
        registry.register(carried).unwrap();
        let prompt = registry.build_carryover_prompt();
        assert!(prompt.contains("Fox"));
        assert!(prompt.contains("tall"));
    }
}
