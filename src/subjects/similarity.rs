//! Jaccard similarity over feature sets, consumed by visual editing (C10).

use std::collections::HashSet;

use super::types::Subject;

const SIMILARITY_THRESHOLD: f64 = 0.15;

fn tokenize(features: &[String]) -> HashSet<String> {
    features.iter().map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty()).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// A candidate subject scored against a target name and feature set.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    /// The matched subject.
    pub subject: Subject,
    /// `1.0` for a name-inclusion match, otherwise the computed Jaccard score.
    pub score: f64,
}

/// Score `candidates` against `target_name`/`target_features` and return the
/// survivors above the threshold, sorted by score descending.
///
/// A case-insensitive substring match of `target_name` within a candidate's
/// name wins unconditionally with score `1.0`; otherwise the score is the
/// Jaccard index over lowercased feature tokens.
pub fn find_similar(candidates: &[Subject], target_name: &str, target_features: &[String]) -> Vec<SimilarityMatch> {
    let target_name_lower = target_name.trim().to_lowercase();
    let target_tokens = tokenize(target_features);

    let mut matches: Vec<SimilarityMatch> = candidates
        .iter()
        .filter_map(|subject| {
            let name_hit = !target_name_lower.is_empty()
                && subject.name.to_lowercase().contains(&target_name_lower);
            let score = if name_hit {
                1.0
            } else {
                jaccard(&target_tokens, &tokenize(&subject.key_features))
            };
            if score >= SIMILARITY_THRESHOLD {
                Some(SimilarityMatch { subject: subject.clone(), score })
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}
