//! Nearest-reference matching of probe embeddings against a session roster.

use crate::types::{confidence_from_distance, Embedding, RosterEntry, StudentId};

/// Reference embeddings for one label.
#[derive(Debug, Clone)]
struct LabeledReferences {
    label: StudentId,
    name: String,
    references: Vec<Embedding>,
}

/// Matcher input: label → reference embeddings, ordered by ascending label.
///
/// The ordering is load-bearing: equidistant candidates resolve to the
/// lowest student id because traversal keeps the first strict minimum.
#[derive(Debug, Clone, Default)]
pub struct LabeledDescriptorSet {
    entries: Vec<LabeledReferences>,
}

impl LabeledDescriptorSet {
    /// Build the set from roster entries, skipping students without any
    /// reference embedding.
    pub fn from_roster(roster: &[RosterEntry]) -> Self {
        let mut entries: Vec<LabeledReferences> = roster
            .iter()
            .filter(|e| !e.references.is_empty())
            .map(|e| LabeledReferences {
                label: e.user_id,
                name: e.name.clone(),
                references: e.references.clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.label);
        Self { entries }
    }

    /// Insert references for a label, keeping the ascending-id order.
    /// Labels with no references are ignored.
    pub fn insert(&mut self, label: StudentId, name: &str, references: Vec<Embedding>) {
        if references.is_empty() {
            return;
        }
        let entry = LabeledReferences {
            label,
            name: name.to_string(),
            references,
        };
        match self.entries.binary_search_by_key(&label, |e| e.label) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn name_of(&self, label: StudentId) -> Option<&str> {
        self.entries
            .binary_search_by_key(&label, |e| e.label)
            .ok()
            .map(|idx| self.entries[idx].name.as_str())
    }
}

/// Outcome of matching one probe embedding against the descriptor set.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Best distance seen across all references; infinite for an empty set.
    pub distance: f32,
    /// Confidence of the best distance (`1 − distance`, clamped at zero).
    pub confidence: f32,
    pub label: Option<StudentId>,
    pub name: Option<String>,
}

impl MatchResult {
    fn no_match(distance: f32) -> Self {
        Self {
            matched: false,
            distance,
            confidence: confidence_from_distance(distance),
            label: None,
            name: None,
        }
    }
}

/// Strategy for finding the best-matching label for a probe embedding.
pub trait Matcher {
    fn best_match(
        &self,
        probe: &Embedding,
        set: &LabeledDescriptorSet,
        min_confidence: f32,
    ) -> MatchResult;
}

/// Euclidean nearest-reference matcher.
///
/// Takes the minimum distance per label, then the global minimum across
/// labels; accepts only when the resulting confidence clears the configured
/// floor, which rejects unknown faces and weak matches alike.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn best_match(
        &self,
        probe: &Embedding,
        set: &LabeledDescriptorSet,
        min_confidence: f32,
    ) -> MatchResult {
        let mut best_distance = f32::INFINITY;
        let mut best: Option<&LabeledReferences> = None;

        for entry in &set.entries {
            let label_best = entry
                .references
                .iter()
                .map(|r| probe.distance(r))
                .fold(f32::INFINITY, f32::min);

            // Strict `<` keeps the earlier (lowest-id) label on exact ties.
            if label_best < best_distance {
                best_distance = label_best;
                best = Some(entry);
            }
        }

        let Some(entry) = best else {
            return MatchResult::no_match(f32::INFINITY);
        };

        let confidence = confidence_from_distance(best_distance);
        if confidence < min_confidence {
            return MatchResult::no_match(best_distance);
        }

        MatchResult {
            matched: true,
            distance: best_distance,
            confidence,
            label: Some(entry.label),
            name: Some(entry.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(entries: &[(StudentId, &str, Vec<Vec<f32>>)]) -> LabeledDescriptorSet {
        let mut set = LabeledDescriptorSet::default();
        for (label, name, refs) in entries {
            set.insert(
                *label,
                name,
                refs.iter().map(|v| Embedding::new(v.clone())).collect(),
            );
        }
        set
    }

    #[test]
    fn test_match_within_threshold() {
        // Reference at distance 0.3 → confidence 0.7 ≥ 0.6 → match.
        let set = set_of(&[(1, "S1", vec![vec![0.3, 0.0]])]);
        let probe = Embedding::new(vec![0.0, 0.0]);

        let result = NearestMatcher.best_match(&probe, &set, 0.6);
        assert!(result.matched);
        assert_eq!(result.label, Some(1));
        assert_eq!(result.name.as_deref(), Some("S1"));
        assert!((result.distance - 0.3).abs() < 1e-6);
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_weak_match_rejected() {
        // Distance 0.5 → confidence 0.5 < 0.6 → no match.
        let set = set_of(&[(1, "S1", vec![vec![0.5, 0.0]])]);
        let probe = Embedding::new(vec![0.0, 0.0]);

        let result = NearestMatcher.best_match(&probe, &set, 0.6);
        assert!(!result.matched);
        assert_eq!(result.label, None);
        assert!((result.distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_set_never_matches() {
        let probe = Embedding::new(vec![0.1, 0.2]);
        let result = NearestMatcher.best_match(&probe, &LabeledDescriptorSet::default(), 0.0);
        assert!(!result.matched);
        assert_eq!(result.label, None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_never_matches_above_threshold_distance() {
        // Whatever the gallery, a returned label must satisfy the floor.
        let set = set_of(&[
            (1, "a", vec![vec![0.9, 0.0], vec![0.8, 0.1]]),
            (2, "b", vec![vec![0.0, 0.7]]),
            (3, "c", vec![vec![0.45, 0.45]]),
        ]);
        let probe = Embedding::new(vec![0.0, 0.0]);

        for threshold in [0.4, 0.6, 0.8] {
            let result = NearestMatcher.best_match(&probe, &set, threshold);
            if result.matched {
                assert!(result.confidence >= threshold);
                assert!(result.distance <= 1.0 - threshold + 1e-6);
            }
        }
    }

    #[test]
    fn test_per_label_minimum_wins() {
        // Label 2's second reference is the closest overall.
        let set = set_of(&[
            (1, "a", vec![vec![0.4, 0.0]]),
            (2, "b", vec![vec![0.9, 0.9], vec![0.1, 0.0]]),
        ]);
        let probe = Embedding::new(vec![0.0, 0.0]);

        let result = NearestMatcher.best_match(&probe, &set, 0.5);
        assert!(result.matched);
        assert_eq!(result.label, Some(2));
        assert!((result.distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_tie_resolves_to_lowest_id() {
        // Both labels sit at exactly the same distance from the probe.
        let set = set_of(&[
            (7, "late", vec![vec![0.2, 0.0]]),
            (3, "early", vec![vec![0.0, 0.2]]),
        ]);
        let probe = Embedding::new(vec![0.0, 0.0]);

        let result = NearestMatcher.best_match(&probe, &set, 0.5);
        assert!(result.matched);
        assert_eq!(result.label, Some(3));
    }

    #[test]
    fn test_from_roster_skips_unenrolled() {
        use crate::types::RosterEntry;

        let roster = vec![
            RosterEntry {
                user_id: 10,
                name: "enrolled".into(),
                identifier: "2141001".into(),
                references: vec![Embedding::new(vec![0.1, 0.1])],
                already_present: false,
            },
            RosterEntry {
                user_id: 11,
                name: "unenrolled".into(),
                identifier: "2141002".into(),
                references: vec![],
                already_present: false,
            },
        ];

        let set = LabeledDescriptorSet::from_roster(&roster);
        assert_eq!(set.len(), 1);
        assert_eq!(set.name_of(10), Some("enrolled"));
        assert_eq!(set.name_of(11), None);
    }
}
