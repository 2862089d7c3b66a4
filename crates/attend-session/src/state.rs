//! Per-label debounce state: `Unseen → Candidate → Confirmed`.
//!
//! The tracker is an explicit keyed map (label → pending confirmation) with
//! transition functions that take the current instant as a parameter. There
//! are no timer handles here; cancellation is removal from the map, so a
//! stale confirmation can never fire after its label has moved on.

use attend_core::StudentId;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

/// Confirmation timer state for one candidate label.
#[derive(Debug, Clone, Copy)]
pub struct PendingConfirmation {
    pub first_seen: Instant,
}

/// A label observed as the best match for one detected face on a tick.
#[derive(Debug, Clone, Copy)]
pub struct ObservedMatch {
    pub label: StudentId,
    pub confidence: f32,
}

/// Transition outcome for one observed label on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelState {
    /// Candidate under confirmation; `remaining` until commit.
    Confirming {
        label: StudentId,
        confidence: f32,
        remaining: Duration,
    },
    /// Held the best match through the whole delay — ready to commit.
    /// Emitted at most once per candidacy.
    Confirmed { label: StudentId, confidence: f32 },
    /// Already marked present in this session; never re-enters Candidate.
    AlreadyMarked { label: StudentId },
}

/// Keyed debounce state for one scan session.
///
/// Distinct labels observed simultaneously each progress through their own
/// independent pending entry. A label absent from a tick's observations is
/// interrupted: its pending entry is removed and any later reappearance
/// starts a fresh candidacy with the full delay.
#[derive(Debug)]
pub struct SessionTracker {
    confirm_delay: Duration,
    pending: HashMap<StudentId, PendingConfirmation>,
    present: HashSet<StudentId>,
}

impl SessionTracker {
    /// `already_present` seeds students the backend has marked before this
    /// scan session started, so they are never re-confirmed.
    pub fn new(
        confirm_delay: Duration,
        already_present: impl IntoIterator<Item = StudentId>,
    ) -> Self {
        Self {
            confirm_delay,
            pending: HashMap::new(),
            present: already_present.into_iter().collect(),
        }
    }

    /// Apply one detection tick's observations at instant `now`.
    ///
    /// Returns one state per distinct observed label. `Confirmed` means the
    /// caller should attempt the attendance write now; the pending entry is
    /// already gone, and only [`complete`](Self::complete) moves the label
    /// into the present set. A failed write therefore drops the label back
    /// to `Unseen`, and re-presenting the face starts a fresh candidacy.
    pub fn observe(&mut self, matches: &[ObservedMatch], now: Instant) -> Vec<LabelState> {
        let observed: HashSet<StudentId> = matches.iter().map(|m| m.label).collect();

        // Interruption: every pending label not re-observed this tick loses
        // its candidacy entirely. Partial progress is never preserved.
        self.pending.retain(|label, p| {
            let keep = observed.contains(label);
            if !keep {
                tracing::debug!(
                    student_id = label,
                    held_for = ?now.duration_since(p.first_seen),
                    "confirmation interrupted"
                );
            }
            keep
        });

        let mut states = Vec::with_capacity(matches.len());
        let mut seen: HashSet<StudentId> = HashSet::new();

        for m in matches {
            // Two faces resolving to the same label on one tick count once.
            if !seen.insert(m.label) {
                continue;
            }

            if self.present.contains(&m.label) {
                states.push(LabelState::AlreadyMarked { label: m.label });
                continue;
            }

            match self.pending.get(&m.label) {
                Some(p) => {
                    let held = now.duration_since(p.first_seen);
                    if held >= self.confirm_delay {
                        self.pending.remove(&m.label);
                        states.push(LabelState::Confirmed {
                            label: m.label,
                            confidence: m.confidence,
                        });
                    } else {
                        states.push(LabelState::Confirming {
                            label: m.label,
                            confidence: m.confidence,
                            remaining: self.confirm_delay - held,
                        });
                    }
                }
                None => {
                    self.pending
                        .insert(m.label, PendingConfirmation { first_seen: now });
                    states.push(LabelState::Confirming {
                        label: m.label,
                        confidence: m.confidence,
                        remaining: self.confirm_delay,
                    });
                }
            }
        }

        states
    }

    /// Record a successful attendance write: the label is now globally
    /// present for the session and can never re-enter Candidate.
    pub fn complete(&mut self, label: StudentId) {
        self.pending.remove(&label);
        self.present.insert(label);
    }

    pub fn is_present(&self, label: StudentId) -> bool {
        self.present.contains(&label)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(500);
    const DELAY: Duration = Duration::from_millis(2000);

    fn s1() -> ObservedMatch {
        ObservedMatch {
            label: 1,
            confidence: 0.8,
        }
    }

    fn s2() -> ObservedMatch {
        ObservedMatch {
            label: 2,
            confidence: 0.75,
        }
    }

    fn at(base: Instant, tick: u32) -> Instant {
        base + TICK * tick
    }

    fn confirmed_labels(states: &[LabelState]) -> Vec<StudentId> {
        states
            .iter()
            .filter_map(|s| match s {
                LabelState::Confirmed { label, .. } => Some(*label),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_continuous_presence_confirms_after_delay() {
        // Ticks at t = 0, 500, 1000, 1500, 2000 ms → confirmed at t = 2000.
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        for tick in 0..4 {
            let states = tracker.observe(&[s1()], at(base, tick));
            assert!(confirmed_labels(&states).is_empty(), "tick {tick}");
        }

        let states = tracker.observe(&[s1()], at(base, 4));
        assert_eq!(confirmed_labels(&states), vec![1]);
    }

    #[test]
    fn test_confirmed_once_then_already_marked() {
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        for tick in 0..=4 {
            tracker.observe(&[s1()], at(base, tick));
        }
        tracker.complete(1);

        // Immediate re-observation: no second confirmation, ever.
        let states = tracker.observe(&[s1()], at(base, 4));
        assert_eq!(states, vec![LabelState::AlreadyMarked { label: 1 }]);
        let states = tracker.observe(&[s1()], at(base, 5));
        assert_eq!(states, vec![LabelState::AlreadyMarked { label: 1 }]);
    }

    #[test]
    fn test_displacement_restarts_the_full_delay() {
        // S1 at t=0,500; S2 at t=1000; S1 again from t=1500 on.
        // S1's timer restarts at 1500 → confirmed at 3500, not 2000.
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        tracker.observe(&[s1()], at(base, 0));
        tracker.observe(&[s1()], at(base, 1));
        tracker.observe(&[s2()], at(base, 2)); // S1 interrupted

        for tick in 3..7 {
            let states = tracker.observe(&[s1()], at(base, tick));
            assert!(
                confirmed_labels(&states).is_empty(),
                "t = {} ms",
                tick * 500
            );
        }

        // t = 3500 ms: 2000 ms after the restart at t = 1500.
        let states = tracker.observe(&[s1()], at(base, 7));
        assert_eq!(confirmed_labels(&states), vec![1]);
    }

    #[test]
    fn test_no_detection_tick_interrupts() {
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        tracker.observe(&[s1()], at(base, 0));
        tracker.observe(&[], at(base, 1)); // face lost
        assert_eq!(tracker.pending_count(), 0);

        // Reappearance needs the full delay again.
        tracker.observe(&[s1()], at(base, 2));
        let states = tracker.observe(&[s1()], at(base, 4));
        assert!(confirmed_labels(&states).is_empty());
        let states = tracker.observe(&[s1()], at(base, 6));
        assert_eq!(confirmed_labels(&states), vec![1]);
    }

    #[test]
    fn test_seeded_present_students_never_confirm() {
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, [1]);

        for tick in 0..=6 {
            let states = tracker.observe(&[s1()], at(base, tick));
            assert_eq!(states, vec![LabelState::AlreadyMarked { label: 1 }]);
        }
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn test_distinct_labels_track_independently() {
        // Two faces in frame with distinct matches: both confirm on their
        // own timers.
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        tracker.observe(&[s1()], at(base, 0));
        for tick in 1..4 {
            tracker.observe(&[s1(), s2()], at(base, tick));
        }
        let states = tracker.observe(&[s1(), s2()], at(base, 4));
        assert_eq!(confirmed_labels(&states), vec![1]);

        let states = tracker.observe(&[s2()], at(base, 5));
        assert_eq!(confirmed_labels(&states), vec![2]);
    }

    #[test]
    fn test_failed_write_returns_label_to_unseen() {
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        for tick in 0..=4 {
            tracker.observe(&[s1()], at(base, tick));
        }
        // Caller's write failed: complete() is never called.
        assert!(!tracker.is_present(1));
        assert_eq!(tracker.pending_count(), 0);

        // The next observation starts a fresh candidacy from scratch.
        let states = tracker.observe(&[s1()], at(base, 5));
        assert_eq!(
            states,
            vec![LabelState::Confirming {
                label: 1,
                confidence: 0.8,
                remaining: DELAY,
            }]
        );
    }

    #[test]
    fn test_duplicate_label_in_one_tick_counts_once() {
        let base = Instant::now();
        let mut tracker = SessionTracker::new(DELAY, []);

        let states = tracker.observe(&[s1(), s1()], at(base, 0));
        assert_eq!(states.len(), 1);
        assert_eq!(tracker.pending_count(), 1);
    }
}
