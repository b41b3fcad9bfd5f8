//! In-memory mastery store keyed by (learner, skill).
//!
//! Read-modify-write of one pair runs under that pair's lock, so two answers
//! for the same learner and skill never overwrite each other. Distinct pairs
//! do not contend beyond the short map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::types::{LearnerId, MasteryState, SkillId};

type Key = (LearnerId, SkillId);

#[derive(Debug, Default)]
pub struct MasteryStore {
    entries: RwLock<HashMap<Key, Arc<Mutex<MasteryState>>>>,
}

impl MasteryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, learner: &str, skill: &str) -> Option<MasteryState> {
        let entry = self
            .entries
            .read()
            .get(&(learner.to_string(), skill.to_string()))
            .cloned()?;
        let state = entry.lock().clone();
        Some(state)
    }

    /// All states of one learner, keyed by skill.
    pub fn snapshot(&self, learner: &str) -> HashMap<SkillId, MasteryState> {
        let entries: Vec<(SkillId, Arc<Mutex<MasteryState>>)> = self
            .entries
            .read()
            .iter()
            .filter(|((l, _), _)| l == learner)
            .map(|((_, s), entry)| (s.clone(), Arc::clone(entry)))
            .collect();

        entries
            .into_iter()
            .map(|(skill, entry)| (skill, entry.lock().clone()))
            .collect()
    }

    /// Serialized read-modify-write of one (learner, skill) state.
    ///
    /// `init` builds the state on first contact. If `apply` fails nothing is
    /// stored: an existing state is left as it was and a first-contact state
    /// is not inserted.
    pub fn update<I, F, E>(&self, learner: &str, skill: &str, init: I, apply: F) -> Result<MasteryState, E>
    where
        I: FnOnce() -> MasteryState,
        F: FnOnce(&MasteryState) -> Result<MasteryState, E>,
    {
        let key = (learner.to_string(), skill.to_string());
        let existing = self.entries.read().get(&key).cloned();

        let entry = match existing {
            Some(entry) => entry,
            None => {
                let mut entries = self.entries.write();
                let raced = entries.get(&key).cloned();
                match raced {
                    Some(entry) => entry,
                    None => {
                        // first contact: the write lock keeps racing writers out
                        let next = apply(&init())?;
                        entries.insert(key, Arc::new(Mutex::new(next.clone())));
                        return Ok(next);
                    }
                }
            }
        };

        let mut guard = entry.lock();
        let next = apply(&guard)?;
        *guard = next.clone();
        Ok(next)
    }

    pub fn learner_count(&self) -> usize {
        let entries = self.entries.read();
        let mut learners: Vec<&LearnerId> = entries.keys().map(|(l, _)| l).collect();
        learners.sort();
        learners.dedup();
        learners.len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::tutor::config::TrackerConfig;
    use crate::tutor::error::TrackerError;
    use crate::tutor::tracker::MasteryTracker;

    #[test]
    fn creates_state_lazily_with_prior() {
        let store = MasteryStore::new();
        assert!(store.get("ana", "loops").is_none());

        let state = store
            .update("ana", "loops", || MasteryState::new(0.4).unwrap(), |s| {
                Ok::<_, TrackerError>(s.clone())
            })
            .unwrap();
        assert_eq!(state.p_mastery(), 0.4);
        assert_eq!(store.get("ana", "loops"), Some(state));
    }

    #[test]
    fn failed_first_update_stores_nothing() {
        let store = MasteryStore::new();
        let result = store.update("ana", "loops", MasteryState::default, |_| {
            Err(TrackerError::ZeroStreak)
        });
        assert!(result.is_err());
        assert!(store.get("ana", "loops").is_none());
        assert_eq!(store.learner_count(), 0);
    }

    #[test]
    fn failed_update_keeps_previous_state() {
        let store = MasteryStore::new();
        let tracker = MasteryTracker::new(TrackerConfig::default()).unwrap();
        let first = store
            .update("ana", "loops", MasteryState::default, |s| tracker.observe(s, true))
            .unwrap();

        let result = store.update("ana", "loops", MasteryState::default, |_| {
            Err(TrackerError::ZeroStreak)
        });
        assert!(result.is_err());
        assert_eq!(store.get("ana", "loops"), Some(first));
    }

    #[test]
    fn learners_are_isolated() {
        let store = MasteryStore::new();
        let tracker = MasteryTracker::new(TrackerConfig::default()).unwrap();
        store
            .update("ana", "loops", MasteryState::default, |s| tracker.observe(s, true))
            .unwrap();
        store
            .update("ben", "loops", MasteryState::default, |s| tracker.observe(s, false))
            .unwrap();

        assert!(store.get("ana", "loops").unwrap().p_mastery() > 0.3);
        assert!(store.get("ben", "loops").unwrap().p_mastery() < 0.3);
        assert_eq!(store.snapshot("ana").len(), 1);
        assert_eq!(store.learner_count(), 2);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(MasteryStore::new());
        let tracker = Arc::new(MasteryTracker::new(TrackerConfig::default()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update("ana", "loops", MasteryState::default, |s| {
                                tracker.observe(s, true)
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("ana", "loops").unwrap().attempts().len(), 200);
    }
}
