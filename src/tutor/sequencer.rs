use serde::Serialize;

use super::curriculum::{Curriculum, Skill};
use super::tracker::MasteryTracker;
use super::types::MasteryState;

/// One row of a learner's knowledge map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub skill_id: String,
    pub name: String,
    pub p_mastery: f64,
    pub mastered: bool,
    pub unlocked: bool,
    pub attempts: usize,
    pub correct: usize,
}

/// Picks which skill a learner should work on next.
///
/// `lookup` returns the learner's stored state for a skill; skills never
/// engaged fall back to the tracker's prior for that skill.
pub struct Sequencer<'a> {
    curriculum: &'a Curriculum,
    tracker: &'a MasteryTracker,
}

impl<'a> Sequencer<'a> {
    pub fn new(curriculum: &'a Curriculum, tracker: &'a MasteryTracker) -> Self {
        Self {
            curriculum,
            tracker,
        }
    }

    /// First skill in curriculum order that is not mastered and whose
    /// prerequisites all are. `None` once everything is mastered.
    pub fn next_skill<F>(&self, lookup: F) -> Option<&'a Skill>
    where
        F: Fn(&str) -> Option<MasteryState>,
    {
        self.curriculum.skills().iter().find(|skill| {
            !self.mastered(&lookup, &skill.id) && self.unlocked(&lookup, skill)
        })
    }

    pub fn knowledge_map<F>(&self, lookup: F) -> Vec<SkillProgress>
    where
        F: Fn(&str) -> Option<MasteryState>,
    {
        self.curriculum
            .skills()
            .iter()
            .map(|skill| {
                let state = self.state(&lookup, &skill.id);
                SkillProgress {
                    skill_id: skill.id.clone(),
                    name: skill.name.clone(),
                    p_mastery: state.p_mastery(),
                    mastered: self.tracker.is_mastered(&state),
                    unlocked: self.unlocked(&lookup, skill),
                    attempts: state.attempts().len(),
                    correct: state.correct_count(),
                }
            })
            .collect()
    }

    pub fn all_mastered<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<MasteryState>,
    {
        self.curriculum
            .skills()
            .iter()
            .all(|skill| self.mastered(&lookup, &skill.id))
    }

    fn state<F>(&self, lookup: &F, skill_id: &str) -> MasteryState
    where
        F: Fn(&str) -> Option<MasteryState>,
    {
        lookup(skill_id).unwrap_or_else(|| self.tracker.initial_state(skill_id))
    }

    fn mastered<F>(&self, lookup: &F, skill_id: &str) -> bool
    where
        F: Fn(&str) -> Option<MasteryState>,
    {
        self.tracker.is_mastered(&self.state(lookup, skill_id))
    }

    fn unlocked<F>(&self, lookup: &F, skill: &Skill) -> bool
    where
        F: Fn(&str) -> Option<MasteryState>,
    {
        skill
            .prerequisites
            .iter()
            .all(|prereq| self.mastered(lookup, prereq))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::tutor::config::TrackerConfig;
    use crate::tutor::types::Difficulty;

    fn curriculum() -> Curriculum {
        Curriculum::new(vec![
            Skill::new("variables", "Variables"),
            Skill::new("loops", "Loops").requires("variables"),
            Skill::new("strings", "Strings"),
            Skill::new("functions", "Functions").requires("loops"),
        ])
        .unwrap()
    }

    fn known(p: f64) -> MasteryState {
        MasteryState::restore(p, vec![], Difficulty::Medium).unwrap()
    }

    fn tracker() -> MasteryTracker {
        MasteryTracker::new(TrackerConfig::default()).unwrap()
    }

    #[test]
    fn starts_with_first_root_skill() {
        let c = curriculum();
        let t = tracker();
        let seq = Sequencer::new(&c, &t);
        assert_eq!(seq.next_skill(|_| None).unwrap().id, "variables");
    }

    #[test]
    fn skips_locked_skills() {
        let c = curriculum();
        let t = tracker();
        let seq = Sequencer::new(&c, &t);
        let mut states = HashMap::new();
        states.insert("variables", known(0.99));
        states.insert("loops", known(0.5));
        // loops is unlocked and unmastered
        assert_eq!(seq.next_skill(|id| states.get(id).cloned()).unwrap().id, "loops");

        states.insert("loops", known(0.97));
        // strings precedes functions in declaration order
        assert_eq!(seq.next_skill(|id| states.get(id).cloned()).unwrap().id, "strings");
    }

    #[test]
    fn returns_none_when_everything_is_mastered() {
        let c = curriculum();
        let t = tracker();
        let seq = Sequencer::new(&c, &t);
        assert!(seq.next_skill(|_| Some(known(0.96))).is_none());
        assert!(seq.all_mastered(|_| Some(known(0.96))));
    }

    #[test]
    fn knowledge_map_reports_every_skill() {
        let c = curriculum();
        let t = tracker();
        let seq = Sequencer::new(&c, &t);
        let map = seq.knowledge_map(|id| (id == "variables").then(|| known(0.95)));
        assert_eq!(map.len(), 4);
        assert!(map[0].mastered);
        assert!(map[1].unlocked);
        assert!(!map[1].mastered);
        assert_eq!(map[1].p_mastery, 0.3);
        assert!(!map[3].unlocked);
    }
}
