//! Curriculum (knowledge graph)
//!
//! Skills keep the order they were declared in; the sequencer walks them in
//! that order. Prerequisites must reference skills of the same curriculum and
//! must not form a cycle.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::CurriculumError;
use super::types::SkillId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    #[serde(default)]
    pub prerequisites: Vec<SkillId>,
}

impl Skill {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prerequisites: Vec::new(),
        }
    }

    pub fn requires(mut self, prerequisite: impl Into<String>) -> Self {
        self.prerequisites.push(prerequisite.into());
        self
    }
}

/// Entry of the JSON graph form `{"id": {"name": ..., "prerequisites": [...]}}`.
#[derive(Debug, Deserialize)]
struct SkillEntry {
    name: Option<String>,
    #[serde(default)]
    prerequisites: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Curriculum {
    skills: Vec<Skill>,
    index: HashMap<SkillId, usize>,
}

impl Curriculum {
    pub fn new(skills: Vec<Skill>) -> Result<Self, CurriculumError> {
        if skills.is_empty() {
            return Err(CurriculumError::Empty);
        }

        let mut index = HashMap::with_capacity(skills.len());
        for (i, skill) in skills.iter().enumerate() {
            if index.insert(skill.id.clone(), i).is_some() {
                return Err(CurriculumError::DuplicateSkill(skill.id.clone()));
            }
        }

        for skill in &skills {
            if let Some(missing) = skill.prerequisites.iter().find(|p| !index.contains_key(*p)) {
                return Err(CurriculumError::UnknownPrerequisite {
                    skill: skill.id.clone(),
                    prerequisite: missing.clone(),
                });
            }
        }

        let curriculum = Self { skills, index };
        curriculum.check_acyclic()?;
        Ok(curriculum)
    }

    pub fn from_json(input: &str) -> Result<Self, CurriculumError> {
        let graph: IndexMap<String, SkillEntry> =
            serde_json::from_str(input).map_err(|e| CurriculumError::Json(e.to_string()))?;
        Self::from_graph(graph)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CurriculumError> {
        let graph: IndexMap<String, SkillEntry> =
            serde_json::from_value(value).map_err(|e| CurriculumError::Json(e.to_string()))?;
        Self::from_graph(graph)
    }

    fn from_graph(graph: IndexMap<String, SkillEntry>) -> Result<Self, CurriculumError> {
        let skills = graph
            .into_iter()
            .map(|(id, entry)| Skill {
                name: entry
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| id.clone()),
                id,
                prerequisites: entry.prerequisites,
            })
            .collect();
        Self::new(skills)
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.index.get(id).map(|&i| &self.skills[i])
    }

    pub fn skill(&self, id: &str) -> Result<&Skill, CurriculumError> {
        self.get(id)
            .ok_or_else(|| CurriculumError::UnknownSkill(id.to_string()))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    fn check_acyclic(&self) -> Result<(), CurriculumError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.skills.len()];

        for start in 0..self.skills.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            // (skill index, next prerequisite to visit)
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::InProgress;

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let prereqs = &self.skills[node].prerequisites;
                if top.1 < prereqs.len() {
                    let child = self.index[&prereqs[top.1]];
                    top.1 += 1;
                    match marks[child] {
                        Mark::InProgress => {
                            return Err(CurriculumError::Cycle(self.skills[child].id.clone()))
                        }
                        Mark::Unvisited => {
                            marks[child] = Mark::InProgress;
                            stack.push((child, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}
