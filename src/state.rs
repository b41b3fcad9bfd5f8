use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, QuestionSourceKind};
use crate::services::curriculum_designer::CurriculumDesigner;
use crate::services::llm_provider::LLMProvider;
use crate::services::question_source::{
    LlmQuestionSource, Question, QuestionBank, QuestionError, QuestionSource,
};
use crate::tutor::{Curriculum, LearnerId, MasteryStore, MasteryTracker};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    tracker: MasteryTracker,
    store: MasteryStore,
    curriculum: RwLock<Option<Arc<Curriculum>>>,
    questions: Arc<dyn QuestionSource>,
    designer: Option<CurriculumDesigner>,
    /// One open question per learner; serving a new one replaces it.
    pending: Mutex<HashMap<LearnerId, Question>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        tracker: MasteryTracker,
        questions: Arc<dyn QuestionSource>,
        designer: Option<CurriculumDesigner>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tracker,
                store: MasteryStore::new(),
                curriculum: RwLock::new(None),
                questions,
                designer,
                pending: Mutex::new(HashMap::new()),
                started_at: Instant::now(),
            }),
        }
    }

    /// Wires the question backend and curriculum designer from the environment.
    pub fn from_config(config: &Config, tracker: MasteryTracker) -> Result<Self, QuestionError> {
        let provider = LLMProvider::from_env();
        let designer = provider
            .is_available()
            .then(|| CurriculumDesigner::new(provider.clone()));
        if designer.is_none() {
            tracing::warn!("LLM provider not configured, curriculum generation disabled");
        }

        let questions: Arc<dyn QuestionSource> = match config.question_source {
            QuestionSourceKind::Llm => Arc::new(LlmQuestionSource::new(provider)),
            QuestionSourceKind::Bank => {
                let bank = match config.question_bank_path {
                    Some(ref path) => QuestionBank::from_file(path)?,
                    None => QuestionBank::default(),
                };
                tracing::info!(items = bank.len(), "question bank loaded");
                Arc::new(bank)
            }
        };
        tracing::info!(source = questions.name(), "question source ready");

        Ok(Self::new(tracker, questions, designer))
    }

    pub fn tracker(&self) -> &MasteryTracker {
        &self.inner.tracker
    }

    pub fn store(&self) -> &MasteryStore {
        &self.inner.store
    }

    pub fn questions(&self) -> &dyn QuestionSource {
        self.inner.questions.as_ref()
    }

    pub fn designer(&self) -> Option<&CurriculumDesigner> {
        self.inner.designer.as_ref()
    }

    pub fn curriculum(&self) -> Option<Arc<Curriculum>> {
        self.inner.curriculum.read().clone()
    }

    pub fn set_curriculum(&self, curriculum: Curriculum) -> Arc<Curriculum> {
        let curriculum = Arc::new(curriculum);
        *self.inner.curriculum.write() = Some(Arc::clone(&curriculum));
        // questions for the old graph can no longer be answered meaningfully
        self.inner.pending.lock().clear();
        curriculum
    }

    /// Makes `question` the learner's open question, dropping any earlier one.
    pub fn hold_question(&self, learner_id: &str, question: Question) {
        if let Some(replaced) = self.inner.pending.lock().insert(learner_id.to_string(), question) {
            tracing::debug!(learner_id, question_id = %replaced.id, "unanswered question replaced");
        }
    }

    /// Puts a question back after a failed grading, unless the learner has
    /// been served a newer one in the meantime.
    pub fn restore_question(&self, learner_id: &str, question: Question) {
        self.inner
            .pending
            .lock()
            .entry(learner_id.to_string())
            .or_insert(question);
    }

    /// Removes and returns the learner's open question if it has this id.
    pub fn take_question(&self, learner_id: &str, question_id: &str) -> Option<Question> {
        let mut pending = self.inner.pending.lock();
        match pending.get(learner_id) {
            Some(q) if q.id == question_id => pending.remove(learner_id),
            _ => None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
