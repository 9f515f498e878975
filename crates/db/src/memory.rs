use crate::{error, Filter, Quiz, QuizId, QuizSummary, RawQuiz, Store};
use std::{collections::BTreeMap, sync::RwLock};

#[derive(Default)]
struct Inner {
    /// Last identifier handed out. Identifiers are never reused.
    last: i64,
    quizzes: BTreeMap<QuizId, Quiz>,
}

/// Volatile store that keeps every quiz in process memory.
#[derive(Default)]
pub struct MemoryStore(RwLock<Inner>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the cached `active` flag of one quiz without going through the reconciler.
    #[cfg(feature = "testing")]
    pub fn force_active(&self, id: QuizId, active: bool) -> bool {
        let Ok(mut inner) = self.0.write() else {
            return false;
        };
        match inner.quizzes.get_mut(&id) {
            Some(quiz) => {
                quiz.active = active;
                true
            }
            None => false,
        }
    }
}

impl Store for MemoryStore {
    async fn insert(&self, quiz: &RawQuiz) -> error::Result<QuizId> {
        if !(1..=quiz.options.len()).contains(&usize::from(quiz.right_answer)) || quiz.start_date >= quiz.end_date {
            return Err(error::Error::Invariant);
        }

        let mut inner = self.0.write().map_err(|_| error::Error::Unavailable)?;
        let next = inner.last.checked_add(1).ok_or(error::Error::Unavailable)?;
        let id = QuizId::new(next).ok_or(error::Error::Unavailable)?;
        inner.last = next;
        inner.quizzes.insert(id, Quiz { id, active: false, raw: quiz.clone() });
        Ok(id)
    }

    async fn find_by_id(&self, id: QuizId) -> error::Result<Option<Quiz>> {
        let inner = self.0.read().map_err(|_| error::Error::Unavailable)?;
        Ok(inner.quizzes.get(&id).cloned())
    }

    async fn find_where(&self, filter: Filter) -> error::Result<Vec<QuizSummary>> {
        let inner = self.0.read().map_err(|_| error::Error::Unavailable)?;
        Ok(inner.quizzes.values().filter(|quiz| filter.matches(&quiz.raw)).map(Quiz::summary).collect())
    }

    async fn update_many_where(&self, filter: Filter, active: bool) -> error::Result<u64> {
        let mut inner = self.0.write().map_err(|_| error::Error::Unavailable)?;
        let mut count = 0;
        for quiz in inner.quizzes.values_mut().filter(|quiz| filter.matches(&quiz.raw)) {
            quiz.active = active;
            count += 1;
        }
        Ok(count)
    }
}
