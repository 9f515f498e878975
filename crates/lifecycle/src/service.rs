use crate::{
    clock::Clock,
    error::{Error, Invalid, Result},
    validate,
};
use core::{future::Future, time::Duration};
use db::{Filter, Store};
use model::{QuizId, QuizInput, QuizSummary};
use std::sync::Arc;
use tokio::time;

/// Awaits one store round-trip, giving up after `limit`. Every failure is logged here, once.
/// A row refused by the store's own constraints can never succeed, so it is not reported as an outage.
pub(crate) async fn bounded<T, F>(limit: Duration, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = db::error::Result<T>>,
{
    match time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err @ db::error::Error::Invariant)) => {
            log::warn!("Store refused {op}: {err}");
            Err(Error::Validation(Invalid::Unstorable))
        }
        Ok(Err(err)) => {
            log::error!("Store failed during {op}: {err}");
            Err(Error::StoreUnavailable)
        }
        Err(_) => {
            log::error!("Store did not answer {op} within {limit:?}.");
            Err(Error::StoreUnavailable)
        }
    }
}

/// Entry point for every request-driven quiz operation.
pub struct Service<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    /// Upper bound on a single store round-trip.
    timeout: Duration,
}

impl<S: Store, C: Clock> Service<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>, timeout: Duration) -> Self {
        Self { store, clock, timeout }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Validates the input and persists it as a new, inactive quiz.
    pub async fn create_quiz(&self, input: QuizInput) -> Result<QuizId> {
        let quiz = validate::validate(input)?;
        let id = bounded(self.timeout, "insert", self.store.insert(&quiz)).await?;
        log::info!("Created quiz {id} open from {} to {}.", quiz.start_date, quiz.end_date);
        Ok(id)
    }

    /// Quizzes whose window contains the current instant. The cached `active` flag is ignored.
    pub async fn list_active_quizzes(&self) -> Result<Vec<QuizSummary>> {
        let now = self.clock.now();
        bounded(self.timeout, "active listing", self.store.find_where(Filter::OpenAt(now))).await
    }

    /// Every quiz regardless of its window, including those that have not started yet.
    pub async fn list_all_quizzes(&self) -> Result<Vec<QuizSummary>> {
        bounded(self.timeout, "full listing", self.store.find_where(Filter::All)).await
    }

    /// Reveals the one-based right answer once the disclosure delay after the end date has passed.
    pub async fn get_result(&self, id: &str) -> Result<u16> {
        let id: QuizId = id.parse().map_err(|_| Error::InvalidId)?;
        let quiz = bounded(self.timeout, "lookup", self.store.find_by_id(id)).await?.ok_or(Error::NotFound)?;
        let now = self.clock.now();
        if !quiz.raw.disclosed_at().is_some_and(|at| now >= at) {
            return Err(Error::NotYetAvailable);
        }
        Ok(quiz.raw.right_answer)
    }
}
