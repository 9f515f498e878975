use crate::{clock::Clock, error::Result, service::bounded};
use core::time::Duration;
use db::{Filter, Store};
use std::sync::Arc;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

/// Rows touched by one reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub started: u64,
    pub ended: u64,
}

/// Recomputes the cached `active` flag of every quiz from the current time.
pub struct Reconciler<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    timeout: Duration,
}

impl<S: Store, C: Clock> Reconciler<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>, timeout: Duration) -> Self {
        Self { store, clock, timeout }
    }

    /// Marks started quizzes active, then marks ended quizzes inactive, both against the same
    /// instant. The second update must run after the first so that fully elapsed windows end up
    /// inactive.
    pub async fn run_once(&self) -> Result<Tally> {
        let now = self.clock.now();
        let started = self.store.update_many_where(Filter::StartedBy(now), true);
        let started = bounded(self.timeout, "start reconciliation", started).await?;
        let ended = self.store.update_many_where(Filter::EndedBy(now), false);
        let ended = bounded(self.timeout, "end reconciliation", ended).await?;
        Ok(Tally { started, ended })
    }

    /// Runs [`Self::run_once`] on every tick of `period` until the returned handle is shut down
    /// or dropped. The first run happens immediately. Ticks that elapse during a slow run are
    /// skipped, so runs never overlap.
    pub fn spawn(self, period: Duration) -> JobHandle {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            log::info!("Status reconciler started (every {period:?}).");
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => (),
                }

                match self.run_once().await {
                    Ok(Tally { started, ended }) => log::debug!("Reconciled quizzes: {started} started, {ended} ended."),
                    Err(err) => log::error!("Reconciliation failed, retrying on the next tick: {err}"),
                }
            }
            log::info!("Status reconciler stopped.");
        });
        JobHandle { stop, task }
    }
}

/// Owner of a running reconciler task.
pub struct JobHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Signals the task and waits for it. A run already in flight completes first.
    pub async fn shutdown(self) {
        let Self { stop, task } = self;
        // The task may have already exited on its own, in which case nobody listens.
        let _ = stop.send(());
        if let Err(err) = task.await {
            log::error!("Status reconciler task failed: {err}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::{Reconciler, Tally};
    use crate::{clock::ManualClock, error::Error};
    use core::time::Duration;
    use db::{error, Filter, MemoryStore, Quiz, QuizId, QuizSummary, RawQuiz, Store};
    use model::{DateTime, TimeDelta, Utc};
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn quiz(start: DateTime<Utc>, end: DateTime<Utc>) -> RawQuiz {
        RawQuiz {
            question: String::from("Ready?"),
            options: vec![String::from("yes"), String::from("no")],
            right_answer: 1,
            start_date: start,
            end_date: end,
        }
    }

    async fn flags(store: &MemoryStore, ids: &[QuizId]) -> Vec<bool> {
        let mut flags = Vec::with_capacity(ids.len());
        for &id in ids {
            flags.push(store.find_by_id(id).await.unwrap().unwrap().active);
        }
        flags
    }

    #[tokio::test(flavor = "current_thread")]
    async fn flags_follow_the_window() {
        let now = at("2024-10-01T12:00:00Z");
        let hour = TimeDelta::hours(1);
        let store = Arc::new(MemoryStore::new());
        let pending = store.insert(&quiz(now + hour, now + hour * 2)).await.unwrap();
        let open = store.insert(&quiz(now - hour, now + hour)).await.unwrap();
        let closed = store.insert(&quiz(now - hour * 2, now - hour)).await.unwrap();
        let ends_now = store.insert(&quiz(now - hour, now)).await.unwrap();

        let reconciler = Reconciler::new(store.clone(), Arc::new(ManualClock::new(now)), Duration::from_secs(1));
        let tally = reconciler.run_once().await.unwrap();
        assert_eq!(tally, Tally { started: 3, ended: 2 });
        assert_eq!(flags(&store, &[pending, open, closed, ends_now]).await, [false, true, false, false]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn elapsed_windows_are_switched_off_again() {
        let now = at("2024-10-01T12:00:00Z");
        let store = Arc::new(MemoryStore::new());
        let closed = store.insert(&quiz(now - TimeDelta::hours(3), now - TimeDelta::hours(2))).await.unwrap();
        assert!(store.force_active(closed, true));

        let reconciler = Reconciler::new(store.clone(), Arc::new(ManualClock::new(now)), Duration::from_secs(1));
        reconciler.run_once().await.unwrap();
        assert_eq!(flags(&store, &[closed]).await, [false]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn repeated_runs_are_idempotent() {
        let now = at("2024-10-01T12:00:00Z");
        let hour = TimeDelta::hours(1);
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for (start, end) in [(now + hour, now + hour * 2), (now - hour, now + hour), (now - hour * 2, now - hour)] {
            ids.push(store.insert(&quiz(start, end)).await.unwrap());
        }

        let reconciler = Reconciler::new(store.clone(), Arc::new(ManualClock::new(now)), Duration::from_secs(1));
        reconciler.run_once().await.unwrap();
        let once = flags(&store, &ids).await;
        reconciler.run_once().await.unwrap();
        assert_eq!(flags(&store, &ids).await, once);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn flags_track_the_clock_over_time() {
        let start = at("2024-10-01T12:00:00Z");
        let store = Arc::new(MemoryStore::new());
        let id = store.insert(&quiz(start, start + TimeDelta::hours(1))).await.unwrap();
        let clock = Arc::new(ManualClock::new(start - TimeDelta::minutes(1)));
        let reconciler = Reconciler::new(store.clone(), clock.clone(), Duration::from_secs(1));

        let mut seen = Vec::new();
        for step in [TimeDelta::zero(), TimeDelta::minutes(1), TimeDelta::minutes(30), TimeDelta::minutes(30)] {
            clock.advance(step);
            reconciler.run_once().await.unwrap();
            seen.extend(flags(&store, &[id]).await);
        }
        assert_eq!(seen, [false, true, true, false]);
    }

    /// Counts update calls and fails every other one.
    #[derive(Default)]
    struct Flaky {
        calls: AtomicU32,
    }

    impl Store for Flaky {
        async fn insert(&self, _: &RawQuiz) -> error::Result<QuizId> {
            Err(error::Error::Unavailable)
        }

        async fn find_by_id(&self, _: QuizId) -> error::Result<Option<Quiz>> {
            Ok(None)
        }

        async fn find_where(&self, _: Filter) -> error::Result<Vec<QuizSummary>> {
            Ok(Vec::new())
        }

        async fn update_many_where(&self, _: Filter, _: bool) -> error::Result<u64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(error::Error::Unavailable)
            } else {
                Ok(0)
            }
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn store_failures_abort_the_run() {
        let store = Arc::new(Flaky::default());
        let clock = Arc::new(ManualClock::new(at("2024-10-01T12:00:00Z")));
        let reconciler = Reconciler::new(store.clone(), clock, Duration::from_secs(1));
        assert_eq!(reconciler.run_once().await, Err(Error::StoreUnavailable));
        // The end update is skipped once the start update failed.
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn job_survives_failures_and_stops_on_request() {
        let store = Arc::new(Flaky::default());
        let clock = Arc::new(ManualClock::new(at("2024-10-01T12:00:00Z")));
        let job = Reconciler::new(store.clone(), clock, Duration::from_secs(1)).spawn(Duration::from_secs(60));

        // The immediate tick plus three more. Failures must not end the task.
        tokio::time::sleep(Duration::from_secs(181)).await;
        assert!(!job.is_finished());
        let calls = store.calls.load(Ordering::SeqCst);
        assert!(calls >= 4, "only {calls} store calls");

        job.shutdown().await;
        let after = store.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), after);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn job_reconciles_on_schedule() {
        let start = at("2024-10-01T12:00:00Z");
        let store = Arc::new(MemoryStore::new());
        let id = store.insert(&quiz(start + TimeDelta::minutes(1), start + TimeDelta::hours(1))).await.unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let job = Reconciler::new(store.clone(), clock.clone(), Duration::from_secs(1)).spawn(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(flags(&store, &[id]).await, [false]);

        clock.advance(TimeDelta::minutes(2));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(flags(&store, &[id]).await, [true]);

        job.shutdown().await;
    }
}
