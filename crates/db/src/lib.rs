pub mod error;
mod memory;

use core::future::Future;
use futures_util::TryStreamExt;

pub use memory::MemoryStore;
pub use model::{DateTime, Quiz, QuizId, QuizSummary, RawQuiz, Utc};
pub use tokio_postgres::{tls::NoTls, Client, Config};

const SCHEMA: &str = include_str!("schema.sql");

/// Row selection shared by queries and bulk updates. Every time-based predicate is inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    All,
    /// `start_date <= t <= end_date`
    OpenAt(DateTime<Utc>),
    /// `start_date <= t`
    StartedBy(DateTime<Utc>),
    /// `end_date <= t`
    EndedBy(DateTime<Utc>),
}

impl Filter {
    pub fn matches(&self, quiz: &RawQuiz) -> bool {
        match *self {
            Self::All => true,
            Self::OpenAt(now) => quiz.is_open_at(now),
            Self::StartedBy(now) => quiz.start_date <= now,
            Self::EndedBy(now) => quiz.end_date <= now,
        }
    }

    /// SQL `WHERE` clause (with a leading space) whose only placeholder, if any, is `$1`.
    fn clause(&self) -> (&'static str, Option<DateTime<Utc>>) {
        match *self {
            Self::All => ("", None),
            Self::OpenAt(now) => (" WHERE start_date <= $1 AND end_date >= $1", Some(now)),
            Self::StartedBy(now) => (" WHERE start_date <= $1", Some(now)),
            Self::EndedBy(now) => (" WHERE end_date <= $1", Some(now)),
        }
    }
}

/// Persistence contract for quizzes. Implementations own id assignment.
pub trait Store: Send + Sync + 'static {
    /// Persists a new quiz as inactive and returns its freshly assigned identifier.
    fn insert(&self, quiz: &RawQuiz) -> impl Future<Output = error::Result<QuizId>> + Send;

    fn find_by_id(&self, id: QuizId) -> impl Future<Output = error::Result<Option<Quiz>>> + Send;

    /// Public projections of every matching quiz, in ascending id order.
    fn find_where(&self, filter: Filter) -> impl Future<Output = error::Result<Vec<QuizSummary>>> + Send;

    /// Sets the cached `active` flag of every matching quiz. Returns the number of matched rows.
    fn update_many_where(&self, filter: Filter, active: bool) -> impl Future<Output = error::Result<u64>> + Send;
}

pub struct Database(Client);

impl From<Client> for Database {
    fn from(client: Client) -> Self {
        Self(client)
    }
}

/// Checks a stored one-based answer against the number of options it indexes into.
fn right_answer_from_column(raw: i16, options: usize) -> error::Result<u16> {
    let answer = u16::try_from(raw).map_err(|_| error::Error::Schema)?;
    if !(1..=options).contains(&usize::from(answer)) {
        return Err(error::Error::Schema);
    }
    Ok(answer)
}

fn deserialize_raw_quiz_from_row(row: &tokio_postgres::Row) -> error::Result<RawQuiz> {
    let column = |_| error::Error::Schema;
    let question = row.try_get("question").map_err(column)?;
    let options: Vec<String> = row.try_get("options").map_err(column)?;
    let right_answer = row.try_get("right_answer").map_err(column)?;
    let start_date = row.try_get("start_date").map_err(column)?;
    let end_date = row.try_get("end_date").map_err(column)?;
    let right_answer = right_answer_from_column(right_answer, options.len())?;
    Ok(RawQuiz { question, options, right_answer, start_date, end_date })
}

fn deserialize_id_from_row(row: &tokio_postgres::Row) -> error::Result<QuizId> {
    let id: i64 = row.try_get("id").map_err(|_| error::Error::Schema)?;
    QuizId::new(id).ok_or(error::Error::Schema)
}

fn deserialize_quiz_from_row(row: tokio_postgres::Row) -> error::Result<Quiz> {
    let id = deserialize_id_from_row(&row)?;
    let active = row.try_get("active").map_err(|_| error::Error::Schema)?;
    let raw = deserialize_raw_quiz_from_row(&row)?;
    Ok(Quiz { id, active, raw })
}

fn deserialize_summary_from_row(row: tokio_postgres::Row) -> error::Result<QuizSummary> {
    let id = deserialize_id_from_row(&row)?;
    let question = row.try_get("question").map_err(|_| error::Error::Schema)?;
    let options = row.try_get("options").map_err(|_| error::Error::Schema)?;
    Ok(QuizSummary { id, question, options })
}

impl Database {
    /// Creates the `quiz` table and its indices if they do not exist yet.
    pub async fn ensure_schema(&self) -> error::Result<()> {
        self.0.batch_execute(SCHEMA).await?;
        Ok(())
    }
}

impl Store for Database {
    async fn insert(&self, quiz: &RawQuiz) -> error::Result<QuizId> {
        let right_answer = i16::try_from(quiz.right_answer).map_err(|_| error::Error::Invariant)?;
        let row = self
            .0
            .query_one(
                "INSERT INTO quiz (question, options, right_answer, start_date, end_date) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
                &[&quiz.question, &quiz.options, &right_answer, &quiz.start_date, &quiz.end_date],
            )
            .await?;
        deserialize_id_from_row(&row)
    }

    async fn find_by_id(&self, id: QuizId) -> error::Result<Option<Quiz>> {
        let qid = id.get();
        let Some(row) = self
            .0
            .query_opt(
                "SELECT id, question, options, right_answer, start_date, end_date, active FROM quiz WHERE id = $1",
                &[&qid],
            )
            .await?
        else {
            return Ok(None);
        };
        deserialize_quiz_from_row(row).map(Some)
    }

    async fn find_where(&self, filter: Filter) -> error::Result<Vec<QuizSummary>> {
        let (clause, now) = filter.clause();
        let query = format!("SELECT id, question, options FROM quiz{clause} ORDER BY id");
        self.0
            .query_raw(query.as_str(), now.iter())
            .await?
            .map_err(error::Error::from)
            .and_then(|row| core::future::ready(deserialize_summary_from_row(row)))
            .try_collect()
            .await
    }

    async fn update_many_where(&self, filter: Filter, active: bool) -> error::Result<u64> {
        let (clause, now) = filter.clause();
        let value = if active { "TRUE" } else { "FALSE" };
        let query = format!("UPDATE quiz SET active = {value}{clause}");
        let count = self.0.execute_raw(query.as_str(), now.iter()).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::{error::Error, right_answer_from_column, Config, Database, DateTime, Filter, NoTls, RawQuiz, Store, Utc};

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn filters_are_inclusive() {
        let quiz = RawQuiz {
            question: String::from("Q?"),
            options: vec![String::from("a"), String::from("b")],
            right_answer: 1,
            start_date: at("2024-05-01T10:00:00Z"),
            end_date: at("2024-05-01T11:00:00Z"),
        };

        assert!(Filter::All.matches(&quiz));
        assert!(Filter::OpenAt(quiz.start_date).matches(&quiz));
        assert!(Filter::OpenAt(quiz.end_date).matches(&quiz));
        assert!(!Filter::OpenAt(at("2024-05-01T09:59:59Z")).matches(&quiz));
        assert!(!Filter::OpenAt(at("2024-05-01T11:00:01Z")).matches(&quiz));
        assert!(Filter::StartedBy(quiz.start_date).matches(&quiz));
        assert!(!Filter::StartedBy(at("2024-05-01T09:59:59Z")).matches(&quiz));
        assert!(Filter::EndedBy(quiz.end_date).matches(&quiz));
        assert!(!Filter::EndedBy(at("2024-05-01T10:59:59Z")).matches(&quiz));
    }

    #[test]
    fn stored_answers_must_index_their_options() {
        assert_eq!(right_answer_from_column(1, 2), Ok(1));
        assert_eq!(right_answer_from_column(3, 3), Ok(3));
        assert_eq!(right_answer_from_column(i16::MAX, usize::from(i16::MAX.unsigned_abs())), Ok(i16::MAX.unsigned_abs()));
        for (raw, options) in [(0, 2), (3, 2), (-1, 2), (i16::MIN, 2), (-1, usize::from(u16::MAX))] {
            assert_eq!(right_answer_from_column(raw, options), Err(Error::Schema), "{raw} of {options}");
        }
    }

    #[test]
    fn clauses_bind_at_most_one_timestamp() {
        let now = at("2024-05-01T10:30:00Z");
        assert_eq!(Filter::All.clause(), ("", None));
        assert_eq!(Filter::OpenAt(now).clause(), (" WHERE start_date <= $1 AND end_date >= $1", Some(now)));
        assert_eq!(Filter::StartedBy(now).clause(), (" WHERE start_date <= $1", Some(now)));
        assert_eq!(Filter::EndedBy(now).clause(), (" WHERE end_date <= $1", Some(now)));
    }

    #[tokio::test(flavor = "current_thread")]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn database_test() {
        use std::env::var;
        let user = var("PG_USERNAME").unwrap();
        let pass = var("PG_PASSWORD").unwrap();
        let host = var("PG_HOSTNAME").unwrap();
        let data = var("PG_DATABASE").unwrap();

        let (client, conn) = Config::new()
            .user(&user)
            .password(&pass)
            .host(&host)
            .dbname(&data)
            .port(5432)
            .connect(NoTls)
            .await
            .expect("cannot connect to database");
        let handle = tokio::spawn(conn);
        let db = Database::from(client);
        db.ensure_schema().await.unwrap();

        // Quiz creation
        let quiz = RawQuiz {
            question: String::from("What is the largest planet in the solar system?"),
            options: vec![String::from("Mercury"), String::from("Jupiter"), String::from("Pluto")],
            right_answer: 2,
            start_date: at("2001-01-01T00:00:00Z"),
            end_date: at("2001-01-01T01:00:00Z"),
        };
        let id = db.insert(&quiz).await.unwrap();

        // Initial retrieval
        let stored = db.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.raw, quiz);
        assert!(!stored.active);

        // Listing
        let all = db.find_where(Filter::All).await.unwrap();
        assert!(all.iter().any(|summary| summary.id == id));
        let open = db.find_where(Filter::OpenAt(at("2001-01-01T00:30:00Z"))).await.unwrap();
        assert!(open.iter().any(|summary| summary.id == id));
        let open = db.find_where(Filter::OpenAt(at("2001-01-01T02:00:00Z"))).await.unwrap();
        assert!(open.iter().all(|summary| summary.id != id));

        // Bulk updates
        let now = at("2001-01-01T00:30:00Z");
        assert!(db.update_many_where(Filter::StartedBy(now), true).await.unwrap() >= 1);
        assert!(db.find_by_id(id).await.unwrap().unwrap().active);
        let later = at("2001-01-01T03:00:00Z");
        assert!(db.update_many_where(Filter::EndedBy(later), false).await.unwrap() >= 1);
        assert!(!db.find_by_id(id).await.unwrap().unwrap().active);

        // Constraint violations surface as invariant errors
        let broken = RawQuiz { right_answer: 4, ..quiz };
        assert_eq!(db.insert(&broken).await.unwrap_err(), super::error::Error::Invariant);

        drop(db);
        handle.await.unwrap().unwrap();
    }
}
