use crate::error::Error;
use core::time::Duration;
use hyper::Method;

/// Request-rate ceiling of one route for one client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limit {
    pub max: u32,
    pub window: Duration,
}

const PER_MINUTE: Limit = Limit { max: 10, window: Duration::from_secs(60) };
const PER_DAY: Limit = Limit { max: 1000, window: Duration::from_secs(24 * 60 * 60) };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// `GET /`
    Index,
    /// `POST /quizzes`
    Create,
    /// `GET /quizzes/active`
    Active,
    /// `GET /quizzes/all`
    All,
    /// `GET /quizzes/{id}/result`
    Result,
}

impl Route {
    /// Matches the path first, then the method, so that a known path with the wrong method
    /// yields `405` rather than `404`.
    pub fn resolve(method: &Method, path: &str) -> Result<Self, Error> {
        let route = match path {
            "/" => Self::Index,
            "/quizzes" => Self::Create,
            "/quizzes/active" => Self::Active,
            "/quizzes/all" => Self::All,
            _ if result_id(path).is_some() => Self::Result,
            _ => return Err(Error::UnknownRoute),
        };

        let expected = route.method();
        if method.as_str() != expected {
            return Err(Error::MethodNotAllowed(expected));
        }
        Ok(route)
    }

    /// The only method the route answers to.
    pub const fn method(self) -> &'static str {
        match self {
            Self::Create => "POST",
            _ => "GET",
        }
    }

    pub const fn limit(self) -> Limit {
        match self {
            Self::Index => PER_DAY,
            _ => PER_MINUTE,
        }
    }
}

/// Extracts the raw identifier segment of a `/quizzes/{id}/result` path.
pub fn result_id(path: &str) -> Option<&str> {
    let id = path.strip_prefix("/quizzes/")?.strip_suffix("/result")?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}
