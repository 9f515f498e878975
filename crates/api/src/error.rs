use crate::Body;
use core::{
    fmt::{self, Display},
    time::Duration,
};
use hyper::{
    header::{HeaderValue, ALLOW, CONTENT_TYPE, RETRY_AFTER},
    Response, StatusCode,
};

#[derive(Debug)]
pub enum Error {
    UnknownRoute,
    /// Carries the one method the route does accept.
    MethodNotAllowed(&'static str),
    /// Neither JSON nor a URL-encoded form.
    UnsupportedMedia,
    MalformedBody,
    TooLarge,
    /// Carries how long until the client may try again.
    RateLimited(Duration),
    Lifecycle(lifecycle::Error),
    Fatal,
}

impl From<lifecycle::Error> for Error {
    fn from(err: lifecycle::Error) -> Self {
        Self::Lifecycle(err)
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        use lifecycle::Error as Lifecycle;
        match self {
            Self::UnknownRoute => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMedia | Self::MalformedBody => StatusCode::BAD_REQUEST,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Lifecycle(Lifecycle::Validation(_) | Lifecycle::InvalidId) => StatusCode::BAD_REQUEST,
            Self::Lifecycle(Lifecycle::NotFound) => StatusCode::NOT_FOUND,
            Self::Lifecycle(Lifecycle::NotYetAvailable) => StatusCode::FORBIDDEN,
            Self::Lifecycle(Lifecycle::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error as `{"error": "..."}` with the matching status code.
    pub fn into_response(self) -> Response<Body> {
        let text = serde_json::json!({ "error": self.to_string() }).to_string();
        let mut res = Response::new(Body::from(text));
        *res.status_mut() = self.status();

        let head = res.headers_mut();
        assert!(head.insert(CONTENT_TYPE, HeaderValue::from_static(crate::APPLICATION_JSON)).is_none());
        match self {
            Self::RateLimited(wait) => {
                // Round up so that clients never retry a moment too early.
                let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                assert!(head.insert(RETRY_AFTER, HeaderValue::from(secs.max(1))).is_none());
            }
            Self::MethodNotAllowed(allowed) => {
                assert!(head.insert(ALLOW, HeaderValue::from_static(allowed)).is_none());
            }
            _ => (),
        }
        res
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRoute => f.write_str("not found"),
            Self::MethodNotAllowed(_) => f.write_str("method not allowed"),
            Self::UnsupportedMedia => f.write_str("unsupported media type or empty body"),
            Self::MalformedBody => f.write_str("invalid request body"),
            Self::TooLarge => f.write_str("request body too large"),
            Self::RateLimited(_) => f.write_str("rate limit exceeded"),
            Self::Lifecycle(err) => Display::fmt(err, f),
            Self::Fatal => f.write_str("internal server error"),
        }
    }
}
