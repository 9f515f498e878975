mod error;
mod limit;
mod payload;
mod quiz;
mod route;

pub use error::Error;
pub use limit::RateLimiter;
pub use payload::{Payload, APPLICATION_JSON, FORM_URLENCODED, MAX_BODY_SIZE};
pub use route::Route;

use db::Store;
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    Request, Response,
};
use lifecycle::{Clock, Service};
use std::{net::IpAddr, sync::Arc, time::Instant};

/// Every response is fully buffered before it is sent.
pub type Body = Full<Bytes>;

const INDEX: &str = include_str!("index.html");

/// Dispatches requests to the quiz service, enforcing per-client rate limits along the way.
pub struct Router<S, C> {
    service: Arc<Service<S, C>>,
    limiter: RateLimiter,
}

impl<S: Store, C: Clock> Router<S, C> {
    pub fn new(service: Arc<Service<S, C>>) -> Self {
        Self { service, limiter: RateLimiter::new() }
    }

    pub fn service(&self) -> &Service<S, C> {
        &self.service
    }

    pub async fn handle<B>(&self, req: Request<B>, peer: IpAddr) -> Response<Body>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = String::from(req.uri().path());
        match self.try_handle(req, peer).await {
            Ok(res) => res,
            Err(err) => {
                log::debug!("{method} {path} from {peer} failed: {err}");
                err.into_response()
            }
        }
    }

    async fn try_handle<B>(&self, req: Request<B>, peer: IpAddr) -> Result<Response<Body>, Error>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let route = Route::resolve(req.method(), req.uri().path())?;
        if let Err(wait) = self.limiter.check(route, peer, Instant::now()) {
            log::warn!("Client {peer} exceeded the rate limit of {route:?}.");
            return Err(Error::RateLimited(wait));
        }

        let service = self.service.as_ref();
        match route {
            Route::Index => {
                let mut res = Response::new(Body::from(INDEX));
                let mime = HeaderValue::from_static("text/html; charset=utf-8");
                assert!(res.headers_mut().insert(CONTENT_TYPE, mime).is_none());
                Ok(res)
            }
            Route::Create => quiz::try_create(service, req).await,
            Route::Active => quiz::try_list_active(service).await,
            Route::All => quiz::try_list_all(service).await,
            Route::Result => quiz::try_reveal(service, req.uri().path()).await,
        }
    }
}
