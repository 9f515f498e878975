use crate::{error::Error, payload::Payload, route, Body, APPLICATION_JSON};
use db::Store;
use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    Request, Response, StatusCode,
};
use lifecycle::{Clock, Service};
use serde::Serialize;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(value).map_err(|err| {
        log::error!("Failed to serialize a response: {err}");
        Error::Fatal
    })?;
    let mut res = Response::new(Body::from(bytes));
    *res.status_mut() = status;
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON)).is_none());
    Ok(res)
}

#[derive(Serialize)]
struct Created {
    id: model::QuizId,
}

#[derive(Serialize)]
struct Revealed {
    result: u16,
}

pub async fn try_create<S, C, B>(service: &Service<S, C>, req: Request<B>) -> Result<Response<Body>, Error>
where
    S: Store,
    C: Clock,
    B: hyper::body::Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let payload = Payload::read(parts.headers.get(CONTENT_TYPE), body).await?;
    let id = service.create_quiz(payload.into_input()?).await?;
    json(StatusCode::CREATED, &Created { id })
}

pub async fn try_list_active<S: Store, C: Clock>(service: &Service<S, C>) -> Result<Response<Body>, Error> {
    let quizzes = service.list_active_quizzes().await?;
    json(StatusCode::OK, &quizzes)
}

pub async fn try_list_all<S: Store, C: Clock>(service: &Service<S, C>) -> Result<Response<Body>, Error> {
    let quizzes = service.list_all_quizzes().await?;
    json(StatusCode::OK, &quizzes)
}

pub async fn try_reveal<S: Store, C: Clock>(service: &Service<S, C>, path: &str) -> Result<Response<Body>, Error> {
    let id = route::result_id(path).ok_or(Error::UnknownRoute)?;
    let result = service.get_result(id).await?;
    json(StatusCode::OK, &Revealed { result })
}
