use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use crate::curation::CurationError;
use crate::db::DbPool;
use crate::unsplash::ImageSearch;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

/// How a route reports failures: the status for input validation errors
/// and the text that prefixes server errors.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPolicy {
    pub validation_status: StatusCode,
    pub failure: &'static str,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl reject::Reject for ApiError {}

impl ApiError {
    pub fn from_curation(err: CurationError, policy: ErrorPolicy) -> Self {
        let (status, body) = match err {
            CurationError::Validation(errors) => (
                policy.validation_status,
                json!({ "errors": errors.into_messages() }),
            ),
            CurationError::InvalidInput(message) => {
                (policy.validation_status, json!({ "message": message }))
            }
            CurationError::Rejected(message) | CurationError::Conflict(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            CurationError::NotFound(message) => {
                (StatusCode::NOT_FOUND, json!({ "message": message }))
            }
            other => {
                log::error!("{}: {}", policy.failure, other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": format!("{}, since {}", policy.failure, other) }),
                )
            }
        };

        ApiError { status, body }
    }
}

pub fn reject_with(policy: ErrorPolicy) -> impl Fn(CurationError) -> Rejection {
    move |err| reject::custom(ApiError::from_curation(err, policy))
}

pub fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub fn with_image_search(
    image_search: Arc<dyn ImageSearch>,
) -> impl Filter<Extract = (Arc<dyn ImageSearch>,), Error = Infallible> + Clone {
    warp::any().map(move || image_search.clone())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(api_error) = err.find::<ApiError>() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&api_error.body),
            api_error.status,
        ));
    }

    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = format!("Invalid request body: {}", body_error);
    } else if let Some(query_error) = err.find::<warp::reject::InvalidQuery>() {
        code = StatusCode::BAD_REQUEST;
        message = format!("Invalid query string: {}", query_error);
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
}
