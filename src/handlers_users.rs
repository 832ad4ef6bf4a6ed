use serde::Serialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::curation;
use crate::db::{DbPool, User};
use crate::request_types::NewUserRequest;
use crate::warp_helpers::{reject_with, with_db, ErrorPolicy};

const REGISTER_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::NOT_FOUND,
    failure: "Failed to Create User",
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub message: String,
    pub new_user: User,
}

pub async fn create_user(
    request: NewUserRequest,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    let user = curation::register_user(&db_pool, &request)
        .await
        .map_err(reject_with(REGISTER_ERRORS))?;

    Ok(warp::reply::with_status(
        warp::reply::json(&CreateUserResponse {
            message: "User Created successfully.".to_string(),
            new_user: user,
        }),
        StatusCode::CREATED,
    ))
}

pub fn build_user_routes(
    db_pool: DbPool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<NewUserRequest>())
        .and(with_db(db_pool))
        .and_then(create_user)
}
