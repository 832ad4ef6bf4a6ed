use serde_json::json;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::db::DbPool;
use crate::warp_helpers::with_db;

pub async fn health_check() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "service": "photo-curation",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Ready once the pool can hand out a connection that answers a trivial query.
pub async fn ready_check(db_pool: DbPool) -> Result<impl Reply, Rejection> {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&db_pool)
        .await
    {
        Ok(_) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({
                "status": "ready",
                "database": "connected",
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
            StatusCode::OK,
        )),
        Err(e) => {
            log::error!("Database readiness probe failed: {}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({
                    "status": "unavailable",
                    "database": "disconnected",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
                StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
    }
}

pub fn build_health_routes(
    db_pool: DbPool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let ready = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool))
        .and_then(ready_check);

    health.or(ready)
}
