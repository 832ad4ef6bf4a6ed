use serde::Serialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::curation;
use crate::db::{DbPool, SearchHistory};
use crate::request_types::SearchHistoryQuery;
use crate::warp_helpers::{reject_with, with_db, ErrorPolicy};

const HISTORY_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::NOT_FOUND,
    failure: "Failed to GET Search History",
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryResponse {
    pub search_history: Vec<SearchHistory>,
}

pub async fn get_search_history(
    query: SearchHistoryQuery,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    let search_history = curation::get_search_history(&db_pool, query.user_id.as_deref())
        .await
        .map_err(reject_with(HISTORY_ERRORS))?;

    Ok(warp::reply::json(&SearchHistoryResponse { search_history }))
}

pub fn build_search_history_routes(
    db_pool: DbPool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("search-history"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<SearchHistoryQuery>())
        .and(with_db(db_pool))
        .and_then(get_search_history)
}
