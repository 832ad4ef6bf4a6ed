pub mod config;
pub mod curation;
pub mod db;
pub mod db_pool;
pub mod db_schema;
pub mod handlers_health;
pub mod handlers_photos;
pub mod handlers_search_history;
pub mod handlers_users;
pub mod request_types;
pub mod unsplash;
pub mod validation;
pub mod warp_helpers;

use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Reply};

use db::DbPool;
use unsplash::ImageSearch;
use warp_helpers::{cors, handle_rejection};

pub const WELCOME_MESSAGE: &str = "Welcome to Photo curation App";

/// Every route the server exposes, with CORS, request logging and the
/// rejection handler applied.
pub fn build_routes(
    db_pool: DbPool,
    image_search: Arc<dyn ImageSearch>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let welcome = warp::path::end()
        .and(warp::get())
        .map(|| WELCOME_MESSAGE);

    welcome
        .or(handlers_health::build_health_routes(db_pool.clone()))
        .or(handlers_users::build_user_routes(db_pool.clone()))
        .or(handlers_photos::build_photo_routes(db_pool.clone(), image_search))
        .or(handlers_search_history::build_search_history_routes(db_pool))
        .with(cors())
        .with(warp::log("photo_curation"))
        .recover(handle_rejection)
}
