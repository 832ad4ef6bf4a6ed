use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::curation;
use crate::db::{DbPool, Photo, PhotoWithTags};
use crate::request_types::{AddTagsRequest, ImageSearchQuery, SavePhotoRequest, TagSearchQuery};
use crate::unsplash::ImageSearch;
use crate::warp_helpers::{reject_with, with_db, with_image_search, ErrorPolicy};

const SAVE_PHOTO_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::NOT_FOUND,
    failure: "Failed to GET photos",
};

const ADD_TAGS_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::NOT_FOUND,
    failure: "Failed to GET photos",
};

const LIST_PHOTOS_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::BAD_REQUEST,
    failure: "Failed to GET photos",
};

const TAG_SEARCH_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::BAD_REQUEST,
    failure: "Failed to fetch photos",
};

const IMAGE_SEARCH_ERRORS: ErrorPolicy = ErrorPolicy {
    validation_status: StatusCode::BAD_REQUEST,
    failure: "Failed to GET photos",
};

#[derive(Debug, Serialize)]
pub struct PhotosResponse<T: Serialize> {
    pub photos: Vec<T>,
}

pub async fn save_photo(
    request: SavePhotoRequest,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    curation::save_photo(&db_pool, &request)
        .await
        .map_err(reject_with(SAVE_PHOTO_ERRORS))?;

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "message": "Photo saved successfully" })),
        StatusCode::CREATED,
    ))
}

pub async fn list_photos(db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let photos = curation::list_photos(&db_pool)
        .await
        .map_err(reject_with(LIST_PHOTOS_ERRORS))?;

    Ok(warp::reply::json(&PhotosResponse::<Photo> { photos }))
}

pub async fn add_tags(
    photo_id: String,
    request: AddTagsRequest,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    curation::add_tags_to_photo(&db_pool, &photo_id, &request)
        .await
        .map_err(reject_with(ADD_TAGS_ERRORS))?;

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "message": "Tags added successfully" })),
        StatusCode::CREATED,
    ))
}

pub async fn search_by_tag(
    query: TagSearchQuery,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    let photos = curation::search_photos_by_tag(&db_pool, &query)
        .await
        .map_err(reject_with(TAG_SEARCH_ERRORS))?;

    Ok(warp::reply::json(&PhotosResponse::<PhotoWithTags> { photos }))
}

pub async fn search_images(
    query: ImageSearchQuery,
    image_search: Arc<dyn ImageSearch>,
) -> Result<impl Reply, Rejection> {
    let images = curation::search_external_images(image_search.as_ref(), query.query.as_deref())
        .await
        .map_err(reject_with(IMAGE_SEARCH_ERRORS))?;

    if images.is_empty() {
        return Ok(warp::reply::json(
            &json!({ "message": "No images found for the given query." }),
        ));
    }

    Ok(warp::reply::json(&images))
}

pub fn build_photo_routes(
    db_pool: DbPool,
    image_search: Arc<dyn ImageSearch>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api_photos_save = warp::path("api")
        .and(warp::path("photos"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<SavePhotoRequest>())
        .and(with_db(db_pool.clone()))
        .and_then(save_photo);

    let api_photos_list = warp::path("api")
        .and(warp::path("photos"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool.clone()))
        .and_then(list_photos);

    let api_photo_tags = warp::path("api")
        .and(warp::path("photos"))
        .and(warp::path::param::<String>())
        .and(warp::path("tags"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<AddTagsRequest>())
        .and(with_db(db_pool.clone()))
        .and_then(add_tags);

    let api_photos_image_search = warp::path("api")
        .and(warp::path("photos"))
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ImageSearchQuery>())
        .and(with_image_search(image_search))
        .and_then(search_images);

    let api_photos_tag_search = warp::path("api")
        .and(warp::path("photos"))
        .and(warp::path("tag"))
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<TagSearchQuery>())
        .and(with_db(db_pool))
        .and_then(search_by_tag);

    api_photos_save
        .or(api_photos_list)
        .or(api_photo_tags)
        .or(api_photos_image_search)
        .or(api_photos_tag_search)
}
