//! Use cases of the curation service.
//!
//! Each operation validates its input, checks uniqueness or existence where
//! needed, writes, and returns the records the HTTP layer shapes into a
//! response. Multi-row writes run inside a single transaction.

use chrono::Utc;
use futures_util::future::try_join_all;
use log::{debug, error, info};
use std::collections::HashSet;

use crate::db::{DbPool, NewPhoto, Photo, PhotoWithTags, SearchHistory, SortOrder, Tag, User};
use crate::request_types::{AddTagsRequest, NewUserRequest, SavePhotoRequest, TagSearchQuery};
use crate::unsplash::{ExternalImage, ImageSearch, UnsplashError};
use crate::validation::{
    validate_email, validate_image_url, validate_photo_details, validate_query,
    validate_search_credentials, validate_tag_limit, validate_tags, validate_user_credentials,
    ValidationErrors,
};

#[derive(Debug, thiserror::Error)]
pub enum CurationError {
    /// Shape errors, reported as a list.
    #[error("{0}")]
    Validation(ValidationErrors),
    /// A single malformed input reported with the same status as shape errors.
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Upstream(String),
}

impl From<ValidationErrors> for CurationError {
    fn from(errors: ValidationErrors) -> Self {
        CurationError::Validation(errors)
    }
}

impl From<UnsplashError> for CurationError {
    fn from(err: UnsplashError) -> Self {
        match err {
            UnsplashError::MissingClientId => CurationError::Configuration(err.to_string()),
            other => CurationError::Upstream(other.to_string()),
        }
    }
}

pub type CurationResult<T> = Result<T, CurationError>;

/// A lost race on `UNIQUE(email)` reads the same as the email pre-check.
fn map_create_user_error(err: sqlx::Error) -> CurationError {
    let unique_violation = err
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        CurationError::Conflict("Email provided already exists".to_string())
    } else {
        CurationError::Database(err)
    }
}

pub async fn register_user(pool: &DbPool, request: &NewUserRequest) -> CurationResult<User> {
    let new_user = validate_user_credentials(request)?;
    validate_email(&new_user.email).map_err(|e| CurationError::InvalidInput(e.to_string()))?;

    if User::find_by_email(pool, &new_user.email).await?.is_some() {
        return Err(CurationError::Conflict(
            "Email provided already exists".to_string(),
        ));
    }

    if User::find_by_username_or_email(pool, &new_user.username, &new_user.email)
        .await?
        .is_some()
    {
        return Err(CurationError::Conflict("User Already Exists".to_string()));
    }

    // The existence checks above race with concurrent registrations, the
    // UNIQUE(email) constraint settles the tie.
    let user = User::create(pool, &new_user)
        .await
        .map_err(map_create_user_error)?;
    info!("Registered user {} ({})", user.id, user.username);
    Ok(user)
}

pub async fn save_photo(pool: &DbPool, request: &SavePhotoRequest) -> CurationResult<Photo> {
    let image_url = validate_image_url(request.image_url())
        .map_err(|e| CurationError::Rejected(e.to_string()))?;
    let details = validate_photo_details(request)?;

    let new_photo = NewPhoto {
        image_url: image_url.to_string(),
        description: details.description,
        alt_description: details.alt_description,
        date_saved: Utc::now(),
        user_id: details.user_id,
    };

    let mut tx = pool.begin().await?;
    let photo = Photo::create(&mut *tx, &new_photo).await?;
    for name in &details.tags {
        Tag::create(&mut *tx, name, photo.id).await?;
    }
    tx.commit().await?;

    info!(
        "Saved photo {} for user {} with {} tags",
        photo.id,
        photo.user_id,
        details.tags.len()
    );
    Ok(photo)
}

pub async fn list_photos(pool: &DbPool) -> CurationResult<Vec<Photo>> {
    let photos = Photo::list_all(pool).await?;
    if photos.is_empty() {
        return Err(CurationError::NotFound("Photos, NOT FOUND".to_string()));
    }
    Ok(photos)
}

/// Adds up to five tags to an existing photo. The photo is looked up before
/// anything is written, so a missing photo leaves no orphaned tags behind.
pub async fn add_tags_to_photo(
    pool: &DbPool,
    photo_id: &str,
    request: &AddTagsRequest,
) -> CurationResult<Vec<Tag>> {
    let batch = validate_tags(request.tages.as_ref(), photo_id.parse::<i64>().ok())?;
    validate_tag_limit(&batch.names).map_err(|e| CurationError::Rejected(e.to_string()))?;

    if Photo::find_by_id(pool, batch.photo_id).await?.is_none() {
        return Err(CurationError::NotFound("Photo, NOT FOUND".to_string()));
    }

    let mut tx = pool.begin().await?;
    let mut tags = Vec::with_capacity(batch.names.len());
    for name in &batch.names {
        tags.push(Tag::create(&mut *tx, name, batch.photo_id).await?);
    }
    tx.commit().await?;

    info!("Added {} tags to photo {}", tags.len(), batch.photo_id);
    Ok(tags)
}

pub async fn search_photos_by_tag(
    pool: &DbPool,
    query: &TagSearchQuery,
) -> CurationResult<Vec<PhotoWithTags>> {
    let sort = query
        .sort
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(SortOrder::default().as_sql());
    let search = validate_search_credentials(query.tags.as_deref(), Some(sort))?;

    let user_id = match query.user_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            CurationError::Validation(ValidationErrors::single("userId should be a number"))
        })?),
        None => None,
    };

    if let Some(user_id) = user_id {
        SearchHistory::create(pool, &search.tag, Some(user_id), Utc::now()).await?;
        debug!("Recorded search '{}' for user {}", search.tag, user_id);
    }

    let tags = Tag::find_all_by_name(pool, &search.tag).await?;
    if tags.is_empty() {
        return Err(CurationError::NotFound("Tags not found.".to_string()));
    }

    let mut seen = HashSet::new();
    let photo_ids: Vec<i64> = tags
        .iter()
        .map(|tag| tag.photo_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let photos = Photo::find_by_ids(pool, &photo_ids, search.sort).await?;
    if photos.is_empty() {
        return Err(CurationError::NotFound("Photos not found.".to_string()));
    }

    // Tag lookups are independent reads; try_join_all keeps input order.
    let results = try_join_all(photos.into_iter().map(|photo| attach_tags(pool, photo))).await?;
    Ok(results)
}

async fn attach_tags(pool: &DbPool, photo: Photo) -> Result<PhotoWithTags, sqlx::Error> {
    let tags = Tag::find_all_by_photo_id(pool, photo.id)
        .await?
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    Ok(PhotoWithTags { photo, tags })
}

pub async fn get_search_history(
    pool: &DbPool,
    user_id: Option<&str>,
) -> CurationResult<Vec<SearchHistory>> {
    let Some(user_id) = user_id
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
    else {
        return Err(CurationError::InvalidInput(
            "Credentails are required".to_string(),
        ));
    };

    let history = SearchHistory::find_all_by_user_id(pool, user_id).await?;
    if history.is_empty() {
        return Err(CurationError::NotFound(
            "search History NOT FOUND".to_string(),
        ));
    }
    Ok(history)
}

pub async fn search_external_images(
    provider: &dyn ImageSearch,
    query: Option<&str>,
) -> CurationResult<Vec<ExternalImage>> {
    let query = validate_query(query)?;

    provider.search_photos(query).await.map_err(|e| {
        error!("Image provider search for '{}' failed: {}", query, e);
        CurationError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_in_memory_pool, NewUser};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn count(pool: &DbPool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_user(pool: &DbPool) -> User {
        User::create(
            pool,
            &NewUser {
                username: "ana".to_string(),
                email: "ana@example.com".to_string(),
            },
        )
        .await
        .unwrap()
    }

    fn user_request(username: &str, email: &str) -> NewUserRequest {
        serde_json::from_value(json!({ "username": username, "email": email })).unwrap()
    }

    fn photo_request(user_id: i64, tags: serde_json::Value) -> SavePhotoRequest {
        serde_json::from_value(json!({
            "imageUrl": "https://images.unsplash.com/photo-1",
            "description": "A beautiful scenery",
            "altDescription": "Scenery with mountains and lakes",
            "tags": tags,
            "userId": user_id
        }))
        .unwrap()
    }

    fn tags_request(tags: serde_json::Value) -> AddTagsRequest {
        serde_json::from_value(json!({ "tages": tags })).unwrap()
    }

    fn tag_query(tags: &str, sort: Option<&str>, user_id: Option<&str>) -> TagSearchQuery {
        TagSearchQuery {
            tags: Some(tags.to_string()),
            sort: sort.map(str::to_string),
            user_id: user_id.map(str::to_string),
        }
    }

    async fn seed_photo_on(pool: &DbPool, user_id: i64, day: u32, tags: &[&str]) -> Photo {
        let photo = Photo::create(
            pool,
            &NewPhoto {
                image_url: format!("https://images.unsplash.com/photo-{day}"),
                description: format!("Day {day}"),
                alt_description: "scenery".to_string(),
                date_saved: Utc.with_ymd_and_hms(2024, 11, day, 0, 0, 0).unwrap(),
                user_id,
            },
        )
        .await
        .unwrap();
        for tag in tags {
            Tag::create(pool, tag, photo.id).await.unwrap();
        }
        photo
    }

    #[tokio::test]
    async fn test_register_user_echoes_input() {
        let pool = create_in_memory_pool().await.unwrap();

        let user = register_user(&pool, &user_request("JohnDoe", "johndoe@example.com"))
            .await
            .unwrap();

        assert_eq!(user.username, "JohnDoe");
        assert_eq!(user.email, "johndoe@example.com");
        assert_eq!(count(&pool, "users").await, 1);
    }

    #[tokio::test]
    async fn test_register_user_rejects_bad_email_before_writing() {
        let pool = create_in_memory_pool().await.unwrap();

        let err = register_user(&pool, &user_request("JohnDoe", "not-an-email"))
            .await
            .unwrap_err();

        assert!(matches!(err, CurationError::InvalidInput(ref m) if m == "Not a Valid Email"));
        assert_eq!(count(&pool, "users").await, 0);
    }

    #[tokio::test]
    async fn test_register_user_conflicts() {
        let pool = create_in_memory_pool().await.unwrap();
        seed_user(&pool).await;

        let err = register_user(&pool, &user_request("someone", "ana@example.com"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, CurationError::Conflict(ref m) if m == "Email provided already exists")
        );

        let err = register_user(&pool, &user_request("ana", "fresh@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CurationError::Conflict(ref m) if m == "User Already Exists"));

        assert_eq!(count(&pool, "users").await, 1);
    }

    #[tokio::test]
    async fn test_register_user_shape_errors() {
        let pool = create_in_memory_pool().await.unwrap();
        let request: NewUserRequest = serde_json::from_value(json!({ "username": 1 })).unwrap();

        let err = register_user(&pool, &request).await.unwrap_err();

        match err {
            CurationError::Validation(errors) => assert_eq!(errors.messages().len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_photo_creates_photo_and_tags() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;

        let photo = save_photo(&pool, &photo_request(user.id, json!(["nature", "landscape"])))
            .await
            .unwrap();

        assert_eq!(count(&pool, "photos").await, 1);
        let tags = Tag::find_all_by_photo_id(&pool, photo.id).await.unwrap();
        assert_eq!(
            tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["nature", "landscape"]
        );
        assert!(tags.iter().all(|t| t.photo_id == photo.id));
    }

    #[tokio::test]
    async fn test_save_photo_rejects_foreign_image_url() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let mut request = photo_request(user.id, json!(["nature"]));
        request.image_url = Some(json!("http://example.com/image.jpg"));

        let err = save_photo(&pool, &request).await.unwrap_err();

        assert!(matches!(err, CurationError::Rejected(ref m) if m == "Invalid image URL."));
        assert_eq!(count(&pool, "photos").await, 0);
    }

    #[tokio::test]
    async fn test_save_photo_for_unknown_user_is_store_error() {
        let pool = create_in_memory_pool().await.unwrap();

        // No such user, the photo insert violates the foreign key.
        let err = save_photo(&pool, &photo_request(99, json!(["nature"])))
            .await
            .unwrap_err();

        assert!(matches!(err, CurationError::Database(_)));
        assert_eq!(count(&pool, "photos").await, 0);
        assert_eq!(count(&pool, "tags").await, 0);
    }

    async fn fail_tag_inserts_named(pool: &DbPool, name: &str) {
        sqlx::query(&format!(
            "CREATE TRIGGER reject_tag BEFORE INSERT ON tags WHEN NEW.name = '{}' \
             BEGIN SELECT RAISE(ABORT, 'tag rejected'); END",
            name
        ))
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_save_photo_rolls_back_photo_when_a_tag_fails() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        fail_tag_inserts_named(&pool, "broken").await;

        let err = save_photo(&pool, &photo_request(user.id, json!(["ok", "broken"])))
            .await
            .unwrap_err();

        assert!(matches!(err, CurationError::Database(_)));
        assert_eq!(count(&pool, "photos").await, 0);
        assert_eq!(count(&pool, "tags").await, 0);
    }

    #[tokio::test]
    async fn test_add_tags_rolls_back_batch_when_a_tag_fails() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let photo = seed_photo_on(&pool, user.id, 1, &["existing"]).await;
        fail_tag_inserts_named(&pool, "broken").await;

        let err = add_tags_to_photo(
            &pool,
            &photo.id.to_string(),
            &tags_request(json!(["sunset", "beach", "broken"])),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CurationError::Database(_)));
        assert_eq!(count(&pool, "tags").await, 1);
        assert_eq!(count(&pool, "photos").await, 1);
    }

    #[tokio::test]
    async fn test_search_by_tag_with_unknown_user_is_store_error() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        seed_photo_on(&pool, user.id, 1, &["nature"]).await;

        let query = TagSearchQuery {
            tags: Some("nature".to_string()),
            user_id: Some("999".to_string()),
            ..Default::default()
        };
        let err = search_photos_by_tag(&pool, &query).await.unwrap_err();

        assert!(matches!(err, CurationError::Database(_)));
        assert_eq!(count(&pool, "search_history").await, 0);
    }

    #[tokio::test]
    async fn test_unique_email_violation_maps_to_conflict() {
        let pool = create_in_memory_pool().await.unwrap();
        let new_user = NewUser {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
        };
        User::create(&pool, &new_user).await.unwrap();
        let store_err = User::create(&pool, &new_user).await.unwrap_err();

        assert!(matches!(
            map_create_user_error(store_err),
            CurationError::Conflict(ref m) if m == "Email provided already exists"
        ));
        assert!(matches!(
            map_create_user_error(sqlx::Error::RowNotFound),
            CurationError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_list_photos() {
        let pool = create_in_memory_pool().await.unwrap();
        assert!(matches!(
            list_photos(&pool).await,
            Err(CurationError::NotFound(_))
        ));

        let user = seed_user(&pool).await;
        seed_photo_on(&pool, user.id, 1, &[]).await;
        assert_eq!(list_photos(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_tags_to_photo() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let photo = seed_photo_on(&pool, user.id, 1, &[]).await;

        let tags = add_tags_to_photo(
            &pool,
            &photo.id.to_string(),
            &tags_request(json!(["nature", "landscape"])),
        )
        .await
        .unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(count(&pool, "tags").await, 2);
    }

    #[tokio::test]
    async fn test_add_tags_over_limit_writes_nothing() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let photo = seed_photo_on(&pool, user.id, 1, &[]).await;

        let err = add_tags_to_photo(
            &pool,
            &photo.id.to_string(),
            &tags_request(json!(["a", "b", "c", "d", "e", "f"])),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(err, CurationError::Rejected(ref m) if m == "tags should not be greater then 5")
        );
        assert_eq!(count(&pool, "tags").await, 0);
    }

    #[tokio::test]
    async fn test_add_tags_to_missing_photo() {
        let pool = create_in_memory_pool().await.unwrap();

        let err = add_tags_to_photo(&pool, "41", &tags_request(json!(["nature"])))
            .await
            .unwrap_err();
        assert!(matches!(err, CurationError::NotFound(ref m) if m == "Photo, NOT FOUND"));
        assert_eq!(count(&pool, "tags").await, 0);

        let err = add_tags_to_photo(&pool, "abc", &tags_request(json!(["nature"])))
            .await
            .unwrap_err();
        assert!(matches!(err, CurationError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_by_tag_sorts_by_date_saved() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        seed_photo_on(&pool, user.id, 1, &["nature"]).await;
        seed_photo_on(&pool, user.id, 2, &["nature", "travel"]).await;
        seed_photo_on(&pool, user.id, 3, &["city"]).await;

        let desc = search_photos_by_tag(&pool, &tag_query("nature", Some("DESC"), None))
            .await
            .unwrap();
        let dates: Vec<String> = desc
            .iter()
            .map(|p| p.photo.date_saved.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2024-11-02", "2024-11-01"]);
        assert_eq!(desc[0].tags, vec!["nature", "travel"]);
        assert_eq!(desc[1].tags, vec!["nature"]);

        let asc = search_photos_by_tag(&pool, &tag_query("nature", None, None))
            .await
            .unwrap();
        assert_eq!(asc[0].photo.date_saved.format("%d").to_string(), "01");

        // No userId, no history.
        assert_eq!(count(&pool, "search_history").await, 0);
    }

    #[tokio::test]
    async fn test_search_by_tag_records_history_even_without_matches() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let user_id = user.id.to_string();

        let err = search_photos_by_tag(&pool, &tag_query("ocean", Some("asc"), Some(user_id.as_str())))
            .await
            .unwrap_err();

        assert!(matches!(err, CurationError::NotFound(ref m) if m == "Tags not found."));
        let history = SearchHistory::find_all_by_user_id(&pool, user.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "ocean");
    }

    #[tokio::test]
    async fn test_search_by_tag_validation() {
        let pool = create_in_memory_pool().await.unwrap();

        let missing = TagSearchQuery::default();
        assert!(matches!(
            search_photos_by_tag(&pool, &missing).await,
            Err(CurationError::Validation(_))
        ));

        let bad_sort = tag_query("nature", Some("sideways"), None);
        assert!(matches!(
            search_photos_by_tag(&pool, &bad_sort).await,
            Err(CurationError::Validation(_))
        ));

        let bad_user = tag_query("nature", None, Some("user123"));
        assert!(matches!(
            search_photos_by_tag(&pool, &bad_user).await,
            Err(CurationError::Validation(_))
        ));
        assert_eq!(count(&pool, "search_history").await, 0);
    }

    #[tokio::test]
    async fn test_get_search_history() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;

        for missing in [None, Some(""), Some("user123")] {
            let err = get_search_history(&pool, missing).await.unwrap_err();
            assert!(
                matches!(err, CurationError::InvalidInput(ref m) if m == "Credentails are required")
            );
        }

        let user_id = user.id.to_string();
        let err = get_search_history(&pool, Some(user_id.as_str())).await.unwrap_err();
        assert!(matches!(err, CurationError::NotFound(ref m) if m == "search History NOT FOUND"));

        SearchHistory::create(&pool, "nature", Some(user.id), Utc::now())
            .await
            .unwrap();
        SearchHistory::create(&pool, "travel", Some(user.id), Utc::now())
            .await
            .unwrap();

        let history = get_search_history(&pool, Some(user_id.as_str())).await.unwrap();
        assert_eq!(
            history.iter().map(|h| h.query.as_str()).collect::<Vec<_>>(),
            vec!["nature", "travel"]
        );
    }

    struct FakeProvider {
        calls: AtomicUsize,
        result: fn() -> Result<Vec<ExternalImage>, UnsplashError>,
    }

    #[async_trait]
    impl ImageSearch for FakeProvider {
        async fn search_photos(&self, _query: &str) -> Result<Vec<ExternalImage>, UnsplashError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn provider(result: fn() -> Result<Vec<ExternalImage>, UnsplashError>) -> FakeProvider {
        FakeProvider {
            calls: AtomicUsize::new(0),
            result,
        }
    }

    #[tokio::test]
    async fn test_external_search_rejects_symbols_without_calling_provider() {
        let fake = provider(|| Ok(Vec::new()));

        let err = search_external_images(&fake, Some("!@#")).await.unwrap_err();

        assert!(matches!(err, CurationError::Validation(_)));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_external_search_passes_results_through() {
        let fake = provider(|| {
            Ok(vec![ExternalImage {
                image_url: "https://images.unsplash.com/photo-1".to_string(),
                description: Some("Lake".to_string()),
                alt_description: None,
            }])
        });

        let images = search_external_images(&fake, Some("lake")).await.unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_external_search_error_classes() {
        let missing = provider(|| Err(UnsplashError::MissingClientId));
        assert!(matches!(
            search_external_images(&missing, Some("lake")).await,
            Err(CurationError::Configuration(_))
        ));

        let failing = provider(|| Err(UnsplashError::Request("connection refused".to_string())));
        assert!(matches!(
            search_external_images(&failing, Some("lake")).await,
            Err(CurationError::Upstream(_))
        ));
    }
}
