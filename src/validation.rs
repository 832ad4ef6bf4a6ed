//! Request validation rules.
//!
//! Every rule is synchronous and free of I/O. A rule either yields the typed
//! value it checked or a [`ValidationErrors`] list with one human-readable
//! message per violated condition. Nothing is truncated or normalised.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::db::{NewUser, SortOrder};
use crate::request_types::{string_array, NewUserRequest, SavePhotoRequest};

pub const UNSPLASH_IMAGE_PREFIX: &str = "https://images.unsplash.com/";
pub const MAX_TAGS_PER_REQUEST: usize = 5;
const QUERY_SYMBOLS: &str = "~!@#$%^&*()_";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

pub type Validated<T> = Result<T, ValidationErrors>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn single(message: &str) -> Self {
        Self(vec![message.to_string()])
    }

    pub fn push(&mut self, message: &str) {
        self.0.push(message.to_string());
    }

    /// Records `message` when `value` is missing and passes the value through.
    fn require<T>(&mut self, value: Option<T>, message: &str) -> Option<T> {
        if value.is_none() {
            self.push(message);
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

/// Photo fields that passed the metadata rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDetails {
    pub description: String,
    pub alt_description: String,
    pub tags: Vec<String>,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBatch {
    pub photo_id: i64,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSearch {
    pub tag: String,
    pub sort: SortOrder,
}

pub fn validate_user_credentials(request: &NewUserRequest) -> Validated<NewUser> {
    let mut errors = ValidationErrors::default();
    let username = errors.require(
        request.username(),
        "USERNAME is required and it should be string",
    );
    let email = errors.require(
        request.email(),
        "users EMAIL is required and it should be string",
    );

    match (username, email) {
        (Some(username), Some(email)) => Ok(NewUser {
            username: username.to_string(),
            email: email.to_string(),
        }),
        _ => Err(errors),
    }
}

pub fn validate_email(email: &str) -> Validated<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ValidationErrors::single("Not a Valid Email"))
    }
}

pub fn validate_image_url(image_url: Option<&str>) -> Validated<&str> {
    match image_url {
        Some(url) if url.starts_with(UNSPLASH_IMAGE_PREFIX) => Ok(url),
        _ => Err(ValidationErrors::single("Invalid image URL.")),
    }
}

pub fn validate_photo_details(request: &SavePhotoRequest) -> Validated<PhotoDetails> {
    let mut errors = ValidationErrors::default();
    let description = errors.require(
        request.description(),
        "Description is required and should be a string",
    );
    let alt_description = errors.require(
        request.alt_description(),
        "AltDescription is required and should be a string",
    );
    let user_id = errors.require(
        request.user_id(),
        "UserID is required and should be a number",
    );
    let tags = errors.require(request.tags(), "tags is required and should be an array");

    // Tag rows reject empty names, so catch them here rather than mid-transaction.
    if tags.as_ref().is_some_and(|tags| tags.iter().any(|t| t.is_empty())) {
        errors.push("In tags, Elements should be not empty strings");
    }

    match (description, alt_description, user_id, tags) {
        (Some(description), Some(alt_description), Some(user_id), Some(tags))
            if errors.is_empty() =>
        {
            Ok(PhotoDetails {
                description: description.to_string(),
                alt_description: alt_description.to_string(),
                tags: tags.into_iter().map(str::to_string).collect(),
                user_id,
            })
        }
        _ => Err(errors),
    }
}

/// Checks a batch of tags for an existing photo. An absent or non-array
/// `tags` value is reported once and the element check is skipped.
pub fn validate_tags(tags: Option<&Value>, photo_id: Option<i64>) -> Validated<TagBatch> {
    let mut errors = ValidationErrors::default();

    let array = tags.and_then(Value::as_array);
    if array.is_none() {
        errors.push("Tags are required and should be array :) ");
    }

    let photo_id = errors.require(photo_id.filter(|id| *id > 0), "PhotoId is required");

    let names = array.and_then(|_| tags.and_then(string_array));
    let has_bad_element = match (array, &names) {
        (Some(_), Some(names)) => names.iter().any(|n| n.is_empty()),
        (Some(_), None) => true,
        (None, _) => false,
    };
    if has_bad_element {
        errors.push("In tags, Elements should be not empty strings");
    }

    match (names, photo_id) {
        (Some(names), Some(photo_id)) if errors.is_empty() => Ok(TagBatch {
            photo_id,
            names: names.into_iter().map(str::to_string).collect(),
        }),
        _ => Err(errors),
    }
}

pub fn validate_tag_limit(names: &[String]) -> Validated<()> {
    if names.len() > MAX_TAGS_PER_REQUEST {
        Err(ValidationErrors::single("tags should not be greater then 5"))
    } else {
        Ok(())
    }
}

pub fn validate_search_credentials(tags: Option<&str>, sort: Option<&str>) -> Validated<TagSearch> {
    let mut errors = ValidationErrors::default();
    let tag = errors.require(
        tags.filter(|t| !t.is_empty()),
        "Tags is required and should be string",
    );
    let sort = errors.require(
        sort.filter(|s| !s.is_empty()),
        "sort method is required should be string",
    );

    let order = sort.and_then(|s| s.parse::<SortOrder>().ok());
    if sort.is_some() && order.is_none() {
        errors.push("sort method should be either ASC or DESC");
    }

    match (tag, order) {
        (Some(tag), Some(sort)) if errors.is_empty() => Ok(TagSearch {
            tag: tag.to_string(),
            sort,
        }),
        _ => Err(errors),
    }
}

pub fn validate_query(query: Option<&str>) -> Validated<&str> {
    let mut errors = ValidationErrors::default();
    let query = errors.require(
        query.filter(|q| !q.is_empty()),
        "Query parameter is required and type to be string",
    );

    if query.is_some_and(|q| q.chars().all(|c| QUERY_SYMBOLS.contains(c))) {
        errors.push("No symbols are required as query.");
    }

    match query {
        Some(query) if errors.is_empty() => Ok(query),
        _ => Err(errors),
    }
}
