use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use std::str::FromStr;

pub use crate::db_pool::{create_db_pool, create_in_memory_pool, DbPool};

const PHOTO_COLUMNS: &str = "id, image_url, description, alt_description, date_saved, user_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Registration input once it has passed the credential checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: i64,
    pub image_url: String,
    pub description: String,
    pub alt_description: String,
    pub date_saved: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub image_url: String,
    pub description: String,
    pub alt_description: String,
    pub date_saved: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub photo_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistory {
    pub id: i64,
    pub query: String,
    pub user_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// A photo as returned by tag search, carrying the names of all its tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoWithTags {
    #[serde(flatten)]
    pub photo: Photo,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

// ===== PERSISTENCE GATEWAY =====
// Writes take any executor so callers can run them inside a transaction.

impl User {
    pub async fn create<'e, E>(executor: E, new_user: &NewUser) -> Result<User, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email) VALUES (?, ?) RETURNING id, username, email",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, username, email FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username_or_email(
        pool: &DbPool,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email FROM users WHERE username = ? OR email = ? LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .await
    }
}

impl Photo {
    pub async fn create<'e, E>(executor: E, new_photo: &NewPhoto) -> Result<Photo, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Photo>(&format!(
            "INSERT INTO photos (image_url, description, alt_description, date_saved, user_id)
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            PHOTO_COLUMNS
        ))
        .bind(&new_photo.image_url)
        .bind(&new_photo.description)
        .bind(&new_photo.alt_description)
        .bind(new_photo.date_saved)
        .bind(new_photo.user_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Photo>, sqlx::Error> {
        sqlx::query_as::<_, Photo>(&format!("SELECT {} FROM photos WHERE id = ?", PHOTO_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &DbPool) -> Result<Vec<Photo>, sqlx::Error> {
        sqlx::query_as::<_, Photo>(&format!("SELECT {} FROM photos ORDER BY id", PHOTO_COLUMNS))
            .fetch_all(pool)
            .await
    }

    /// Photos whose id is in `ids`, ordered by save date. Ties keep id order.
    pub async fn find_by_ids(
        pool: &DbPool,
        ids: &[i64],
        order: SortOrder,
    ) -> Result<Vec<Photo>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM photos WHERE id IN (", PHOTO_COLUMNS));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        builder.push(format!(" ORDER BY date_saved {}, id ASC", order.as_sql()));

        builder.build_query_as::<Photo>().fetch_all(pool).await
    }
}

impl Tag {
    pub async fn create<'e, E>(executor: E, name: &str, photo_id: i64) -> Result<Tag, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (name, photo_id) VALUES (?, ?) RETURNING id, name, photo_id",
        )
        .bind(name)
        .bind(photo_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_all_by_name(pool: &DbPool, name: &str) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, photo_id FROM tags WHERE name = ? ORDER BY id")
            .bind(name)
            .fetch_all(pool)
            .await
    }

    pub async fn find_all_by_photo_id(
        pool: &DbPool,
        photo_id: i64,
    ) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            "SELECT id, name, photo_id FROM tags WHERE photo_id = ? ORDER BY id",
        )
        .bind(photo_id)
        .fetch_all(pool)
        .await
    }
}

impl SearchHistory {
    pub async fn create<'e, E>(
        executor: E,
        query: &str,
        user_id: Option<i64>,
        timestamp: DateTime<Utc>,
    ) -> Result<SearchHistory, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, SearchHistory>(
            "INSERT INTO search_history (query, user_id, timestamp) VALUES (?, ?, ?)
             RETURNING id, query, user_id, timestamp",
        )
        .bind(query)
        .bind(user_id)
        .bind(timestamp)
        .fetch_one(executor)
        .await
    }

    pub async fn find_all_by_user_id(
        pool: &DbPool,
        user_id: i64,
    ) -> Result<Vec<SearchHistory>, sqlx::Error> {
        sqlx::query_as::<_, SearchHistory>(
            "SELECT id, query, user_id, timestamp FROM search_history WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
