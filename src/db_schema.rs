use sqlx::SqlitePool;

// Email uniqueness is enforced here as well as by the registration checks,
// usernames are only checked at the application level.
pub const USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const PHOTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_url TEXT NOT NULL,
    description TEXT NOT NULL,
    alt_description TEXT NOT NULL,
    date_saved DATETIME NOT NULL,
    user_id INTEGER NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
)
"#;

pub const TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK(length(name) > 0),
    photo_id INTEGER NOT NULL,
    FOREIGN KEY (photo_id) REFERENCES photos(id)
)
"#;

pub const SEARCH_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS search_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    user_id INTEGER,
    timestamp DATETIME NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
)
"#;

pub const SCHEMA_SQL: &[&str] = &[
    USERS_TABLE,
    PHOTOS_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_photos_date_saved ON photos(date_saved);",
    "CREATE INDEX IF NOT EXISTS idx_photos_user_id ON photos(user_id);",
    TAGS_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);",
    "CREATE INDEX IF NOT EXISTS idx_tags_photo_id ON tags(photo_id);",
    SEARCH_HISTORY_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_search_history_user_id ON search_history(user_id);",
];

pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for sql in SCHEMA_SQL {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}
