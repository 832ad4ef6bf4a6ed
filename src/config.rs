use std::env;

pub const DEFAULT_UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsplashConfig {
    pub base_url: String,
    pub client_id: Option<String>,
}

impl UnsplashConfig {
    pub fn new(base_url: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.filter(|id| !id.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_path: String,
    pub max_connections: u32,
    pub unsplash: UnsplashConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("PHOTO_CURATION_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            host: env::var("PHOTO_CURATION_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            db_path: env::var("PHOTO_CURATION_DB_PATH")
                .unwrap_or_else(|_| "./data/photo-curation.db".to_string()),
            max_connections: env::var("PHOTO_CURATION_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            unsplash: UnsplashConfig::new(
                env::var("UNSPLASH_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_UNSPLASH_BASE_URL.to_string()),
                env::var("UNSPLASH_CLIENT_ID").ok(),
            ),
        })
    }
}
