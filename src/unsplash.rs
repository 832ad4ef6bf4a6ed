use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::UnsplashConfig;

#[derive(Debug, thiserror::Error)]
pub enum UnsplashError {
    #[error("Client_ID is missing")]
    MissingClientId,
    #[error("request to image provider failed: {0}")]
    Request(String),
    #[error("unexpected image provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("image provider task failed: {0}")]
    Task(String),
}

/// A provider search hit projected onto the local photo shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalImage {
    pub image_url: String,
    pub description: Option<String>,
    pub alt_description: Option<String>,
}

#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search_photos(&self, query: &str) -> Result<Vec<ExternalImage>, UnsplashError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: ResultUrls,
    description: Option<String>,
    alt_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultUrls {
    regular: String,
}

pub fn parse_search_response(body: &str) -> Result<Vec<ExternalImage>, UnsplashError> {
    let response: SearchResponse = serde_json::from_str(body)?;

    Ok(response
        .results
        .into_iter()
        .map(|result| ExternalImage {
            image_url: result.urls.regular,
            description: result.description,
            alt_description: result.alt_description,
        })
        .collect())
}

pub struct UnsplashClient {
    config: UnsplashConfig,
    agent: ureq::Agent,
}

impl UnsplashClient {
    pub fn new(config: UnsplashConfig) -> Self {
        Self {
            config,
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn search_url(&self) -> String {
        format!(
            "{}/search/photos",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    async fn search_photos(&self, query: &str) -> Result<Vec<ExternalImage>, UnsplashError> {
        let client_id = self
            .config
            .client_id
            .clone()
            .ok_or(UnsplashError::MissingClientId)?;

        let agent = self.agent.clone();
        let url = self.search_url();
        let query = query.to_string();
        debug!("Searching image provider for '{}'", query);

        // ureq is blocking; keep it off the async workers.
        let body = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let mut response = agent
                .get(url.as_str())
                .query("query", &query)
                .header("Authorization", format!("Client-ID {}", client_id))
                .call()?;
            Ok(response.body_mut().read_to_string()?)
        })
        .await
        .map_err(|e| UnsplashError::Task(e.to_string()))?
        .map_err(|e| UnsplashError::Request(e.to_string()))?;

        parse_search_response(&body)
    }
}
