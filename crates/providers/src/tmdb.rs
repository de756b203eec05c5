use crate::{LookupOutcome, MediaKind, MediaMatch, MetadataLookup, ProviderError};
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
}

/// Title search against the TMDB v3 API.
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    cfg: Arc<TmdbConfig>,
}

impl TmdbClient {
    pub fn new(cfg: TmdbConfig) -> Self {
        Self {
            client: Client::new(),
            cfg: Arc::new(cfg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    overview: String,
}

fn endpoint(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Tv => "search/tv",
        MediaKind::Movie | MediaKind::Audiobook => "search/movie",
    }
}

/// Leading four digits of a TMDB date, if present.
fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn first_match(resp: SearchResponse, kind: MediaKind) -> LookupOutcome {
    let Some(result) = resp.results.into_iter().next() else {
        return LookupOutcome::NotFound;
    };
    let (title, date) = match kind {
        MediaKind::Tv => (result.name, result.first_air_date),
        MediaKind::Movie | MediaKind::Audiobook => (result.title, result.release_date),
    };
    LookupOutcome::Found(MediaMatch {
        title: title.unwrap_or_default(),
        year: year_of(date.as_deref()),
        overview: result.overview,
    })
}

#[async_trait::async_trait]
impl MetadataLookup for TmdbClient {
    async fn search(&self, query: &str, kind: MediaKind) -> Result<LookupOutcome, ProviderError> {
        let url = format!(
            "{}/{}",
            self.cfg.base_url.trim_end_matches('/'),
            endpoint(kind)
        );
        debug!(%query, %kind, "tmdb search");
        let resp = self
            .client
            .get(url)
            .query(&[
                ("api_key", self.cfg.api_key.as_str()),
                ("query", query),
                ("language", self.cfg.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(ProviderError::RequestFailed(format!(
                "status {} body {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }
        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        Ok(first_match(parsed, kind))
    }
}
