use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use curator_model::{
    ItemType, ProviderCapabilities, ProviderEpisode, ProviderMetadata, ProviderSearchResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use super::{MetadataProvider, ProviderError};

pub const TVMAZE_BASE_URL: &str = "https://api.tvmaze.com";
/// TVMaze allows roughly 20 calls per 10 seconds.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("html tag regex should compile"));

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f64,
    show: Show,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rating {
    average: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Externals {
    tvrage: Option<u64>,
    thetvdb: Option<u64>,
    imdb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Show {
    id: u64,
    name: String,
    genres: Vec<String>,
    premiered: Option<String>,
    ended: Option<String>,
    runtime: Option<i64>,
    rating: Rating,
    summary: Option<String>,
    externals: Externals,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Episode {
    id: u64,
    name: String,
    season: i32,
    number: Option<i32>,
    airdate: Option<String>,
    runtime: Option<i64>,
    summary: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

fn strip_html(raw: Option<String>) -> Option<String> {
    raw.map(|text| HTML_TAG.replace_all(&text, "").trim().to_string())
        .filter(|text| !text.is_empty())
}

impl Show {
    fn into_metadata(self) -> ProviderMetadata {
        let mut provider_ids = BTreeMap::new();
        provider_ids.insert("TvMaze".to_string(), self.id.to_string());
        if let Some(tvdb) = self.externals.thetvdb {
            provider_ids.insert("Tvdb".to_string(), tvdb.to_string());
        }
        if let Some(imdb) = self.externals.imdb {
            provider_ids.insert("Imdb".to_string(), imdb);
        }
        if let Some(tvrage) = self.externals.tvrage {
            provider_ids.insert("TvRage".to_string(), tvrage.to_string());
        }

        ProviderMetadata {
            provider: TvMazeProvider::NAME.to_string(),
            external_id: self.id.to_string(),
            name: self.name,
            overview: strip_html(self.summary),
            genres: self.genres,
            premiere_date: parse_date(self.premiered.as_deref()),
            end_date: parse_date(self.ended.as_deref()),
            community_rating: self.rating.average,
            runtime_minutes: self.runtime,
            provider_ids,
        }
    }

    fn into_search_result(self, score: f64) -> ProviderSearchResult {
        ProviderSearchResult {
            provider: TvMazeProvider::NAME.to_string(),
            external_id: self.id.to_string(),
            year: parse_date(self.premiered.as_deref()).map(|date| date.year()),
            name: self.name,
            item_type: ItemType::Series,
            overview: strip_html(self.summary),
            score,
        }
    }
}

impl Episode {
    fn into_provider_episode(self) -> ProviderEpisode {
        ProviderEpisode {
            external_id: self.id.to_string(),
            season_number: self.season,
            episode_number: self.number,
            name: self.name,
            air_date: parse_date(self.airdate.as_deref()),
            runtime_minutes: self.runtime,
            overview: strip_html(self.summary),
        }
    }
}

/// TV-only provider backed by the public TVMaze API. No artwork support.
#[derive(Debug)]
pub struct TvMazeProvider {
    http: Client,
    base_url: String,
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl TvMazeProvider {
    pub const NAME: &'static str = "tvmaze";

    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: TVMAZE_BASE_URL.to_string(),
            min_interval: DEFAULT_MIN_INTERVAL,
            next_slot: Mutex::new(Instant::now()),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Wait for the next request slot; requests are spaced by `min_interval`.
    async fn throttle(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.min_interval;
            slot
        };
        sleep_until(slot).await;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.throttle().await;
        let url = format!("{}{}", self.base_url, path);
        debug!(target: "curator::providers", %url, "tvmaze request");

        let response = self.http.get(&url).query(query).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(ProviderError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status if !status.is_success() => {
                return Err(ProviderError::ApiError(format!(
                    "tvmaze returned {status}"
                )));
            }
            _ => {}
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| ProviderError::ParseError(err.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for TvMazeProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            search: true,
            metadata: true,
            artwork: false,
            episodes: true,
        }
    }

    async fn search(
        &self,
        query: &str,
        item_type: Option<ItemType>,
    ) -> Result<Vec<ProviderSearchResult>, ProviderError> {
        if item_type.is_some_and(|kind| kind != ItemType::Series) {
            return Ok(Vec::new());
        }
        let hits: Vec<SearchHit> = self.get_json("/search/shows", &[("q", query)]).await?;
        Ok(hits
            .into_iter()
            .map(|hit| hit.show.into_search_result(hit.score))
            .collect())
    }

    async fn metadata(&self, external_id: &str) -> Result<ProviderMetadata, ProviderError> {
        let show: Show = self.get_json(&format!("/shows/{external_id}"), &[]).await?;
        Ok(show.into_metadata())
    }

    async fn episodes(&self, external_id: &str) -> Result<Vec<ProviderEpisode>, ProviderError> {
        let episodes: Vec<Episode> = self
            .get_json(&format!("/shows/{external_id}/episodes"), &[])
            .await?;
        Ok(episodes
            .into_iter()
            .map(Episode::into_provider_episode)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn show_maps_to_metadata() {
        let show: Show = serde_json::from_value(json!({
            "id": 169,
            "name": "Breaking Bad",
            "genres": ["Drama", "Crime", "Thriller"],
            "premiered": "2008-01-20",
            "ended": "2013-09-29",
            "runtime": 60,
            "rating": {"average": 9.2},
            "summary": "<p><b>Breaking Bad</b> follows a chemistry teacher.</p>",
            "externals": {"tvrage": 18164, "thetvdb": 81189, "imdb": "tt0903747"}
        }))
        .unwrap();

        let metadata = show.into_metadata();
        assert_eq!(metadata.external_id, "169");
        assert_eq!(
            metadata.overview.as_deref(),
            Some("Breaking Bad follows a chemistry teacher.")
        );
        assert_eq!(metadata.premiere_date, NaiveDate::from_ymd_opt(2008, 1, 20));
        assert_eq!(metadata.provider_ids["Imdb"], "tt0903747");
        assert_eq!(metadata.provider_ids["Tvdb"], "81189");
        assert_eq!(metadata.provider_ids["TvMaze"], "169");
    }

    #[test]
    fn sparse_episode_maps() {
        let episode: Episode = serde_json::from_value(json!({
            "id": 12192,
            "name": "Pilot",
            "season": 1,
            "number": null,
            "airdate": "",
            "summary": null
        }))
        .unwrap();
        let episode = episode.into_provider_episode();
        assert_eq!(episode.episode_number, None);
        assert_eq!(episode.air_date, None);
        assert_eq!(episode.overview, None);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_requests() {
        let provider = TvMazeProvider::new(Duration::from_secs(1))
            .unwrap()
            .with_min_interval(Duration::from_millis(500));
        let started = Instant::now();
        provider.throttle().await;
        provider.throttle().await;
        provider.throttle().await;
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }
}
