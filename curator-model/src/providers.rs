use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::item::ItemType;

/// What a metadata provider can do, declared up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub search: bool,
    pub metadata: bool,
    pub artwork: bool,
    pub episodes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Search,
    Metadata,
    Artwork,
    Episodes,
}

impl ProviderCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Search => self.search,
            Capability::Metadata => self.metadata,
            Capability::Artwork => self.artwork,
            Capability::Episodes => self.episodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub capabilities: ProviderCapabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSearchResult {
    pub provider: String,
    pub external_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub year: Option<i32>,
    pub overview: Option<String>,
    /// Provider relevance, higher is better
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub provider: String,
    pub external_id: String,
    pub name: String,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub premiere_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub community_rating: Option<f64>,
    pub runtime_minutes: Option<i64>,
    /// Cross references in Jellyfin's key convention (`Imdb`, `Tvdb`, ...)
    pub provider_ids: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderArtwork {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEpisode {
    pub external_id: String,
    pub season_number: i32,
    pub episode_number: Option<i32>,
    pub name: String,
    pub air_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i64>,
    pub overview: Option<String>,
}
