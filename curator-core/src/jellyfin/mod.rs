//! Jellyfin HTTP client and the library sync built on it.

mod sink;
pub mod sync;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use curator_model::{Item, ItemId, ItemMetadata, ItemType, LibraryId, Person};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

pub use sink::{DisabledSink, MetadataSink};
pub use sync::{LibrarySource, LibrarySyncService};

const AUTH_HEADER: &str = "X-Emby-Token";
const ITEM_FIELDS: &str = "Overview,Path,Genres,Tags,Studios,People,ProviderIds,\
OriginalTitle,OfficialRating,PremiereDate,EndDate,ProductionYear,LockedFields,LockData";

#[derive(Debug, thiserror::Error)]
pub enum JellyfinError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid Jellyfin URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Jellyfin returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected Jellyfin payload: {0}")]
    Decode(String),
}

/// `GET /Library/VirtualFolders` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualFolder {
    pub name: String,
    pub item_id: String,
    #[serde(default)]
    pub collection_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameIdPair {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItemPerson {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "Type")]
    pub kind: Option<String>,
}

/// The subset of Jellyfin's `BaseItemDto` the curator reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BaseItemDto {
    pub id: String,
    pub name: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: String,
    pub parent_id: Option<String>,
    pub series_id: Option<String>,
    pub season_id: Option<String>,
    pub index_number: Option<i32>,
    pub parent_index_number: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub production_year: Option<i32>,
    pub premiere_date: Option<String>,
    pub end_date: Option<String>,
    pub official_rating: Option<String>,
    pub community_rating: Option<f64>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub studios: Vec<NameIdPair>,
    pub people: Vec<BaseItemPerson>,
    pub provider_ids: BTreeMap<String, String>,
    pub locked_fields: Vec<String>,
    pub lock_data: bool,
}

fn parse_jellyfin_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

impl BaseItemDto {
    pub fn curator_type(&self) -> Option<ItemType> {
        self.item_type.parse().ok()
    }

    /// Jellyfin id of the structural parent: season for episodes, series
    /// for seasons, otherwise the folder parent.
    pub fn parent_jellyfin_id(&self) -> Option<&str> {
        match self.curator_type() {
            Some(ItemType::Episode) => self.season_id.as_deref().or(self.series_id.as_deref()),
            Some(ItemType::Season) => self.series_id.as_deref(),
            _ => None,
        }
        .or(self.parent_id.as_deref())
    }

    pub fn into_item(
        self,
        library_id: LibraryId,
        parent_id: Option<ItemId>,
    ) -> Result<Item, JellyfinError> {
        let item_type = self.curator_type().ok_or_else(|| {
            JellyfinError::Decode(format!("unsupported item type {}", self.item_type))
        })?;
        let mut item = Item::new(library_id, self.id, self.name, item_type);
        item.parent_id = parent_id;
        item.original_title = self.original_title;
        item.overview = self.overview;
        item.path = self.path;
        item.index_number = self.index_number;
        item.parent_index_number = self.parent_index_number;
        item.runtime_ticks = self.run_time_ticks;
        item.production_year = self.production_year;
        item.premiere_date = parse_jellyfin_date(self.premiere_date.as_deref());
        item.end_date = parse_jellyfin_date(self.end_date.as_deref());
        item.official_rating = self.official_rating;
        item.community_rating = self.community_rating;
        item.genres = self.genres;
        item.tags = self.tags;
        item.studios = self.studios.into_iter().map(|studio| studio.name).collect();
        item.people = self
            .people
            .into_iter()
            .map(|person| Person {
                name: person.name,
                role: person.role,
                kind: person.kind,
            })
            .collect();
        item.provider_ids = self.provider_ids;
        item.locked_fields = self.locked_fields;
        item.lock_data = self.lock_data;
        Ok(item)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsQuery {
    pub parent_id: Option<String>,
    pub item_types: Vec<ItemType>,
    pub start_index: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemsPage {
    pub items: Vec<BaseItemDto>,
    pub total_record_count: u32,
    pub start_index: u32,
}

/// Overwrite the editable fields of a raw `BaseItemDto` with a snapshot,
/// leaving every other field as Jellyfin sent it.
pub fn merge_metadata(dto: &mut Map<String, Value>, metadata: &ItemMetadata) {
    fn set<T: Serialize>(dto: &mut Map<String, Value>, key: &str, value: Option<T>) {
        let json = value
            .and_then(|inner| serde_json::to_value(inner).ok())
            .unwrap_or(Value::Null);
        dto.insert(key.to_string(), json);
    }

    if let Some(name) = &metadata.name {
        dto.insert("Name".into(), Value::String(name.clone()));
    }
    set(dto, "OriginalTitle", metadata.original_title.as_ref());
    set(dto, "Overview", metadata.overview.as_ref());
    set(dto, "OfficialRating", metadata.official_rating.as_ref());
    set(dto, "ProductionYear", metadata.production_year);
    set(
        dto,
        "PremiereDate",
        metadata.premiere_date.map(|date| format!("{date}T00:00:00.0000000Z")),
    );
    set(
        dto,
        "EndDate",
        metadata.end_date.map(|date| format!("{date}T00:00:00.0000000Z")),
    );
    set(dto, "CommunityRating", metadata.community_rating);
    set(dto, "Genres", Some(metadata.genres.clone().unwrap_or_default()));
    set(dto, "Tags", Some(metadata.tags.clone().unwrap_or_default()));
    let studios: Vec<NameIdPair> = metadata
        .studios
        .iter()
        .flatten()
        .map(|name| NameIdPair {
            name: name.clone(),
            id: None,
        })
        .collect();
    set(dto, "Studios", Some(studios));
    let people: Vec<BaseItemPerson> = metadata
        .people
        .iter()
        .flatten()
        .map(|person| BaseItemPerson {
            name: person.name.clone(),
            role: person.role.clone(),
            kind: person.kind.clone(),
        })
        .collect();
    set(dto, "People", Some(people));
    set(
        dto,
        "ProviderIds",
        Some(metadata.provider_ids.clone().unwrap_or_default()),
    );
}

/// Thin reqwest wrapper around the handful of Jellyfin endpoints used here.
#[derive(Debug, Clone)]
pub struct JellyfinClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl JellyfinClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, JellyfinError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, JellyfinError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, JellyfinError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(JellyfinError::Status {
            status: status.as_u16(),
            body,
        })
    }

    pub async fn fetch_libraries(&self) -> Result<Vec<VirtualFolder>, JellyfinError> {
        let response = self
            .http
            .get(self.endpoint("Library/VirtualFolders")?)
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn fetch_items(&self, query: &ItemsQuery) -> Result<ItemsPage, JellyfinError> {
        let include_types = query
            .item_types
            .iter()
            .map(ItemType::jellyfin_kind)
            .collect::<Vec<_>>()
            .join(",");
        let mut params: Vec<(&str, String)> = vec![
            ("Recursive", "true".into()),
            ("Fields", ITEM_FIELDS.into()),
            ("StartIndex", query.start_index.to_string()),
            ("Limit", query.limit.to_string()),
        ];
        if let Some(parent_id) = &query.parent_id {
            params.push(("ParentId", parent_id.clone()));
        }
        if !include_types.is_empty() {
            params.push(("IncludeItemTypes", include_types));
        }

        let response = self
            .http
            .get(self.endpoint("Items")?)
            .header(AUTH_HEADER, &self.api_key)
            .query(&params)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch the raw item, merge the snapshot into it and post it back.
    pub async fn write_metadata(
        &self,
        jellyfin_id: &str,
        metadata: &ItemMetadata,
    ) -> Result<(), JellyfinError> {
        let url = self.endpoint(&format!("Items/{jellyfin_id}"))?;
        let response = self
            .http
            .get(url.clone())
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await?;
        let mut dto = match Self::check(response).await?.json::<Value>().await? {
            Value::Object(map) => map,
            other => {
                return Err(JellyfinError::Decode(format!(
                    "expected an item object, got {other}"
                )));
            }
        };

        merge_metadata(&mut dto, metadata);

        let response = self
            .http
            .post(url)
            .header(AUTH_HEADER, &self.api_key)
            .json(&Value::Object(dto))
            .send()
            .await?;
        Self::check(response).await?;
        debug!(%jellyfin_id, "pushed metadata to jellyfin");
        Ok(())
    }
}

#[async_trait]
impl MetadataSink for JellyfinClient {
    async fn write_metadata(
        &self,
        jellyfin_id: &str,
        metadata: &ItemMetadata,
    ) -> Result<(), JellyfinError> {
        JellyfinClient::write_metadata(self, jellyfin_id, metadata).await
    }
}
