use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::{ItemId, LibraryId};
use crate::misclassification::{Reason, Severity};

/// Jellyfin stores runtimes in 100ns ticks.
pub const TICKS_PER_MINUTE: i64 = 600_000_000;

/// Classification of a tracked media entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Series,
    Season,
    Episode,
    Movie,
    Collection,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [
        ItemType::Series,
        ItemType::Season,
        ItemType::Episode,
        ItemType::Movie,
        ItemType::Collection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Series => "Series",
            ItemType::Season => "Season",
            ItemType::Episode => "Episode",
            ItemType::Movie => "Movie",
            ItemType::Collection => "Collection",
        }
    }

    /// Name of the matching `BaseItemKind` on the Jellyfin side.
    pub fn jellyfin_kind(&self) -> &'static str {
        match self {
            ItemType::Collection => "BoxSet",
            other => other.as_str(),
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "series" => Ok(ItemType::Series),
            "season" => Ok(ItemType::Season),
            "episode" => Ok(ItemType::Episode),
            "movie" => Ok(ItemType::Movie),
            "collection" | "boxset" => Ok(ItemType::Collection),
            _ => Err(ModelError::UnknownVariant {
                kind: "item type",
                value: s.to_string(),
            }),
        }
    }
}

/// A credited person on an item (cast or crew)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            kind: None,
        }
    }
}

/// A Jellyfin library (virtual folder) mirrored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub id: LibraryId,
    pub jellyfin_id: String,
    pub name: String,
    pub collection_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn new(jellyfin_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: LibraryId::new(),
            jellyfin_id: jellyfin_id.into(),
            name: name.into(),
            collection_type: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A media entity tracked locally: the canonical copy of a Jellyfin item
/// plus the curation state attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub jellyfin_id: String,
    pub library_id: LibraryId,
    pub parent_id: Option<ItemId>,
    pub name: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub index_number: Option<i32>,
    pub parent_index_number: Option<i32>,
    pub runtime_ticks: Option<i64>,
    pub production_year: Option<i32>,
    pub premiere_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub official_rating: Option<String>,
    pub community_rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub provider_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub locked_fields: Vec<String>,
    #[serde(default)]
    pub lock_data: bool,
    #[serde(default)]
    pub suspected_misclassification: bool,
    pub misclassification_score: Option<f64>,
    #[serde(default)]
    pub misclassification_reasons: Vec<Reason>,
    pub misclassification_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        library_id: LibraryId,
        jellyfin_id: impl Into<String>,
        name: impl Into<String>,
        item_type: ItemType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            jellyfin_id: jellyfin_id.into(),
            library_id,
            parent_id: None,
            name: name.into(),
            original_title: None,
            overview: None,
            path: None,
            item_type,
            index_number: None,
            parent_index_number: None,
            runtime_ticks: None,
            production_year: None,
            premiere_date: None,
            end_date: None,
            official_rating: None,
            community_rating: None,
            genres: Vec::new(),
            tags: Vec::new(),
            studios: Vec::new(),
            people: Vec::new(),
            provider_ids: BTreeMap::new(),
            locked_fields: Vec::new(),
            lock_data: false,
            suspected_misclassification: false,
            misclassification_score: None,
            misclassification_reasons: Vec::new(),
            misclassification_checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: ItemId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_index(mut self, index_number: i32) -> Self {
        self.index_number = Some(index_number);
        self
    }

    pub fn with_runtime_minutes(mut self, minutes: i64) -> Self {
        self.runtime_ticks = Some(minutes * TICKS_PER_MINUTE);
        self
    }

    pub fn runtime_minutes(&self) -> Option<f64> {
        self.runtime_ticks
            .filter(|ticks| *ticks > 0)
            .map(|ticks| ticks as f64 / TICKS_PER_MINUTE as f64)
    }

    /// Flag the item; the score is only ever stored together with the flag.
    pub fn flag_misclassification(
        &mut self,
        score: f64,
        reasons: Vec<Reason>,
        checked_at: DateTime<Utc>,
    ) {
        self.suspected_misclassification = true;
        self.misclassification_score = Some(score.clamp(0.0, 1.0));
        self.misclassification_reasons = reasons;
        self.misclassification_checked_at = Some(checked_at);
    }

    pub fn clear_misclassification(&mut self, checked_at: DateTime<Utc>) {
        self.suspected_misclassification = false;
        self.misclassification_score = None;
        self.misclassification_reasons.clear();
        self.misclassification_checked_at = Some(checked_at);
    }

    pub fn max_reason_severity(&self) -> Option<Severity> {
        self.misclassification_reasons
            .iter()
            .map(|reason| reason.severity)
            .max()
    }

    /// Whether `field` is locked against external edits in Jellyfin.
    pub fn is_field_locked(&self, jellyfin_field: &str) -> bool {
        self.lock_data
            || self
                .locked_fields
                .iter()
                .any(|locked| locked.eq_ignore_ascii_case(jellyfin_field))
    }
}
