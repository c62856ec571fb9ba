use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::{Item, Person};

/// How a field must be canonicalized before two snapshots are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    /// Semantically unordered list of strings
    UnorderedSet,
    /// String to string map, compared with sorted keys
    KeyedMap,
    /// Credited people, ordered by name before comparison
    PeopleList,
}

/// Content fields that participate in diffs, in their fixed reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataField {
    Name,
    OriginalTitle,
    Overview,
    OfficialRating,
    ProductionYear,
    PremiereDate,
    EndDate,
    CommunityRating,
    Genres,
    Tags,
    Studios,
    People,
    ProviderIds,
}

impl MetadataField {
    pub const ALL: [MetadataField; 13] = [
        MetadataField::Name,
        MetadataField::OriginalTitle,
        MetadataField::Overview,
        MetadataField::OfficialRating,
        MetadataField::ProductionYear,
        MetadataField::PremiereDate,
        MetadataField::EndDate,
        MetadataField::CommunityRating,
        MetadataField::Genres,
        MetadataField::Tags,
        MetadataField::Studios,
        MetadataField::People,
        MetadataField::ProviderIds,
    ];

    /// Wire name (camelCase) used in diffs and patches.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Name => "name",
            MetadataField::OriginalTitle => "originalTitle",
            MetadataField::Overview => "overview",
            MetadataField::OfficialRating => "officialRating",
            MetadataField::ProductionYear => "productionYear",
            MetadataField::PremiereDate => "premiereDate",
            MetadataField::EndDate => "endDate",
            MetadataField::CommunityRating => "communityRating",
            MetadataField::Genres => "genres",
            MetadataField::Tags => "tags",
            MetadataField::Studios => "studios",
            MetadataField::People => "people",
            MetadataField::ProviderIds => "providerIds",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            MetadataField::Genres | MetadataField::Tags | MetadataField::Studios => {
                FieldKind::UnorderedSet
            }
            MetadataField::ProviderIds => FieldKind::KeyedMap,
            MetadataField::People => FieldKind::PeopleList,
            _ => FieldKind::Scalar,
        }
    }

    /// Jellyfin's `MetadataField` lock name, when the server can lock it
    /// individually.
    pub fn jellyfin_lock_name(&self) -> Option<&'static str> {
        match self {
            MetadataField::Name => Some("Name"),
            MetadataField::Overview => Some("Overview"),
            MetadataField::OfficialRating => Some("OfficialRating"),
            MetadataField::Genres => Some("Genres"),
            MetadataField::Tags => Some("Tags"),
            MetadataField::Studios => Some("Studios"),
            MetadataField::People => Some("Cast"),
            _ => None,
        }
    }
}

impl Display for MetadataField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the editable content of one item.
///
/// Absent values are `None`; an empty collection on the item is treated as
/// absent so that "no genres" and "genres never set" diff identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premiere_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studios: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub people: Option<Vec<Person>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_ids: Option<BTreeMap<String, String>>,
    /// Jellyfin field locks; never diffed, only used for conflict marking.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locked_fields: Vec<String>,
    #[serde(default)]
    pub lock_data: bool,
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

impl ItemMetadata {
    pub fn from_item(item: &Item) -> Self {
        Self {
            name: Some(item.name.clone()),
            original_title: item.original_title.clone(),
            overview: item.overview.clone(),
            official_rating: item.official_rating.clone(),
            production_year: item.production_year,
            premiere_date: item.premiere_date,
            end_date: item.end_date,
            community_rating: item.community_rating,
            genres: non_empty(&item.genres),
            tags: non_empty(&item.tags),
            studios: non_empty(&item.studios),
            people: non_empty(&item.people),
            provider_ids: (!item.provider_ids.is_empty())
                .then(|| item.provider_ids.clone()),
            locked_fields: item.locked_fields.clone(),
            lock_data: item.lock_data,
        }
    }

    /// Write the content fields back onto an item. Lock state and
    /// misclassification fields are left untouched.
    pub fn apply_to(&self, item: &mut Item) {
        self.apply_fields_to(item, MetadataField::ALL);
    }

    /// Write only `fields` back onto an item.
    pub fn apply_fields_to(
        &self,
        item: &mut Item,
        fields: impl IntoIterator<Item = MetadataField>,
    ) {
        for field in fields {
            match field {
                MetadataField::Name => {
                    if let Some(name) = &self.name {
                        item.name = name.clone();
                    }
                }
                MetadataField::OriginalTitle => {
                    item.original_title = self.original_title.clone()
                }
                MetadataField::Overview => item.overview = self.overview.clone(),
                MetadataField::OfficialRating => {
                    item.official_rating = self.official_rating.clone()
                }
                MetadataField::ProductionYear => item.production_year = self.production_year,
                MetadataField::PremiereDate => item.premiere_date = self.premiere_date,
                MetadataField::EndDate => item.end_date = self.end_date,
                MetadataField::CommunityRating => {
                    item.community_rating = self.community_rating
                }
                MetadataField::Genres => {
                    item.genres = self.genres.clone().unwrap_or_default()
                }
                MetadataField::Tags => item.tags = self.tags.clone().unwrap_or_default(),
                MetadataField::Studios => {
                    item.studios = self.studios.clone().unwrap_or_default()
                }
                MetadataField::People => {
                    item.people = self.people.clone().unwrap_or_default()
                }
                MetadataField::ProviderIds => {
                    item.provider_ids = self.provider_ids.clone().unwrap_or_default()
                }
            }
        }
    }

    /// JSON view of one field; `None` when the field is absent.
    pub fn value_of(&self, field: MetadataField) -> Option<Value> {
        fn to_value<T: Serialize>(value: &Option<T>) -> Option<Value> {
            value
                .as_ref()
                .and_then(|inner| serde_json::to_value(inner).ok())
                .filter(|json| !json.is_null())
        }

        match field {
            MetadataField::Name => to_value(&self.name),
            MetadataField::OriginalTitle => to_value(&self.original_title),
            MetadataField::Overview => to_value(&self.overview),
            MetadataField::OfficialRating => to_value(&self.official_rating),
            MetadataField::ProductionYear => to_value(&self.production_year),
            MetadataField::PremiereDate => to_value(&self.premiere_date),
            MetadataField::EndDate => to_value(&self.end_date),
            MetadataField::CommunityRating => to_value(&self.community_rating),
            MetadataField::Genres => to_value(&self.genres),
            MetadataField::Tags => to_value(&self.tags),
            MetadataField::Studios => to_value(&self.studios),
            MetadataField::People => to_value(&self.people),
            MetadataField::ProviderIds => to_value(&self.provider_ids),
        }
    }

    pub fn is_locked(&self, field: MetadataField) -> bool {
        self.lock_data
            || field.jellyfin_lock_name().is_some_and(|name| {
                self.locked_fields
                    .iter()
                    .any(|locked| locked.eq_ignore_ascii_case(name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LibraryId;
    use crate::item::ItemType;

    #[test]
    fn empty_collections_snapshot_as_absent() {
        let item = Item::new(LibraryId::new(), "jf", "Heat", ItemType::Movie);
        let snapshot = ItemMetadata::from_item(&item);
        assert_eq!(snapshot.name.as_deref(), Some("Heat"));
        assert!(snapshot.genres.is_none());
        assert!(snapshot.value_of(MetadataField::ProviderIds).is_none());
    }

    #[test]
    fn lock_names_follow_jellyfin() {
        let snapshot = ItemMetadata {
            locked_fields: vec!["cast".into()],
            ..Default::default()
        };
        assert!(snapshot.is_locked(MetadataField::People));
        assert!(!snapshot.is_locked(MetadataField::Genres));
        assert!(!snapshot.is_locked(MetadataField::ProductionYear));
    }

    #[test]
    fn masked_apply_leaves_other_fields() {
        let mut item = Item::new(LibraryId::new(), "jf", "Heat", ItemType::Movie);
        item.tags = vec!["4k".into()];
        let snapshot = ItemMetadata {
            name: Some("Heat (1995)".into()),
            genres: Some(vec!["Crime".into()]),
            ..Default::default()
        };

        snapshot.apply_fields_to(&mut item, [MetadataField::Genres]);

        assert_eq!(item.name, "Heat");
        assert_eq!(item.genres, vec!["Crime".to_string()]);
        assert_eq!(item.tags, vec!["4k".to_string()]);
    }

    #[test]
    fn every_field_resolves_by_wire_name() {
        for field in MetadataField::ALL {
            assert_eq!(MetadataField::from_wire(field.as_str()), Some(field));
        }
    }
}
