//! Metadata patch validation and application.

use std::collections::BTreeMap;

use curator_model::{ItemMetadata, MetadataField, MetadataPatch};

use crate::error::{CuratorError, Result};

const MIN_PRODUCTION_YEAR: i32 = 1800;
const MAX_PRODUCTION_YEAR: i32 = 2200;

/// Reject malformed patches before any item is resolved.
pub fn validate_patch(patch: &MetadataPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(CuratorError::validation("changes must not be empty"));
    }

    let scalars = [
        ("name", patch.name.as_deref()),
        ("originalTitle", patch.original_title.as_deref()),
        ("overview", patch.overview.as_deref()),
        ("officialRating", patch.official_rating.as_deref()),
    ];
    for (field, value) in scalars {
        if value.is_some_and(|text| text.trim().is_empty()) {
            return Err(CuratorError::validation(format!(
                "{field} must not be blank; use clearFields to remove it"
            )));
        }
    }

    if let Some(rating) = patch.community_rating
        && !(rating.is_finite() && (0.0..=10.0).contains(&rating))
    {
        return Err(CuratorError::validation(format!(
            "communityRating must be between 0 and 10, got {rating}"
        )));
    }

    if let Some(year) = patch.production_year
        && !(MIN_PRODUCTION_YEAR..=MAX_PRODUCTION_YEAR).contains(&year)
    {
        return Err(CuratorError::validation(format!(
            "productionYear {year} is out of range"
        )));
    }

    if let (Some(premiere), Some(end)) = (patch.premiere_date, patch.end_date)
        && end < premiere
    {
        return Err(CuratorError::validation(
            "endDate must not be before premiereDate",
        ));
    }

    let string_lists = [
        ("genres", patch.genres.as_deref().unwrap_or_default()),
        ("tags", patch.tags.as_deref().unwrap_or_default()),
        ("studios", patch.studios.as_deref().unwrap_or_default()),
        ("addGenres", patch.add_genres.as_slice()),
        ("removeGenres", patch.remove_genres.as_slice()),
        ("addTags", patch.add_tags.as_slice()),
        ("removeTags", patch.remove_tags.as_slice()),
        ("addStudios", patch.add_studios.as_slice()),
        ("removeStudios", patch.remove_studios.as_slice()),
    ];
    for (field, values) in string_lists {
        if values.iter().any(|value| value.trim().is_empty()) {
            return Err(CuratorError::validation(format!(
                "{field} must not contain blank entries"
            )));
        }
    }

    if let Some(people) = &patch.people
        && people.iter().any(|person| person.name.trim().is_empty())
    {
        return Err(CuratorError::validation("people entries need a name"));
    }

    if let Some(ids) = &patch.provider_ids
        && ids.keys().any(|key| key.trim().is_empty())
    {
        return Err(CuratorError::validation("providerIds keys must not be blank"));
    }

    for name in &patch.clear_fields {
        let field = MetadataField::from_wire(name).ok_or_else(|| {
            CuratorError::validation(format!("unknown field in clearFields: {name}"))
        })?;
        if field == MetadataField::Name {
            return Err(CuratorError::validation("name cannot be cleared"));
        }
        if sets_field(patch, field) {
            return Err(CuratorError::validation(format!(
                "{name} cannot be both set and cleared"
            )));
        }
    }

    Ok(())
}

fn sets_field(patch: &MetadataPatch, field: MetadataField) -> bool {
    match field {
        MetadataField::Name => patch.name.is_some(),
        MetadataField::OriginalTitle => patch.original_title.is_some(),
        MetadataField::Overview => patch.overview.is_some(),
        MetadataField::OfficialRating => patch.official_rating.is_some(),
        MetadataField::ProductionYear => patch.production_year.is_some(),
        MetadataField::PremiereDate => patch.premiere_date.is_some(),
        MetadataField::EndDate => patch.end_date.is_some(),
        MetadataField::CommunityRating => patch.community_rating.is_some(),
        MetadataField::Genres => {
            patch.genres.is_some() || !patch.add_genres.is_empty()
        }
        MetadataField::Tags => patch.tags.is_some() || !patch.add_tags.is_empty(),
        MetadataField::Studios => {
            patch.studios.is_some() || !patch.add_studios.is_empty()
        }
        MetadataField::People => patch.people.is_some(),
        MetadataField::ProviderIds => patch.provider_ids.is_some(),
    }
}

/// Build the proposed snapshot for one item. Pure; `current` is untouched.
pub fn apply_patch(current: &ItemMetadata, patch: &MetadataPatch) -> ItemMetadata {
    let mut proposed = current.clone();

    for field in patch.clear_fields.iter().filter_map(|name| MetadataField::from_wire(name)) {
        clear_field(&mut proposed, field);
    }

    if let Some(name) = &patch.name {
        proposed.name = Some(name.trim().to_string());
    }
    if let Some(title) = &patch.original_title {
        proposed.original_title = Some(title.trim().to_string());
    }
    if let Some(overview) = &patch.overview {
        proposed.overview = Some(overview.trim().to_string());
    }
    if let Some(rating) = &patch.official_rating {
        proposed.official_rating = Some(rating.trim().to_string());
    }
    if patch.production_year.is_some() {
        proposed.production_year = patch.production_year;
    }
    if patch.premiere_date.is_some() {
        proposed.premiere_date = patch.premiere_date;
    }
    if patch.end_date.is_some() {
        proposed.end_date = patch.end_date;
    }
    if patch.community_rating.is_some() {
        proposed.community_rating = patch.community_rating;
    }

    proposed.genres = merge_list(
        proposed.genres.take(),
        patch.genres.as_deref(),
        &patch.add_genres,
        &patch.remove_genres,
    );
    proposed.tags = merge_list(
        proposed.tags.take(),
        patch.tags.as_deref(),
        &patch.add_tags,
        &patch.remove_tags,
    );
    proposed.studios = merge_list(
        proposed.studios.take(),
        patch.studios.as_deref(),
        &patch.add_studios,
        &patch.remove_studios,
    );

    if let Some(people) = &patch.people {
        proposed.people = (!people.is_empty()).then(|| people.clone());
    }

    if let Some(updates) = &patch.provider_ids {
        proposed.provider_ids = merge_provider_ids(proposed.provider_ids.take(), updates);
    }

    proposed
}

fn clear_field(metadata: &mut ItemMetadata, field: MetadataField) {
    match field {
        MetadataField::Name => {}
        MetadataField::OriginalTitle => metadata.original_title = None,
        MetadataField::Overview => metadata.overview = None,
        MetadataField::OfficialRating => metadata.official_rating = None,
        MetadataField::ProductionYear => metadata.production_year = None,
        MetadataField::PremiereDate => metadata.premiere_date = None,
        MetadataField::EndDate => metadata.end_date = None,
        MetadataField::CommunityRating => metadata.community_rating = None,
        MetadataField::Genres => metadata.genres = None,
        MetadataField::Tags => metadata.tags = None,
        MetadataField::Studios => metadata.studios = None,
        MetadataField::People => metadata.people = None,
        MetadataField::ProviderIds => metadata.provider_ids = None,
    }
}

/// Replace-then-add-then-remove, case-insensitive and first-spelling-wins.
fn merge_list(
    current: Option<Vec<String>>,
    replacement: Option<&[String]>,
    add: &[String],
    remove: &[String],
) -> Option<Vec<String>> {
    if replacement.is_none() && add.is_empty() && remove.is_empty() {
        return current;
    }

    let base: Vec<String> = match replacement {
        Some(values) => values.to_vec(),
        None => current.unwrap_or_default(),
    };

    let mut merged: Vec<String> = Vec::with_capacity(base.len() + add.len());
    for value in base.iter().chain(add) {
        let value = value.trim();
        if !merged.iter().any(|existing| existing.eq_ignore_ascii_case(value)) {
            merged.push(value.to_string());
        }
    }
    merged.retain(|value| {
        !remove
            .iter()
            .any(|removed| removed.trim().eq_ignore_ascii_case(value))
    });

    (!merged.is_empty()).then_some(merged)
}

fn merge_provider_ids(
    current: Option<BTreeMap<String, String>>,
    updates: &BTreeMap<String, Option<String>>,
) -> Option<BTreeMap<String, String>> {
    let mut ids = current.unwrap_or_default();
    for (provider, value) in updates {
        match value {
            Some(id) if !id.trim().is_empty() => {
                ids.insert(provider.clone(), id.trim().to_string());
            }
            _ => {
                ids.remove(provider);
            }
        }
    }
    (!ids.is_empty()).then_some(ids)
}
