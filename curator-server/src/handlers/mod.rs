pub mod health;
pub mod misclassifications;
pub mod operations;
pub mod providers;
pub mod sync;

use std::str::FromStr;

use curator_model::ItemType;

use crate::infra::errors::AppError;

/// Upper bound for any paginated listing.
pub const MAX_PAGE_SIZE: u64 = 100;

pub(crate) fn page_limit(requested: Option<u64>, default: u64) -> u64 {
    requested.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
}

/// Parse a comma separated `types` query value.
pub(crate) fn parse_item_types(raw: Option<&str>) -> Result<Vec<ItemType>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| ItemType::from_str(part).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(page_limit(None, 20), 20);
        assert_eq!(page_limit(Some(500), 20), MAX_PAGE_SIZE);
        assert_eq!(page_limit(Some(0), 20), 1);
    }

    #[test]
    fn item_types_parse_from_csv() {
        assert_eq!(
            parse_item_types(Some("episode, Season,")).unwrap(),
            vec![ItemType::Episode, ItemType::Season]
        );
        assert!(parse_item_types(Some("Trailer")).is_err());
        assert!(parse_item_types(None).unwrap().is_empty());
    }
}
