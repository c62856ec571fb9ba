//! The fixed detector battery. Each detector is a pure function over an
//! [`ItemContext`] and contributes at most one finding.

use curator_model::{Item, ItemType, Reason, ReasonType, Severity};

use super::patterns::{
    is_tv_directory, looks_like_episode, looks_like_movie, looks_like_season, path_segments,
};

const MAX_EPISODE_MINUTES: f64 = 120.0;
const MIN_MOVIE_MINUTES: f64 = 60.0;
const MIN_EPISODE_PATH_SEGMENTS: usize = 3;
const TV_MARKER_DEPTH: usize = 2;

/// Snapshot handed to every detector.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub item: &'a Item,
    pub children: &'a [Item],
    pub parent: Option<&'a Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub reason: Reason,
    pub suggested_type: Option<ItemType>,
}

impl Finding {
    fn new(
        reason_type: ReasonType,
        description: impl Into<String>,
        severity: Severity,
        confidence: f64,
        suggested_type: Option<ItemType>,
    ) -> Self {
        Self {
            reason: Reason::new(reason_type, description, severity, confidence),
            suggested_type,
        }
    }
}

pub type DetectorFn = fn(&ItemContext<'_>) -> Option<Finding>;

/// A detector plus the highest severity it can report, which bounds its
/// share of the normalized score.
#[derive(Debug, Clone, Copy)]
pub struct DetectorSpec {
    pub kind: ReasonType,
    pub ceiling: Severity,
    pub run: DetectorFn,
}

/// Ordered by suggestion priority: earlier detectors win when several
/// suggest a type.
pub const DETECTORS: [DetectorSpec; 5] = [
    DetectorSpec {
        kind: ReasonType::NamingPattern,
        ceiling: Severity::High,
        run: naming_pattern,
    },
    DetectorSpec {
        kind: ReasonType::PathStructure,
        ceiling: Severity::High,
        run: path_structure,
    },
    DetectorSpec {
        kind: ReasonType::MetadataConsistency,
        ceiling: Severity::Medium,
        run: metadata_consistency,
    },
    DetectorSpec {
        kind: ReasonType::DurationAnomaly,
        ceiling: Severity::Medium,
        run: duration_anomaly,
    },
    DetectorSpec {
        kind: ReasonType::MissingSeasons,
        ceiling: Severity::Low,
        run: missing_seasons,
    },
];

pub fn naming_pattern(ctx: &ItemContext<'_>) -> Option<Finding> {
    let item = ctx.item;
    let name = item.name.as_str();

    if looks_like_episode(name) {
        return (item.item_type != ItemType::Episode).then(|| {
            Finding::new(
                ReasonType::NamingPattern,
                format!("Name contains an episode marker but item is a {}", item.item_type),
                Severity::High,
                0.9,
                Some(ItemType::Episode),
            )
        });
    }

    if looks_like_season(name) {
        return (item.item_type != ItemType::Season).then(|| {
            Finding::new(
                ReasonType::NamingPattern,
                format!("Name contains a season marker but item is a {}", item.item_type),
                Severity::Medium,
                0.7,
                Some(ItemType::Season),
            )
        });
    }

    (item.item_type == ItemType::Episode && looks_like_movie(name)).then(|| {
        Finding::new(
            ReasonType::NamingPattern,
            "Episode name carries a release year or disc source tag",
            Severity::Medium,
            0.6,
            Some(ItemType::Movie),
        )
    })
}

pub fn path_structure(ctx: &ItemContext<'_>) -> Option<Finding> {
    let item = ctx.item;
    let path = item.path.as_deref()?;
    let segments = path_segments(path);

    match item.item_type {
        ItemType::Episode if segments.len() < MIN_EPISODE_PATH_SEGMENTS => Some(Finding::new(
            ReasonType::PathStructure,
            format!("Episode path is only {} level(s) deep", segments.len()),
            Severity::Medium,
            0.6,
            Some(ItemType::Movie),
        )),
        ItemType::Movie => {
            let directories = segments.split_last().map(|(_, dirs)| dirs).unwrap_or_default();
            let start = directories.len().saturating_sub(TV_MARKER_DEPTH);
            directories[start..]
                .iter()
                .find(|segment| is_tv_directory(segment))
                .map(|segment| {
                    Finding::new(
                        ReasonType::PathStructure,
                        format!("Movie is stored under TV directory '{segment}'"),
                        Severity::High,
                        0.8,
                        Some(ItemType::Episode),
                    )
                })
        }
        _ => None,
    }
}

pub fn metadata_consistency(ctx: &ItemContext<'_>) -> Option<Finding> {
    let item = ctx.item;
    match item.item_type {
        ItemType::Series => {
            let has_episodes = ctx
                .children
                .iter()
                .any(|child| child.item_type == ItemType::Episode);
            let has_seasons = ctx
                .children
                .iter()
                .any(|child| child.item_type == ItemType::Season);
            (has_episodes && !has_seasons).then(|| {
                Finding::new(
                    ReasonType::MetadataConsistency,
                    "Series has episodes but no seasons",
                    Severity::Medium,
                    0.7,
                    None,
                )
            })
        }
        ItemType::Season if ctx.children.is_empty() => Some(Finding::new(
            ReasonType::MetadataConsistency,
            "Season has no episodes",
            Severity::Medium,
            0.6,
            None,
        )),
        ItemType::Episode => ctx
            .parent
            .filter(|parent| {
                !matches!(parent.item_type, ItemType::Season | ItemType::Series)
            })
            .map(|parent| {
                Finding::new(
                    ReasonType::MetadataConsistency,
                    format!("Episode is parented by a {}", parent.item_type),
                    Severity::Medium,
                    0.6,
                    None,
                )
            }),
        _ => None,
    }
}

pub fn duration_anomaly(ctx: &ItemContext<'_>) -> Option<Finding> {
    let item = ctx.item;
    let minutes = item.runtime_minutes()?;

    match item.item_type {
        ItemType::Episode if minutes > MAX_EPISODE_MINUTES => Some(Finding::new(
            ReasonType::DurationAnomaly,
            format!("Episode runtime of {minutes:.0} minutes is feature length"),
            Severity::Medium,
            0.7,
            Some(ItemType::Movie),
        )),
        ItemType::Movie if minutes < MIN_MOVIE_MINUTES => Some(Finding::new(
            ReasonType::DurationAnomaly,
            format!("Movie runtime of {minutes:.0} minutes is episode length"),
            Severity::Medium,
            0.5,
            Some(ItemType::Episode),
        )),
        _ => None,
    }
}

pub fn missing_seasons(ctx: &ItemContext<'_>) -> Option<Finding> {
    if ctx.item.item_type != ItemType::Series {
        return None;
    }

    let mut numbers: Vec<i32> = ctx
        .children
        .iter()
        .filter(|child| child.item_type == ItemType::Season)
        .filter_map(|season| season.index_number)
        .collect();
    numbers.sort_unstable();
    numbers.dedup();

    let missing: Vec<i32> = numbers
        .windows(2)
        .filter(|pair| pair[1] - pair[0] > 1)
        .flat_map(|pair| (pair[0] + 1)..pair[1])
        .collect();

    if missing.is_empty() {
        return None;
    }

    let listed = missing
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(Finding::new(
        ReasonType::MissingSeasons,
        format!("Missing season(s): {listed}"),
        Severity::Low,
        0.5,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_model::LibraryId;

    fn item(name: &str, item_type: ItemType) -> Item {
        Item::new(LibraryId::new(), format!("jf-{name}"), name, item_type)
    }

    fn ctx(item: &Item) -> ItemContext<'_> {
        ItemContext {
            item,
            children: &[],
            parent: None,
        }
    }

    #[test]
    fn naming_flags_episode_marker_on_movie() {
        let movie = item("Show.S01E05.mkv", ItemType::Movie);
        let finding = naming_pattern(&ctx(&movie)).unwrap();
        assert_eq!(finding.reason.severity, Severity::High);
        assert_eq!(finding.suggested_type, Some(ItemType::Episode));

        let episode = item("Show.S01E05.mkv", ItemType::Episode);
        assert!(naming_pattern(&ctx(&episode)).is_none());
    }

    #[test]
    fn naming_flags_movie_markers_only_on_episodes() {
        let episode = item("Heat (1995)", ItemType::Episode);
        let finding = naming_pattern(&ctx(&episode)).unwrap();
        assert_eq!(finding.suggested_type, Some(ItemType::Movie));

        let series = item("Doctor Who (2005)", ItemType::Series);
        assert!(naming_pattern(&ctx(&series)).is_none());
    }

    #[test]
    fn path_checks_depth_and_tv_directories() {
        let shallow = item("Pilot", ItemType::Episode).with_path("/pilot.mkv");
        assert!(path_structure(&ctx(&shallow)).is_some());

        let nested = item("Pilot", ItemType::Episode).with_path("/tv/Show/Season 01/pilot.mkv");
        assert!(path_structure(&ctx(&nested)).is_none());

        let movie = item("Pilot", ItemType::Movie).with_path("/movies/Show/Season 01/pilot.mkv");
        let finding = path_structure(&ctx(&movie)).unwrap();
        assert_eq!(finding.reason.severity, Severity::High);

        let plain = item("Heat", ItemType::Movie).with_path("/movies/Heat (1995)/Heat.mkv");
        assert!(path_structure(&ctx(&plain)).is_none());
    }

    #[test]
    fn duration_thresholds() {
        let long = item("Finale", ItemType::Episode).with_runtime_minutes(121);
        assert!(duration_anomaly(&ctx(&long)).is_some());
        let exact = item("Finale", ItemType::Episode).with_runtime_minutes(120);
        assert!(duration_anomaly(&ctx(&exact)).is_none());
        let short = item("Short", ItemType::Movie).with_runtime_minutes(42);
        assert_eq!(
            duration_anomaly(&ctx(&short)).unwrap().suggested_type,
            Some(ItemType::Episode)
        );
    }

    #[test]
    fn missing_seasons_lists_gaps() {
        let library = LibraryId::new();
        let series = Item::new(library, "jf-series", "Show", ItemType::Series);
        let seasons: Vec<Item> = [1, 2, 5]
            .into_iter()
            .map(|n| {
                Item::new(library, format!("jf-s{n}"), format!("Season {n}"), ItemType::Season)
                    .with_parent(series.id)
                    .with_index(n)
            })
            .collect();
        let context = ItemContext {
            item: &series,
            children: &seasons,
            parent: None,
        };
        let finding = missing_seasons(&context).unwrap();
        assert_eq!(finding.reason.description, "Missing season(s): 3, 4");
        assert_eq!(finding.reason.severity, Severity::Low);
        assert!(metadata_consistency(&context).is_none());
    }
}
