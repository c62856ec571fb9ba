//! Analyzer scoring across the detector battery.

use curator_core::misclassification::{
    DETECTORS, ItemContext, MisclassificationAnalyzer, PERSIST_THRESHOLD, REVIEW_THRESHOLD,
    should_flag,
};
use curator_model::{Item, ItemType, LibraryId, ReasonType, Severity};

fn analyze(item: &Item, children: &[Item], parent: Option<&Item>) -> curator_model::MisclassificationAnalysis {
    MisclassificationAnalyzer::default().analyze(&ItemContext {
        item,
        children,
        parent,
    })
}

#[test]
fn episode_file_name_on_a_movie_needs_review() {
    let item = Item::new(LibraryId::new(), "jf-1", "Show.S01E05.mkv", ItemType::Movie);
    let analysis = analyze(&item, &[], None);

    let naming = analysis
        .reasons
        .iter()
        .find(|reason| reason.reason_type == ReasonType::NamingPattern)
        .expect("naming reason");
    assert_eq!(naming.severity, Severity::High);
    assert!(analysis.score > REVIEW_THRESHOLD);
    assert!(analysis.needs_review);
    assert_eq!(analysis.suggested_type, Some(ItemType::Episode));
    assert!(should_flag(&analysis));
}

#[test]
fn well_formed_episode_is_clean() {
    let library = LibraryId::new();
    let season = Item::new(library, "jf-s", "Season 1", ItemType::Season).with_index(1);
    let episode = Item::new(library, "jf-e", "Pilot", ItemType::Episode)
        .with_parent(season.id)
        .with_path("/media/tv/Breaking Bad/Season 01/Breaking Bad - S01E01.mkv")
        .with_runtime_minutes(58);

    let analysis = analyze(&episode, &[], Some(&season));
    assert!(analysis.reasons.is_empty());
    assert_eq!(analysis.score, 0.0);
    assert!(!analysis.needs_review);
    assert_eq!(analysis.suggested_type, None);
    assert!(!should_flag(&analysis));
}

#[test]
fn persist_threshold_sits_below_review_threshold() {
    assert!(PERSIST_THRESHOLD < REVIEW_THRESHOLD);

    // A single finding normalizes to its own confidence. The empty-season
    // check reports 0.6: stored as a flag, but not surfaced for review.
    let empty_season = Item::new(LibraryId::new(), "jf-s", "Season 3", ItemType::Season);
    let analysis = analyze(&empty_season, &[], None);
    assert_eq!(analysis.reasons.len(), 1);
    assert!((analysis.score - 0.6).abs() < 1e-9);
    assert!(!analysis.needs_review);
    assert!(should_flag(&analysis));
}

#[test]
fn short_movie_alone_is_not_flagged() {
    let movie = Item::new(LibraryId::new(), "jf-m", "Heat", ItemType::Movie)
        .with_path("/media/movies/Heat (1995)/Heat.mkv")
        .with_runtime_minutes(45);
    let analysis = analyze(&movie, &[], None);

    assert_eq!(analysis.reasons.len(), 1);
    assert_eq!(analysis.reasons[0].reason_type, ReasonType::DurationAnomaly);
    assert!((analysis.score - 0.5).abs() < 1e-9);
    assert!(!should_flag(&analysis));
}

#[test]
fn series_structure_findings_combine() {
    let library = LibraryId::new();
    let series = Item::new(library, "jf-series", "Lost", ItemType::Series);
    let children = vec![
        Item::new(library, "jf-s1", "Season 1", ItemType::Season)
            .with_parent(series.id)
            .with_index(1),
        Item::new(library, "jf-s4", "Season 4", ItemType::Season)
            .with_parent(series.id)
            .with_index(4),
    ];

    let analysis = analyze(&series, &children, None);
    assert_eq!(analysis.reasons.len(), 1);
    let reason = &analysis.reasons[0];
    assert_eq!(reason.reason_type, ReasonType::MissingSeasons);
    assert_eq!(reason.severity, Severity::Low);
    assert_eq!(reason.description, "Missing season(s): 2, 3");
    assert!(!analysis.needs_review);
}

#[test]
fn movie_in_season_folder_suggests_episode() {
    let movie = Item::new(LibraryId::new(), "jf-m", "Ozymandias", ItemType::Movie)
        .with_path("/media/movies/Breaking Bad/Season 05/Ozymandias.mkv")
        .with_runtime_minutes(47);
    let analysis = analyze(&movie, &[], None);

    let kinds: Vec<_> = analysis.reasons.iter().map(|r| r.reason_type).collect();
    assert_eq!(
        kinds,
        vec![ReasonType::PathStructure, ReasonType::DurationAnomaly]
    );
    assert!(analysis.needs_review);
    assert_eq!(analysis.suggested_type, Some(ItemType::Episode));
    assert!(analysis.score > 0.6 && analysis.score <= 1.0);
}

#[test]
fn detector_list_is_configurable() {
    let only_duration = DETECTORS
        .iter()
        .copied()
        .filter(|detector| detector.kind == ReasonType::DurationAnomaly)
        .collect();
    let analyzer = MisclassificationAnalyzer::with_detectors(only_duration);

    let item = Item::new(LibraryId::new(), "jf-1", "Show.S01E05.mkv", ItemType::Movie);
    let analysis = analyzer.analyze(&ItemContext {
        item: &item,
        children: &[],
        parent: None,
    });
    assert!(analysis.reasons.is_empty());
    assert_eq!(analysis.score, 0.0);
}
