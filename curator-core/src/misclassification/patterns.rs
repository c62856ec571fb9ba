use once_cell::sync::Lazy;
use regex::Regex;

static EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bs\d{1,2}\s?e\d{1,3}",
        r"(?i)\b\d{1,2}x\d{2,3}\b",
        r"(?i)\bepisode\s*\d+",
        r"(?i)\bep\.?\s*\d{1,3}\b",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("episode pattern should compile"))
    .collect()
});

static SEASON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bseason\s*\d+\b",
        r"(?i)(?:^|[\s._-])s\d{1,2}(?:$|[\s._-])",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("season pattern should compile"))
    .collect()
});

static MOVIE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\((?:19|20)\d{2}\)",
        r"(?i)\b(?:bluray|blu-ray|bdrip|brrip|dvdrip|remux)\b",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("movie pattern should compile"))
    .collect()
});

/// Directory names that only appear inside TV libraries.
static TV_DIRECTORY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bseason\b|(?:^|[^a-z0-9])s0[1-5](?:[^0-9]|$)")
        .expect("tv directory marker should compile")
});

pub fn looks_like_episode(name: &str) -> bool {
    EPISODE_PATTERNS.iter().any(|re| re.is_match(name))
}

pub fn looks_like_season(name: &str) -> bool {
    SEASON_PATTERNS.iter().any(|re| re.is_match(name))
}

pub fn looks_like_movie(name: &str) -> bool {
    MOVIE_PATTERNS.iter().any(|re| re.is_match(name))
}

pub fn is_tv_directory(segment: &str) -> bool {
    TV_DIRECTORY_MARKER.is_match(segment)
}

/// Non-empty path components, accepting either separator.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}
