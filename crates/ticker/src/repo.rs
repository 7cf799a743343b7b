//! Trending repository records and the display helpers used by card rendering

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One fixture record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingRepo {
    /// Display identity, e.g. `owner/name`
    pub name: String,

    /// External link target
    pub url: String,

    /// Stars gained today
    pub stars_today: u64,

    /// Primary language, used for the color tag
    pub language: String,

    /// Sort key, higher first
    pub trending_score: f64,
}

/// Neutral gray used for languages missing from the palette
pub const FALLBACK_LANGUAGE_COLOR: &str = "#8b949e";

const LANGUAGE_COLORS: &[(&str, &str)] = &[
    ("c", "#555555"),
    ("c#", "#178600"),
    ("c++", "#f34b7d"),
    ("dart", "#00b4ab"),
    ("go", "#00add8"),
    ("html", "#e34c26"),
    ("java", "#b07219"),
    ("javascript", "#f1e05a"),
    ("kotlin", "#a97bff"),
    ("php", "#4f5d95"),
    ("python", "#3572a5"),
    ("ruby", "#701516"),
    ("rust", "#dea584"),
    ("shell", "#89e051"),
    ("swift", "#f05138"),
    ("typescript", "#3178c6"),
    ("zig", "#ec915c"),
];

/// Sort repos by `trending_score`, highest first.
///
/// Stable: repos with equal scores keep their fixture order.
pub fn sort_by_trending(repos: &mut [TrendingRepo]) {
    repos.sort_by(|a, b| {
        b.trending_score
            .partial_cmp(&a.trending_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Abbreviate a star count: `1234` -> `1.2k`, `999` -> `999`
pub fn format_stars(stars: u64) -> String {
    if stars >= 1000 {
        format!("{:.1}k", stars as f64 / 1000.0)
    } else {
        stars.to_string()
    }
}

/// Tag color for a language (case-insensitive), gray when unknown
pub fn language_color(language: &str) -> &'static str {
    let key = language.trim().to_ascii_lowercase();
    LANGUAGE_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_LANGUAGE_COLOR)
}
