//! Mapping from TMDB discover payloads to carousel/favorite items.

use crate::{config::CatalogConfig, favorites::favorite_item::FavoriteItem};

const MISSING_DESCRIPTION: &str = "No description available";

/// One entry of a TMDB `discover/movie` result page. Unused fields are skipped.
///
/// Text fields may be missing or `null` in real responses.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Movie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

/// A TMDB discover response page.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct DiscoverPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Rounds a vote average to one decimal place.
pub fn round_rating(vote_average: f64) -> f64 {
    (vote_average * 10.0).round() / 10.0
}

/// Extracts the year from an ISO `YYYY-MM-DD` date.
pub fn release_year(release_date: &str) -> Option<String> {
    let year = release_date.trim().split('-').next()?;
    if year.len() == 4 && year.chars().all(|ch| ch.is_ascii_digit()) {
        Some(year.to_string())
    } else {
        None
    }
}

fn poster_url(poster_path: Option<&str>, config: &CatalogConfig) -> String {
    match poster_path.map(str::trim).filter(|path| !path.is_empty()) {
        Some(path) => format!("{}{}", config.poster_base_url.trim_end_matches('/'), path),
        None => config.placeholder_image.clone(),
    }
}

pub fn catalog_item_from_movie(movie: &Movie, config: &CatalogConfig) -> FavoriteItem {
    let description = match movie.overview.as_deref() {
        Some(overview) if !overview.trim().is_empty() => overview.to_string(),
        _ => MISSING_DESCRIPTION.to_string(),
    };
    FavoriteItem {
        id: movie.id.to_string(),
        title: movie.title.clone().unwrap_or_default(),
        description,
        image: poster_url(movie.poster_path.as_deref(), config),
        year: movie.release_date.as_deref().and_then(release_year),
        rating: Some(round_rating(movie.vote_average)),
    }
}

pub fn map_discover_page(page: &DiscoverPage, config: &CatalogConfig) -> Vec<FavoriteItem> {
    page.results
        .iter()
        .map(|movie| catalog_item_from_movie(movie, config))
        .collect()
}

/// Parses a discover page from JSON text.
pub fn parse_discover_page(json: &str) -> Result<DiscoverPage, String> {
    serde_json::from_str(json).map_err(|err| format!("failed to parse discover page: {}", err))
}
