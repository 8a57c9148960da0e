//! Persistent application configuration model and defaults.

use crate::{
    carousel::breakpoints::{
        default_breakpoints, Breakpoint, BreakpointTable, DEFAULT_FALLBACK_ITEMS_PER_VIEW,
    },
    favorites::favorites_store::DEFAULT_FAVORITES_STORAGE_KEY,
};

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Carousel window sizing.
    pub carousel: CarouselConfig,
    #[serde(default)]
    /// Favorites persistence.
    pub favorites: FavoritesConfig,
    #[serde(default)]
    /// Catalog item mapping.
    pub catalog: CatalogConfig,
    #[serde(default)]
    /// UI state remembered between sessions.
    pub ui: UiConfig,
}

/// Breakpoint table used by every carousel.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CarouselConfig {
    #[serde(default = "default_breakpoints")]
    pub breakpoints: Vec<Breakpoint>,
    #[serde(default = "default_fallback_items_per_view")]
    pub fallback_items_per_view: usize,
}

impl CarouselConfig {
    /// Builds the validated runtime table.
    pub fn breakpoint_table(&self) -> BreakpointTable {
        BreakpointTable::sanitized(&self.breakpoints, self.fallback_items_per_view)
    }
}

/// Storage backend selected for favorites.
#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FavoritesBackend {
    /// One JSON file per key in the data directory.
    #[default]
    JsonFile,
    /// Key/value table in `marquee.db`.
    Sqlite,
    /// Nothing survives the process; useful for demos.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FavoritesConfig {
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub backend: FavoritesBackend,
}

/// Where catalog images live.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_poster_base_url")]
    pub poster_base_url: String,
    /// Used when a movie has no poster.
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct UiConfig {
    #[serde(default = "default_window_width")]
    pub window_width: u32,
}

fn default_fallback_items_per_view() -> usize {
    DEFAULT_FALLBACK_ITEMS_PER_VIEW
}

fn default_storage_key() -> String {
    DEFAULT_FAVORITES_STORAGE_KEY.to_string()
}

fn default_poster_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_placeholder_image() -> String {
    "/placeholder-image.jpg".to_string()
}

fn default_window_width() -> u32 {
    1024
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            breakpoints: default_breakpoints(),
            fallback_items_per_view: default_fallback_items_per_view(),
        }
    }
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            backend: FavoritesBackend::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            poster_base_url: default_poster_base_url(),
            placeholder_image: default_placeholder_image(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
        }
    }
}

/// Repairs values that would otherwise break runtime invariants.
///
/// Breakpoint repair happens in [`CarouselConfig::breakpoint_table`].
pub fn sanitize_config(config: Config) -> Config {
    let mut config = config;
    if config.favorites.storage_key.trim().is_empty() {
        config.favorites.storage_key = default_storage_key();
    } else {
        config.favorites.storage_key = config.favorites.storage_key.trim().to_string();
    }
    config
}
