use std::path::Path;

use log::{info, warn};
use toml_edit::{value, ArrayOfTables, DocumentMut, Item, Table};

use crate::config::{sanitize_config, Config, FavoritesBackend};

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let replacing_scalar_with_aot = item.is_array_of_tables()
        && table
            .get(key)
            .is_some_and(|current| !current.is_array_of_tables());
    if replacing_scalar_with_aot {
        table.remove(key);
        table[key] = item;
        return;
    }

    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

fn set_table_scalar_if_changed<T, F>(
    table: &mut Table,
    key: &str,
    previous_value: T,
    next_value: T,
    to_item: F,
) where
    T: PartialEq + Copy,
    F: FnOnce(T) -> Item,
{
    if table.contains_key(key) && previous_value == next_value {
        return;
    }
    set_table_value_preserving_decor(table, key, to_item(next_value));
}

fn set_table_string_if_changed(table: &mut Table, key: &str, previous_value: &str, next_value: &str) {
    if table.contains_key(key) && previous_value == next_value {
        return;
    }
    set_table_value_preserving_decor(table, key, value(next_value));
}

/// Returns the section table, replacing any non-table value under `key`.
fn section_table<'a>(document: &'a mut DocumentMut, key: &str) -> &'a mut Table {
    let root = document.as_table_mut();
    let should_replace = !matches!(root.get(key), Some(item) if item.is_table());
    if should_replace {
        root.insert(key, Item::Table(Table::new()));
    }
    match root.get_mut(key).and_then(Item::as_table_mut) {
        Some(table) => table,
        None => unreachable!("section table inserted above"),
    }
}

fn backend_name(backend: FavoritesBackend) -> &'static str {
    match backend {
        FavoritesBackend::JsonFile => "json_file",
        FavoritesBackend::Sqlite => "sqlite",
        FavoritesBackend::Memory => "memory",
    }
}

fn write_config_to_document(document: &mut DocumentMut, previous: &Config, config: &Config) {
    {
        let carousel = section_table(document, "carousel");
        set_table_scalar_if_changed(
            carousel,
            "fallback_items_per_view",
            previous.carousel.fallback_items_per_view as i64,
            config.carousel.fallback_items_per_view as i64,
            value,
        );
        if !carousel.contains_key("breakpoints")
            || previous.carousel.breakpoints != config.carousel.breakpoints
        {
            let mut breakpoints = ArrayOfTables::new();
            for tier in &config.carousel.breakpoints {
                let mut row = Table::new();
                row.insert("max_width_px", value(i64::from(tier.max_width_px)));
                row.insert("items_per_view", value(tier.items_per_view as i64));
                breakpoints.push(row);
            }
            set_table_value_preserving_decor(
                carousel,
                "breakpoints",
                Item::ArrayOfTables(breakpoints),
            );
        }
    }

    {
        let favorites = section_table(document, "favorites");
        set_table_string_if_changed(
            favorites,
            "storage_key",
            &previous.favorites.storage_key,
            &config.favorites.storage_key,
        );
        set_table_string_if_changed(
            favorites,
            "backend",
            backend_name(previous.favorites.backend),
            backend_name(config.favorites.backend),
        );
    }

    {
        let catalog = section_table(document, "catalog");
        set_table_string_if_changed(
            catalog,
            "poster_base_url",
            &previous.catalog.poster_base_url,
            &config.catalog.poster_base_url,
        );
        set_table_string_if_changed(
            catalog,
            "placeholder_image",
            &previous.catalog.placeholder_image,
            &config.catalog.placeholder_image,
        );
    }

    {
        let ui = section_table(document, "ui");
        set_table_scalar_if_changed(
            ui,
            "window_width",
            i64::from(previous.ui.window_width),
            i64::from(config.ui.window_width),
            value,
        );
    }
}

pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let previous = toml::from_str::<Config>(existing_text)
        .map_err(|err| format!("failed to parse existing config as Config: {}", err))?;
    let mut document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config as TOML document: {}", err))?;
    write_config_to_document(&mut document, &previous, config);
    Ok(document.to_string())
}

pub fn persist_config_file(config: &Config, path: &Path) {
    let existing_text = std::fs::read_to_string(path).ok();
    let config_text = if let Some(existing_text) = existing_text {
        match serialize_config_with_preserved_comments(&existing_text, config) {
            Ok(updated_text) => Some(updated_text),
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({}). Falling back to plain serialization.",
                    path.display(),
                    err
                );
                toml::to_string(config).ok()
            }
        }
    } else {
        toml::to_string(config).ok()
    };

    let Some(config_text) = config_text else {
        log::error!("Failed to serialize config for {}", path.display());
        return;
    };

    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

/// Reads `path`, writing defaults first when the file does not exist.
///
/// Unreadable or unparsable files yield sanitized defaults and are left untouched.
pub fn load_config_file(path: &Path) -> Config {
    if !path.exists() {
        let default_config = sanitize_config(Config::default());
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        persist_config_file(&default_config, path);
        return default_config;
    }

    let config_content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Failed to read config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            return sanitize_config(Config::default());
        }
    };

    match toml::from_str::<Config>(&config_content) {
        Ok(config) => sanitize_config(config),
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            sanitize_config(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;
    use crate::carousel::breakpoints::Breakpoint;

    fn unique_temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock should be after UNIX_EPOCH")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "marquee_config_{}_{}_{}",
            std::process::id(),
            nanos,
            file_name
        ))
    }

    #[test]
    fn test_serialize_preserves_comments_and_updates_window_width() {
        let existing = r#"# marquee settings
[ui]
# remembered between runs
window_width = 1024 # pixels

[favorites]
storage_key = "my-movies-favorites" # shared with the web build
"#;
        let mut config: Config = toml::from_str(existing).expect("config should parse");
        config.ui.window_width = 1440;

        let updated =
            serialize_config_with_preserved_comments(existing, &config).expect("should serialize");

        assert!(updated.contains("# marquee settings"));
        assert!(updated.contains("# remembered between runs"));
        assert!(updated.contains("window_width = 1440 # pixels"));
        assert!(updated.contains("# shared with the web build"));
        let reparsed: Config = toml::from_str(&updated).expect("updated config should parse");
        assert_eq!(reparsed.ui.window_width, 1440);
    }

    #[test]
    fn test_serialize_writes_changed_breakpoints_and_backend() {
        let existing = "[favorites]\nbackend = \"json_file\"\n";
        let mut config: Config = toml::from_str(existing).expect("config should parse");
        config.favorites.backend = FavoritesBackend::Sqlite;
        config.carousel.breakpoints = vec![Breakpoint::new(600, 1), Breakpoint::new(1200, 3)];

        let updated =
            serialize_config_with_preserved_comments(existing, &config).expect("should serialize");
        let reparsed: Config = toml::from_str(&updated).expect("updated config should parse");

        assert_eq!(reparsed.favorites.backend, FavoritesBackend::Sqlite);
        assert_eq!(reparsed.carousel.breakpoints, config.carousel.breakpoints);
    }

    #[test]
    fn test_serialize_rejects_unparsable_existing_text() {
        let result = serialize_config_with_preserved_comments("[ui\n", &Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_file_creates_missing_file_with_defaults() {
        let path = unique_temp_path("missing.toml");

        let config = load_config_file(&path);

        assert_eq!(config, Config::default());
        let written = std::fs::read_to_string(&path).expect("default config should be written");
        let reparsed: Config = toml::from_str(&written).expect("written config should parse");
        assert_eq!(reparsed, Config::default());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_config_file_falls_back_to_defaults_on_parse_error() {
        let path = unique_temp_path("broken.toml");
        std::fs::write(&path, "[ui]\nwindow_width = \"wide\"\n").expect("write fixture");

        let config = load_config_file(&path);

        assert_eq!(config, Config::default());
        let untouched = std::fs::read_to_string(&path).expect("fixture should remain");
        assert!(untouched.contains("\"wide\""));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_persist_then_load_roundtrips_window_width() {
        let path = unique_temp_path("roundtrip.toml");
        let mut config = load_config_file(&path);
        config.ui.window_width = 800;

        persist_config_file(&config, &path);

        assert_eq!(load_config_file(&path).ui.window_width, 800);
        let _ = std::fs::remove_file(path);
    }
}
