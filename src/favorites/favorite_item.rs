/// A user-marked item. Identity is the `id`; every other field is display data.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FavoriteItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "desc")]
    pub description: String,
    /// Poster URL or placeholder path.
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl FavoriteItem {
    /// Builds an item with only identity and title set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            image: String::new(),
            year: None,
            rating: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FavoriteItem;

    #[test]
    fn test_serialized_item_uses_stored_field_names() {
        let item = FavoriteItem {
            year: Some("2021".to_string()),
            rating: Some(8.5),
            description: "Heist".to_string(),
            image: "poster.jpg".to_string(),
            ..FavoriteItem::new("42", "Movie 42")
        };

        let json = serde_json::to_value(&item).expect("item should serialize");

        assert_eq!(json["id"], "42");
        assert_eq!(json["title"], "Movie 42");
        assert_eq!(json["desc"], "Heist");
        assert_eq!(json["image"], "poster.jpg");
        assert_eq!(json["year"], "2021");
        assert_eq!(json["rating"], 8.5);
    }

    #[test]
    fn test_optional_fields_are_omitted_and_defaulted() {
        let json = serde_json::to_string(&FavoriteItem::new("1", "Movie 1"))
            .expect("item should serialize");
        assert!(!json.contains("year"));
        assert!(!json.contains("rating"));

        let parsed: FavoriteItem =
            serde_json::from_str(r#"{"id":"7","extra":true}"#).expect("item should parse");
        assert_eq!(parsed, FavoriteItem::new("7", ""));
    }
}
