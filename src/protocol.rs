//! Shared game, artwork, and storefront/catalog record types.

use std::fmt;

/// Storefront a game record was discovered on.
///
/// Persisted as its integer discriminant so the store's source index sorts
/// the same way across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(from = "u8", into = "u8")]
pub enum GameSource {
    #[default]
    Unknown,
    Steam,
    ItchIo,
}

impl GameSource {
    /// Human-readable name, also used as the store key prefix.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Steam => "Steam",
            Self::ItchIo => "itch.io",
            Self::Unknown => "UnknownGameSource",
        }
    }
}

impl fmt::Display for GameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<u8> for GameSource {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Steam,
            2 => Self::ItchIo,
            _ => Self::Unknown,
        }
    }
}

impl From<GameSource> for u8 {
    fn from(source: GameSource) -> Self {
        match source {
            GameSource::Unknown => 0,
            GameSource::Steam => 1,
            GameSource::ItchIo => 2,
        }
    }
}

/// One catalog image reference attached to a game.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ArtworkRef {
    pub id: i64,
    #[serde(rename = "image_id", default)]
    pub image_id: String,
}

/// Reconciled game as persisted in the local store.
///
/// `artworks[0]` is the primary cover when present.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub struct GameRecord {
    pub name: String,
    pub source: GameSource,
    #[serde(rename = "source-id")]
    pub source_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub developers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub artworks: Vec<ArtworkRef>,
}

impl GameRecord {
    /// Store key: source display name followed by the source id.
    pub fn store_key(&self) -> String {
        store_key(self.source, &self.source_id)
    }
}

pub fn store_key(source: GameSource, source_id: &str) -> String {
    format!("{}{}", source.display_name(), source_id)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let value: Option<Vec<T>> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Catalog artwork category and its endpoint name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkCategory {
    Cover,
    Artwork,
    Screenshot,
}

impl ArtworkCategory {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Cover => "covers",
            Self::Artwork => "artworks",
            Self::Screenshot => "screenshots",
        }
    }
}

/// Item in the user's storefront library. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct OwnedItem {
    #[serde(rename = "appid")]
    pub app_id: u64,
    #[serde(rename = "playtime_forever", default)]
    pub playtime_forever: u64,
}

/// Storefront details payload for one app.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize)]
pub struct StoreGameInfo {
    #[serde(rename = "type", default)]
    pub app_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "short_description", default)]
    pub short_description: String,
    #[serde(rename = "is_free", default)]
    pub is_free: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub developers: Vec<String>,
    #[serde(rename = "steam_appid", default)]
    pub app_id: u64,
}

/// Best catalog entry for a searched game name. Discarded after the
/// artwork fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize)]
pub struct CatalogMatch {
    #[serde(rename = "id")]
    pub catalog_id: i64,
    #[serde(rename = "artworks", default, deserialize_with = "null_as_empty")]
    pub artwork_catalog_ids: Vec<i64>,
    #[serde(rename = "screenshots", default, deserialize_with = "null_as_empty")]
    pub screenshot_catalog_ids: Vec<i64>,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::{ArtworkRef, GameRecord, GameSource};

    #[test]
    fn test_game_record_json_uses_integer_source_and_dashed_id() {
        let record = GameRecord {
            name: "Portal 2".to_string(),
            source: GameSource::Steam,
            source_id: "620".to_string(),
            description: "Puzzles".to_string(),
            developers: vec!["Valve".to_string()],
            artworks: vec![ArtworkRef {
                id: 7,
                image_id: "co1rs4".to_string(),
            }],
        };

        let value = serde_json::to_value(&record).expect("record should encode");
        assert_eq!(value["source"], 1);
        assert_eq!(value["source-id"], "620");
        assert_eq!(value["artworks"][0]["image_id"], "co1rs4");
    }

    #[test]
    fn test_game_record_decodes_null_lists_as_empty() {
        let json = r#"{"name":"Hades","source":1,"source-id":"1145360","description":"","developers":null,"artworks":null}"#;
        let record: GameRecord = serde_json::from_str(json).expect("record should decode");
        assert!(record.developers.is_empty());
        assert!(record.artworks.is_empty());
        assert_eq!(record.store_key(), "Steam1145360");
    }

    #[test]
    fn test_unknown_source_discriminant_decodes_as_unknown() {
        assert_eq!(GameSource::from(9), GameSource::Unknown);
        assert_eq!(GameSource::ItchIo.display_name(), "itch.io");
    }
}
