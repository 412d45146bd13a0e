//! Storefront and media-catalog adapter abstractions and concrete implementations.

pub mod igdb;
pub mod steam;

use crate::errors::FetchError;
use crate::protocol::{ArtworkRef, GameSource, OwnedItem, StoreGameInfo};
use crate::retry::RunDeadline;

/// Glyphs that storefronts decorate titles with but catalogs omit.
const TRADEMARK_GLYPHS: [char; 3] = ['\u{2122}', '\u{00ae}', '\u{00a9}'];

/// Strips trademark glyphs and collapses the whitespace they leave behind.
pub fn normalize_game_name(name: &str) -> String {
    name.chars()
        .filter(|ch| !TRADEMARK_GLYPHS.contains(ch))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of enriching one game against the media catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOutcome {
    /// A catalog entry was selected; `artworks` may still be empty.
    Matched {
        catalog_name: String,
        artworks: Vec<ArtworkRef>,
    },
    /// The catalog search returned nothing.
    NoMatch,
}

impl CatalogOutcome {
    pub fn into_artworks(self) -> Vec<ArtworkRef> {
        match self {
            Self::Matched { artworks, .. } => artworks,
            Self::NoMatch => Vec::new(),
        }
    }
}

/// Interface implemented by storefront adapters.
pub trait StorefrontBackend {
    fn source(&self) -> GameSource;

    /// Lists the user's owned items. Not retried.
    fn fetch_owned_items(&self) -> Result<Vec<OwnedItem>, FetchError>;

    /// Fetches storefront details for one item. `Ok(None)` means the
    /// storefront answered but no longer lists the item.
    fn fetch_store_details(
        &self,
        app_id: u64,
        deadline: &RunDeadline,
    ) -> Result<Option<StoreGameInfo>, FetchError>;
}

/// Interface implemented by media-catalog adapters.
pub trait MediaCatalogBackend {
    /// Finds the catalog entry for `game_name` and collects its artwork in
    /// presentation order. Any failed category query fails the whole call.
    fn fetch_game_artworks(&mut self, game_name: &str) -> Result<CatalogOutcome, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::normalize_game_name;

    #[test]
    fn test_normalize_game_name_strips_trademark_glyphs() {
        assert_eq!(normalize_game_name("Portal\u{2122} 2"), "Portal 2");
        assert_eq!(normalize_game_name("Portal™ 2"), "Portal 2");
        assert_eq!(
            normalize_game_name("Tom Clancy's Rainbow Six® Siege"),
            "Tom Clancy's Rainbow Six Siege"
        );
    }

    #[test]
    fn test_normalize_game_name_collapses_leftover_spacing() {
        assert_eq!(normalize_game_name("  DOOM ™  Eternal "), "DOOM Eternal");
        assert_eq!(normalize_game_name("Half-Life 2"), "Half-Life 2");
    }
}
