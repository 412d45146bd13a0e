//! Steam storefront adapter.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde_json::Value;

use crate::backends::{normalize_game_name, StorefrontBackend};
use crate::errors::FetchError;
use crate::http_transport::{HttpFailure, HttpTransport, UreqTransport};
use crate::protocol::{GameRecord, GameSource, OwnedItem, StoreGameInfo};
use crate::retry::{RetryPolicy, RunDeadline};

pub const OWNED_GAMES_URL: &str =
    "http://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";
pub const APP_DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";

/// Web API key and account the owned-games list is read for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteamCredentials {
    pub api_key: String,
    pub account_id: String,
}

#[derive(Debug, serde::Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    response: OwnedGamesList,
}

#[derive(Debug, Default, serde::Deserialize)]
struct OwnedGamesList {
    #[serde(default)]
    #[allow(dead_code)]
    game_count: u64,
    #[serde(default)]
    games: Option<Vec<OwnedItem>>,
}

/// One id-keyed entry of the app-details response.
#[derive(Debug, serde::Deserialize)]
struct AppDetailsEntry {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

/// Steam adapter backed by an [`HttpTransport`].
pub struct SteamClient<T: HttpTransport = UreqTransport> {
    transport: T,
    credentials: SteamCredentials,
    retry_policy: RetryPolicy,
    owned_games_url: String,
    app_details_url: String,
}

impl SteamClient<UreqTransport> {
    pub fn new(credentials: SteamCredentials, retry_policy: RetryPolicy) -> Self {
        Self::with_transport(UreqTransport::new(), credentials, retry_policy)
    }
}

impl<T: HttpTransport> SteamClient<T> {
    pub fn with_transport(
        transport: T,
        credentials: SteamCredentials,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            credentials,
            retry_policy,
            owned_games_url: OWNED_GAMES_URL.to_string(),
            app_details_url: APP_DETAILS_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn parse_owned_games(body: &str) -> Result<Vec<OwnedItem>, FetchError> {
        let parsed: OwnedGamesResponse = serde_json::from_str(body)
            .map_err(|err| FetchError::Network(format!("Invalid owned games response: {err}")))?;
        Ok(parsed.response.games.unwrap_or_default())
    }

    /// Interprets one app-details body. `Err` marks the response as
    /// transient (retry); `Ok(None)` means the item is delisted.
    fn parse_app_details(app_id: u64, body: &str) -> Result<Option<StoreGameInfo>, String> {
        let parsed: Option<HashMap<String, Option<AppDetailsEntry>>> =
            serde_json::from_str(body).map_err(|err| format!("Invalid JSON response: {err}"))?;
        let Some(mut entries) = parsed else {
            return Err("app details response was null".to_string());
        };
        let Some(Some(entry)) = entries.remove(&app_id.to_string()) else {
            return Err(format!("app details response has no entry for {app_id}"));
        };
        if !entry.success {
            return Ok(None);
        }
        match entry.data {
            // A payload that does not decode will not decode on a retry either.
            Some(data @ Value::Object(_)) => match serde_json::from_value(data) {
                Ok(info) => Ok(Some(info)),
                Err(err) => {
                    warn!("Steam app {app_id} has an unreadable details payload, skipping: {err}");
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn request_app_details(&self, app_id: u64) -> Result<Option<StoreGameInfo>, String> {
        let app_id_text = app_id.to_string();
        let body = self
            .transport
            .get(&self.app_details_url, &[("appids", app_id_text.as_str())])
            .map_err(|failure| format!("Steam app details request failed: {failure}"))?;
        Self::parse_app_details(app_id, &body)
    }
}

impl<T: HttpTransport> StorefrontBackend for SteamClient<T> {
    fn source(&self) -> GameSource {
        GameSource::Steam
    }

    fn fetch_owned_items(&self) -> Result<Vec<OwnedItem>, FetchError> {
        info!("Fetching owned Steam games");
        let body = self
            .transport
            .get(
                &self.owned_games_url,
                &[
                    ("key", self.credentials.api_key.as_str()),
                    ("steamid", self.credentials.account_id.as_str()),
                    ("format", "json"),
                    ("include_played_free_games", "false"),
                ],
            )
            .map_err(|failure| match failure {
                HttpFailure::Status(401 | 403, _) => {
                    FetchError::Auth(format!("Steam rejected the API key: {failure}"))
                }
                other => FetchError::Network(format!("Steam owned games request failed: {other}")),
            })?;
        let games = Self::parse_owned_games(&body)?;
        info!("Steam reports {} owned games", games.len());
        Ok(games)
    }

    fn fetch_store_details(
        &self,
        app_id: u64,
        deadline: &RunDeadline,
    ) -> Result<Option<StoreGameInfo>, FetchError> {
        let label = format!("Steam app details {app_id}");
        let details = self
            .retry_policy
            .run(&label, deadline, || self.request_app_details(app_id))?;
        match &details {
            Some(info) => debug!("{label}: {}", info.name),
            None => debug!("{label}: not listed in store"),
        }
        Ok(details)
    }
}

/// Owned items whose stringified id is not already a Steam record in `known`.
/// Storefront order is preserved.
pub fn find_unprocessed_items(known: &[GameRecord], owned: &[OwnedItem]) -> Vec<OwnedItem> {
    owned
        .iter()
        .filter(|item| {
            let app_id = item.app_id.to_string();
            !known
                .iter()
                .any(|game| game.source == GameSource::Steam && game.source_id == app_id)
        })
        .copied()
        .collect()
}

/// Builds an artwork-less record from storefront details.
///
/// The record is keyed on the owned `app_id`. Steam may answer with a
/// successor app's `steam_appid`, which would never match the owned list.
pub fn to_game_record(app_id: u64, info: StoreGameInfo) -> GameRecord {
    if info.app_id != 0 && info.app_id != app_id {
        debug!(
            "Steam app {app_id} resolved to app {}; keeping the owned id",
            info.app_id
        );
    }
    GameRecord {
        name: normalize_game_name(&info.name),
        source: GameSource::Steam,
        source_id: app_id.to_string(),
        description: info.short_description,
        developers: info.developers,
        artworks: Vec::new(),
    }
}
