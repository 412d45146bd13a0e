//! IGDB media-catalog adapter.
//!
//! IGDB search returns every title close to the query string, including
//! sequels and re-releases, so the adapter ranks the results before fetching
//! artwork for the single best entry.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::backends::{normalize_game_name, CatalogOutcome, MediaCatalogBackend};
use crate::errors::FetchError;
use crate::http_transport::{HttpFailure, HttpTransport, UreqTransport};
use crate::protocol::{ArtworkCategory, ArtworkRef, CatalogMatch};

pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const API_BASE_URL: &str = "https://api.igdb.com/v4";
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgdbCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// IGDB adapter backed by an [`HttpTransport`].
pub struct IgdbClient<T: HttpTransport = UreqTransport> {
    transport: T,
    credentials: IgdbCredentials,
    token_url: String,
    api_base_url: String,
    cached_token: Option<CachedToken>,
}

impl IgdbClient<UreqTransport> {
    pub fn new(credentials: IgdbCredentials) -> Self {
        Self::with_transport(UreqTransport::new(), credentials)
    }
}

impl<T: HttpTransport> IgdbClient<T> {
    pub fn with_transport(transport: T, credentials: IgdbCredentials) -> Self {
        Self {
            transport,
            credentials,
            token_url: TOKEN_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            cached_token: None,
        }
    }

    /// Points the adapter at different token/API hosts, e.g. a caching proxy.
    pub fn with_endpoints(mut self, token_url: &str, api_base_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a bearer token, requesting a new one when none is cached or
    /// the cached one is about to expire.
    fn authenticate(&mut self) -> Result<String, FetchError> {
        if let Some(token) = self.cached_token.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting IGDB access token");
        let body = self
            .transport
            .post_text(
                &self.token_url,
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ],
                &[],
                "",
            )
            .map_err(|failure| FetchError::Auth(format!("Token request failed: {failure}")))?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| FetchError::Auth(format!("Invalid token response: {err}")))?;
        if token.access_token.is_empty() {
            return Err(FetchError::Auth("Token response had no access token".to_string()));
        }

        let expires_at = token.expires_in.and_then(|seconds| {
            Instant::now().checked_add(Duration::from_secs(seconds).saturating_sub(TOKEN_EXPIRY_MARGIN))
        });
        self.cached_token = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }

    fn api_post<R>(&mut self, endpoint: &str, token: &str, query: &str) -> Result<R, FetchError>
    where
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base_url, endpoint);
        let authorization = format!("Bearer {token}");
        let result = self.transport.post_text(
            &url,
            &[],
            &[
                ("Client-ID", self.credentials.client_id.as_str()),
                ("Authorization", authorization.as_str()),
            ],
            query,
        );
        let body = match result {
            Ok(body) => body,
            Err(failure @ HttpFailure::Status(401 | 403, _)) => {
                self.cached_token = None;
                return Err(FetchError::Auth(format!("IGDB {endpoint} rejected token: {failure}")));
            }
            Err(failure) => {
                return Err(FetchError::CatalogUnavailable(format!(
                    "IGDB {endpoint} request failed: {failure}"
                )))
            }
        };
        serde_json::from_str(&body).map_err(|err| {
            FetchError::CatalogUnavailable(format!("Invalid IGDB {endpoint} response: {err}"))
        })
    }

    fn search_game(&mut self, token: &str, name: &str) -> Result<Option<CatalogMatch>, FetchError> {
        let query = search_query(name);
        let results: Vec<CatalogMatch> = self.api_post("games", token, &query)?;
        debug!("IGDB search for '{name}' returned {} results", results.len());
        Ok(select_closest_match(name, results))
    }

    fn fetch_artworks_by_game(
        &mut self,
        token: &str,
        category: ArtworkCategory,
        catalog_id: i64,
    ) -> Result<Vec<ArtworkRef>, FetchError> {
        let query = format!("fields image_id; where game = {catalog_id} & animated = false;");
        self.api_post(category.endpoint(), token, &query)
    }

    fn fetch_artworks_by_ids(
        &mut self,
        token: &str,
        category: ArtworkCategory,
        artwork_ids: &[i64],
    ) -> Result<Vec<ArtworkRef>, FetchError> {
        let mut artworks = Vec::new();
        for artwork_id in artwork_ids {
            let query = format!("fields image_id; where id = {artwork_id};");
            let found: Vec<ArtworkRef> = self.api_post(category.endpoint(), token, &query)?;
            artworks.extend(found);
        }
        Ok(artworks)
    }
}

impl<T: HttpTransport> MediaCatalogBackend for IgdbClient<T> {
    fn fetch_game_artworks(&mut self, game_name: &str) -> Result<CatalogOutcome, FetchError> {
        let name = normalize_game_name(game_name);
        let token = self.authenticate()?;

        let Some(game) = self.search_game(&token, &name)? else {
            info!("IGDB has no match for '{name}'");
            return Ok(CatalogOutcome::NoMatch);
        };

        info!("Fetching IGDB artworks for '{}' (IGDB id {})", game.name, game.catalog_id);
        let steps: [(&str, ArtworkCategory, Option<&[i64]>); 5] = [
            ("covers", ArtworkCategory::Cover, None),
            ("game artworks", ArtworkCategory::Artwork, None),
            (
                "artworks by id",
                ArtworkCategory::Artwork,
                Some(game.artwork_catalog_ids.as_slice()),
            ),
            ("screenshots", ArtworkCategory::Screenshot, None),
            (
                "screenshots by id",
                ArtworkCategory::Screenshot,
                Some(game.screenshot_catalog_ids.as_slice()),
            ),
        ];

        let mut artworks = Vec::new();
        for (step_label, category, ids) in steps {
            let fetched = match ids {
                None => self.fetch_artworks_by_game(&token, category, game.catalog_id),
                Some(ids) => self.fetch_artworks_by_ids(&token, category, ids),
            };
            match fetched {
                Ok(found) => artworks.extend(found),
                Err(err) => {
                    warn!("Fetching IGDB {step_label} for '{}' failed: {err}", game.name);
                    return Err(err);
                }
            }
        }

        info!("Fetched {} IGDB artworks for '{}'", artworks.len(), game.name);
        Ok(CatalogOutcome::Matched {
            catalog_name: game.name,
            artworks,
        })
    }
}

/// Search DSL for a game name.
pub fn search_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("search \"{escaped}\"; fields name,artworks,screenshots;")
}

/// Picks the catalog entry closest to `query_name`.
///
/// A single result is used as-is. Otherwise names are compared upper-cased:
/// results containing every query character in order are ranked by edit
/// distance, and the first result wins when none qualify or on ties.
pub fn select_closest_match(query_name: &str, mut results: Vec<CatalogMatch>) -> Option<CatalogMatch> {
    match results.len() {
        0 => None,
        1 => results.pop(),
        _ => {
            let names: Vec<String> = results.iter().map(|game| game.name.to_uppercase()).collect();
            let index = rank_names(&query_name.to_uppercase(), &names)
                .first()
                .copied()
                .unwrap_or(0);
            Some(results.swap_remove(index))
        }
    }
}

/// Indices of `candidates` that fuzzily contain `query`, closest first.
fn rank_names(query: &str, candidates: &[String]) -> Vec<usize> {
    let mut ranked: Vec<(usize, usize)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, candidate)| contains_in_order(query, candidate))
        .map(|(index, candidate)| (index, levenshtein_distance(query, candidate)))
        .collect();
    ranked.sort_by_key(|(_, distance)| *distance);
    ranked.into_iter().map(|(index, _)| index).collect()
}

fn contains_in_order(query: &str, candidate: &str) -> bool {
    let mut candidate_chars = candidate.chars();
    query
        .chars()
        .all(|wanted| candidate_chars.any(|ch| ch == wanted))
}

fn levenshtein_distance(left: &str, right: &str) -> usize {
    let right_chars: Vec<char> = right.chars().collect();
    let mut previous: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current = vec![0; right_chars.len() + 1];
    for (i, left_char) in left.chars().enumerate() {
        current[0] = i + 1;
        for (j, right_char) in right_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(left_char != *right_char);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[right_chars.len()]
}
