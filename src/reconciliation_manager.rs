//! Storefront → catalog → store reconciliation run.
//!
//! One run loads the known games, asks the storefront for the owned list,
//! fetches details for everything not yet stored, enriches each new game
//! with catalog artwork, and writes every enriched game as soon as it is
//! complete. Per-game failures are logged and skipped; only store failures
//! and the owned-list fetch abort the run.

use log::{error, info, warn};

use crate::backends::steam::{find_unprocessed_items, to_game_record};
use crate::backends::{CatalogOutcome, MediaCatalogBackend, StorefrontBackend};
use crate::db_manager::DbManager;
use crate::errors::{FetchError, ReconciliationError};
use crate::protocol::{GameRecord, GameSource, OwnedItem};
use crate::retry::RunDeadline;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub owned: usize,
    pub unprocessed: usize,
    pub not_found: usize,
    pub detail_failures: usize,
    pub enriched: usize,
    pub unmatched: usize,
    pub enrichment_failures: usize,
    pub persisted: usize,
    pub stopped_early: bool,
}

pub struct ReconciliationManager<'a, S, C> {
    db_manager: &'a DbManager,
    storefront: S,
    catalog: C,
    deadline: RunDeadline,
}

impl<'a, S, C> ReconciliationManager<'a, S, C>
where
    S: StorefrontBackend,
    C: MediaCatalogBackend,
{
    pub fn new(db_manager: &'a DbManager, storefront: S, catalog: C, deadline: RunDeadline) -> Self {
        Self {
            db_manager,
            storefront,
            catalog,
            deadline,
        }
    }

    /// Runs one full reconciliation pass.
    pub fn run(&mut self) -> Result<ReconciliationSummary, ReconciliationError> {
        let mut summary = ReconciliationSummary::default();

        let source = self.storefront.source();
        let known_games = self.db_manager.list_by_source(source)?;
        info!("Loaded {} known {} games from store", known_games.len(), source);

        let owned_items = self.storefront.fetch_owned_items().map_err(|err| {
            error!("Fetching owned {} games failed: {}", source, err);
            ReconciliationError::OwnedItems(err)
        })?;
        summary.owned = owned_items.len();

        let unprocessed = match source {
            GameSource::Steam => find_unprocessed_items(&known_games, &owned_items),
            other => {
                warn!("No unprocessed-item selection for {other}; skipping");
                Vec::new()
            }
        };
        summary.unprocessed = unprocessed.len();
        info!(
            "{} of {} owned games are not in the store yet",
            unprocessed.len(),
            owned_items.len()
        );

        let new_games = self.collect_new_games(&unprocessed, &mut summary);
        self.enrich_and_persist(new_games, &mut summary)?;

        info!(
            "Reconciliation finished: owned={} unprocessed={} not_found={} detail_failures={} enriched={} unmatched={} enrichment_failures={} persisted={}",
            summary.owned,
            summary.unprocessed,
            summary.not_found,
            summary.detail_failures,
            summary.enriched,
            summary.unmatched,
            summary.enrichment_failures,
            summary.persisted
        );
        Ok(summary)
    }

    fn collect_new_games(
        &self,
        unprocessed: &[OwnedItem],
        summary: &mut ReconciliationSummary,
    ) -> Vec<GameRecord> {
        let mut new_games = Vec::new();
        for item in unprocessed {
            if self.deadline.is_expired() {
                warn!("Run deadline reached while fetching store details; stopping");
                summary.stopped_early = true;
                break;
            }
            match self.storefront.fetch_store_details(item.app_id, &self.deadline) {
                Ok(Some(details)) => {
                    let record = to_game_record(item.app_id, details);
                    info!("New game: {} ({})", record.name, record.source_id);
                    new_games.push(record);
                }
                Ok(None) => {
                    info!("Game {} is no longer listed in the store; skipping", item.app_id);
                    summary.not_found += 1;
                }
                Err(FetchError::DeadlineExceeded) => {
                    warn!(
                        "Run deadline reached while fetching details for {}; stopping",
                        item.app_id
                    );
                    summary.stopped_early = true;
                    break;
                }
                Err(err) => {
                    error!("Fetching store details for {} failed: {}", item.app_id, err);
                    summary.detail_failures += 1;
                }
            }
        }
        new_games
    }

    fn enrich_and_persist(
        &mut self,
        new_games: Vec<GameRecord>,
        summary: &mut ReconciliationSummary,
    ) -> Result<(), ReconciliationError> {
        let total = new_games.len();
        for (index, mut game) in new_games.into_iter().enumerate() {
            if self.deadline.is_expired() {
                warn!(
                    "Run deadline reached; {} games left unenriched until the next run",
                    total - index
                );
                summary.stopped_early = true;
                break;
            }

            match self.catalog.fetch_game_artworks(&game.name) {
                Ok(outcome) => {
                    if matches!(outcome, CatalogOutcome::NoMatch) {
                        summary.unmatched += 1;
                    } else {
                        summary.enriched += 1;
                    }
                    game.artworks = outcome.into_artworks();
                    self.db_manager.put(&game).inspect_err(|err| {
                        error!("Persisting {} failed: {}", game.name, err);
                    })?;
                    summary.persisted += 1;
                }
                Err(err @ FetchError::Auth(_)) => {
                    summary.enrichment_failures += total - index;
                    summary.stopped_early = true;
                    error!(
                        "Catalog authentication failed on {}: {}; {} games left unenriched until the next run",
                        game.name,
                        err,
                        total - index
                    );
                    break;
                }
                Err(err) => {
                    summary.enrichment_failures += 1;
                    error!("Enriching {} failed, skipping: {}", game.name, err);
                }
            }
        }
        Ok(())
    }
}
