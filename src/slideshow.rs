//! Headless slide selection over the reconciled game library.

use std::time::Duration;

use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::SlideshowConfig;
use crate::protocol::GameRecord;

const IMAGE_BASE_URL: &str = "https://images.igdb.com/igdb/image/upload/t_original";

pub fn image_url(image_id: &str) -> String {
    format!("{IMAGE_BASE_URL}/{image_id}.jpg")
}

/// One game's screen: its cover plus the backgrounds cycled behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub game_name: String,
    pub cover_url: String,
    pub background_urls: Vec<String>,
}

pub struct Slideshow {
    games: Vec<GameRecord>,
    rng: StdRng,
}

impl Slideshow {
    /// Keeps only games that have at least a cover.
    pub fn new(records: Vec<GameRecord>, seed: [u8; 32]) -> Self {
        let games = records
            .into_iter()
            .filter(|game| !game.artworks.is_empty())
            .collect();
        Self {
            games,
            rng: StdRng::from_seed(seed),
        }
    }

    pub fn with_random_seed(records: Vec<GameRecord>) -> Self {
        let mut seed = [0u8; 32];
        if let Err(err) = getrandom::fill(&mut seed) {
            warn!("Failed to generate random slideshow seed, using a fixed one: {err}");
        }
        Self::new(records, seed)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Picks a random game. `artworks[0]` is the cover; backgrounds are drawn
    /// from the rest and are empty when the game has a single image.
    pub fn next_slide(&mut self, background_count: u32) -> Option<Slide> {
        if self.games.is_empty() {
            return None;
        }
        let game = &self.games[self.rng.random_range(0..self.games.len())];
        let cover = &game.artworks[0];
        let extra = &game.artworks[1..];
        let background_urls = if extra.is_empty() {
            Vec::new()
        } else {
            (0..background_count)
                .map(|_| image_url(&extra[self.rng.random_range(0..extra.len())].image_id))
                .collect()
        };
        Some(Slide {
            game_name: game.name.clone(),
            cover_url: image_url(&cover.image_id),
            background_urls,
        })
    }

    /// Shows slides forever, one every `image_time_seconds`.
    pub fn run(&mut self, timing: &SlideshowConfig) {
        if self.games.is_empty() {
            warn!("No games with artwork in the store; nothing to show");
            return;
        }
        info!("Starting slideshow over {} games", self.games.len());
        let step = background_interval(timing);
        loop {
            let Some(slide) = self.next_slide(timing.background_transitions.max(1)) else {
                return;
            };
            info!("Showing {}: cover {}", slide.game_name, slide.cover_url);
            if slide.background_urls.is_empty() {
                std::thread::sleep(step * timing.background_transitions.max(1));
                continue;
            }
            for background_url in &slide.background_urls {
                info!("Background for {}: {}", slide.game_name, background_url);
                std::thread::sleep(step);
            }
        }
    }
}

/// Time each background stays up so that one game fills `image_time_seconds`.
pub fn background_interval(timing: &SlideshowConfig) -> Duration {
    Duration::from_secs(timing.image_time_seconds.max(1)) / timing.background_transitions.max(1)
}
