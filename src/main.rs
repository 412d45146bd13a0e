mod backends;
mod config;
mod db_manager;
mod errors;
mod http_transport;
mod protocol;
mod reconciliation_manager;
mod retry;
mod slideshow;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use backends::igdb::IgdbClient;
use backends::steam::SteamClient;
use config::{default_config_path, load_config_file, Config};
use db_manager::DbManager;
use log::{error, info};
use reconciliation_manager::ReconciliationManager;
use retry::RunDeadline;
use slideshow::Slideshow;

const LOG_FILE_NAME: &str = "logs.txt";

fn log_file_path() -> Option<PathBuf> {
    let dir = dirs::data_dir()?.join("game_cover_slideshow");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(LOG_FILE_NAME))
}

fn setup_logging() {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    let log_file = log_file_path().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    if let Some(file) = log_file {
        clog.target(env_logger::Target::Pipe(Box::new(file)));
        clog.write_style(env_logger::WriteStyle::Never);
    }
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));
}

fn load_config() -> Option<Config> {
    let Some(config_file) = default_config_path() else {
        error!("Could not find config directory");
        return None;
    };
    match load_config_file(&config_file) {
        Ok(config) => Some(config),
        Err(err) => {
            error!("Failed to load config {}: {}", config_file.display(), err);
            None
        }
    }
}

fn open_store(config: &Config) -> Option<DbManager> {
    let path = match &config.store.path {
        Some(path) => path.clone(),
        None => match DbManager::default_path() {
            Ok(path) => path,
            Err(err) => {
                error!("Failed to load DB: {}", err);
                return None;
            }
        },
    };
    match DbManager::open(&path) {
        Ok(db_manager) => {
            info!(
                "Opened game store at {} ({} games)",
                path.display(),
                db_manager.count().unwrap_or_default()
            );
            Some(db_manager)
        }
        Err(err) => {
            error!("Failed to load DB {}: {}", path.display(), err);
            None
        }
    }
}

fn main() -> ExitCode {
    setup_logging();

    let Some(config) = load_config() else {
        return ExitCode::FAILURE;
    };
    let Some(db_manager) = open_store(&config) else {
        return ExitCode::FAILURE;
    };

    let steam = SteamClient::new(config.steam_credentials(), config.retry_policy());
    let igdb = IgdbClient::new(config.igdb_credentials())
        .with_endpoints(&config.igdb.token_url, &config.igdb.api_base_url);
    let deadline = RunDeadline::after(config.run_deadline());
    let mut reconciliation = ReconciliationManager::new(&db_manager, steam, igdb, deadline);
    if let Err(err) = reconciliation.run() {
        // Already-stored games can still be shown.
        error!("Library sync failed: {}", err);
    }

    let games = match db_manager.list_all() {
        Ok(games) => games,
        Err(err) => {
            error!("Failed to read games from store: {}", err);
            return ExitCode::FAILURE;
        }
    };
    Slideshow::with_random_seed(games).run(&config.slideshow);
    ExitCode::SUCCESS
}
