use crate::errors::StoreError;
use crate::protocol::{GameRecord, GameSource};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "game_cover_slideshow";
const DB_FILE_NAME: &str = "game_artwork.db";

/// Local store of reconciled game records, keyed by source name + source id.
pub struct DbManager {
    conn: Connection,
}

impl DbManager {
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::Unavailable("could not find data directory".to_string()))?
            .join(DATA_DIR_NAME);
        Ok(data_dir.join(DB_FILE_NAME))
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StoreError::Unavailable(format!(
                        "could not create store directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        // Fail at open time rather than on the first write when another
        // process holds the file.
        conn.execute_batch("BEGIN IMMEDIATE; COMMIT;")?;

        let db_manager = Self { conn };
        db_manager.initialize_schema()?;
        Ok(db_manager)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db_manager = Self {
            conn: Connection::open_in_memory()?,
        };
        db_manager.initialize_schema()?;
        Ok(db_manager)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                key TEXT PRIMARY KEY,
                source INTEGER NOT NULL,
                source_id TEXT NOT NULL,
                value TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS games_source ON games (source)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS games_source_source_id ON games (source, source_id)",
            [],
        )?;
        Ok(())
    }

    /// Inserts or replaces the record stored under its `(source, source_id)` key.
    pub fn put(&self, record: &GameRecord) -> Result<(), StoreError> {
        let value = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO games (key, source, source_id, value) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                source = excluded.source,
                source_id = excluded.source_id,
                value = excluded.value",
            params![
                record.store_key(),
                u8::from(record.source),
                record.source_id,
                value
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, source: GameSource, source_id: &str) -> Result<Option<GameRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM games WHERE source = ?1 AND source_id = ?2")?;
        let mut rows = stmt.query(params![u8::from(source), source_id])?;
        match rows.next()? {
            Some(row) => {
                let value: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&value)?))
            }
            None => Ok(None),
        }
    }

    /// Returns every record ascending by source. Equal-source records come
    /// back in key order.
    pub fn list_all(&self) -> Result<Vec<GameRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM games ORDER BY source ASC, key ASC")?;
        let value_iter = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for value in value_iter {
            records.push(serde_json::from_str(&value?)?);
        }
        Ok(records)
    }

    pub fn list_by_source(&self, source: GameSource) -> Result<Vec<GameRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT value FROM games WHERE source = ?1 ORDER BY source ASC, source_id ASC",
        )?;
        let value_iter = stmt.query_map(params![u8::from(source)], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for value in value_iter {
            records.push(serde_json::from_str(&value?)?);
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |r| r.get(0))?;
        Ok(count.max(0) as usize)
    }
}
