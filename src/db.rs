use crate::lib::GameRecord;
use failure::{Error, ResultExt};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

const INSERT_GAME: &str = "insert or ignore into games
    (name, ownerCount, metaCriticScore, recommendations, releaseDate, requiredAge, systems, playerEstimate)
    values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Handle on the games database. Holds no connection itself, every
/// caller gets its own and releases it on drop.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new<P: AsRef<Path>>(path: P) -> Store {
        Store { path: path.as_ref().to_path_buf() }
    }

    /// Creates the db file and the games table if they are missing.
    pub fn initialize(&self) -> Result<(), Error> {
        let conn = self.writer()?;
        conn.create_tables()
    }

    pub fn writer(&self) -> Result<DbConn, Error> {
        let conn = Connection::open(&self.path)
            .with_context(|_| format!("Can't open database: {}", self.path.display()))?;
        Ok(DbConn { conn })
    }

    pub fn reader(&self) -> Result<DbConn, Error> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX, // one per request
        )
        .with_context(|_| format!("Can't open database: {}", self.path.display()))?;
        Ok(DbConn { conn })
    }
}

pub struct DbConn {
    conn: Connection,
}

impl DbConn {
    pub fn create_tables(&self) -> Result<(), Error> {
        self.conn.execute(
            "create table if not exists games (
                name text not null primary key,
                ownerCount integer,
                metaCriticScore integer,
                recommendations integer,
                releaseDate text,
                requiredAge integer,
                systems text,
                playerEstimate integer
             )",
            [],
        )?;
        Ok(())
    }

    /// Inserts the whole batch in one transaction. Names that are already
    /// stored are left untouched and returned back to the caller.
    pub fn add_games<'a>(&mut self, games: &'a [GameRecord]) -> Result<Vec<&'a GameRecord>, Error> {
        let tx = self.conn.transaction()?;
        let mut ignored = Vec::new();
        {
            let mut stmt = tx.prepare(INSERT_GAME)?;
            for game in games {
                let changed = stmt.execute(params![
                    game.name,
                    game.owner_count,
                    game.meta_critic_score,
                    game.recommendations,
                    game.release_date,
                    game.required_age,
                    game.systems,
                    game.player_estimate
                ])?;
                if changed == 0 {
                    ignored.push(game);
                }
            }
        }
        tx.commit()?;
        Ok(ignored)
    }

    /// Exact, case sensitive match on the name. Should several rows match,
    /// the last one scanned is returned.
    pub fn find_game(&self, name: &str) -> Result<Option<GameRecord>, Error> {
        let mut stmt = self.conn.prepare(
            "select name, ownerCount, metaCriticScore, recommendations, releaseDate,
                requiredAge, systems, playerEstimate
             from games where name = ?1",
        )?;
        let games = stmt.query_map(params![name], game_from_row)?;
        let mut found = None;
        for game in games {
            found = Some(game?);
        }
        Ok(found)
    }

    pub fn count_games(&self) -> Result<u32, Error> {
        let count: u32 = self
            .conn
            .query_row("select count(*) from games", [], |r| r.get(0))?;
        Ok(count)
    }
}

// Columns other than the key are nullable; treat null as the empty value.
fn game_from_row(r: &Row) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        name: r.get(0)?,
        owner_count: r.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        meta_critic_score: r.get::<_, Option<i64>>(2)?.unwrap_or_default(),
        recommendations: r.get::<_, Option<i64>>(3)?.unwrap_or_default(),
        release_date: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
        required_age: r.get::<_, Option<i64>>(5)?.unwrap_or_default(),
        systems: r.get::<_, Option<String>>(6)?.unwrap_or_default(),
        player_estimate: r.get::<_, Option<i64>>(7)?.unwrap_or_default(),
    })
}
