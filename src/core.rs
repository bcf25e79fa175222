use crate::db::Store;
use crate::lib::{GameName, GameRecord};
use crate::sheet::{ColumnMap, Sheet};
use failure::{Error, ResultExt, ensure};
use log::{debug, info, warn};
use serde_derive::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const CONFIG_FILE_NAME: &str = "app.config";

pub fn create_structure() -> Result<Config, Error> {
    // create config file
    let new_conf = Config::default();
    fs::write(CONFIG_FILE_NAME, to_string_pretty(&new_conf)?)?;
    // create db file
    Store::new(&new_conf.database).initialize()?;
    Ok(new_conf)
}

pub fn config() -> Result<Config, Error> {
    read_config(CONFIG_FILE_NAME)
}

pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
    let path = path.as_ref();
    let conf = fs::read_to_string(path)
        .with_context(|_| format!("Can't open: {}", path.display()))?;
    let conf: Config = from_str(&conf)
        .with_context(|_| format!("Can't parse: {}", path.display()))?;
    ensure!(conf.batch_size > 0, "batch_size must be positive.");
    Ok(conf)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub database: String, // sqlite file
    pub workbook: String, // xlsx with game features
    pub sheet: String,
    pub host: String,
    pub port: u16,
    pub header_rows: usize, // leading rows that are not games
    pub batch_size: usize // games per transaction
}

impl Default for Config {
    fn default() -> Config {
        Config {
            database: String::from("./Demo.db"),
            workbook: String::from("games-features (1).xlsx"),
            sheet: String::from("games-features"),
            host: String::from("0.0.0.0"),
            port: 8090,
            header_rows: 1,
            batch_size: 500
        }
    }
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
pub enum Message {
    NoteBatch(usize), // games stored so far
    NoteDuplicate(GameName),
    NoteHeader(String) // header cell that does not fit the column map
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    pub rows: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub blank: usize,
    pub interrupted: bool
}

/// Loads every game row of the configured sheet into the store.
/// The first `header_rows` rows and rows with a blank name are not stored.
/// Names already present are kept as they are. Stops after the current
/// batch once `running` goes false.
pub fn import_games(store: &Store, config: &Config, running: Arc<AtomicBool>,
        mut progress: impl FnMut(Message)) -> Result<ImportSummary, Error> {
    ensure!(config.batch_size > 0, "batch_size must be positive.");
    store.initialize()?;
    let sheet = Sheet::open(&config.workbook, &config.sheet)?;
    info!("Importing {} rows from {}", sheet.height(), config.workbook);

    let columns = ColumnMap::default();
    let mut conn = store.writer()?;
    let mut summary = ImportSummary::default();
    let mut batch: Vec<GameRecord> = Vec::with_capacity(config.batch_size);

    let mut store_batch = |batch: &mut Vec<GameRecord>, summary: &mut ImportSummary,
            progress: &mut dyn FnMut(Message)| -> Result<(), Error> {
        let ignored = conn.add_games(batch)?;
        summary.duplicates += ignored.len();
        summary.inserted += batch.len() - ignored.len();
        for game in ignored {
            debug!("Skipped duplicate {}", game.name);
            progress(Message::NoteDuplicate(game.name.clone()));
        }
        batch.clear();
        progress(Message::NoteBatch(summary.inserted));
        Ok(())
    };

    for (i, row) in sheet.rows() {
        if i < config.header_rows {
            if i == 0 {
                for problem in columns.check_header(&row) {
                    warn!("Unexpected header, {}", problem);
                    progress(Message::NoteHeader(problem));
                }
            }
            continue;
        }
        summary.rows += 1;
        let game = columns.record(&row);
        if game.name.is_empty() {
            summary.blank += 1;
            continue;
        }
        batch.push(game);
        if batch.len() == config.batch_size {
            store_batch(&mut batch, &mut summary, &mut progress)?;
            // check if we got stop command
            if !running.load(Ordering::SeqCst) {
                summary.interrupted = true;
                break;
            }
        }
    }
    if !summary.interrupted && !batch.is_empty() {
        store_batch(&mut batch, &mut summary, &mut progress)?;
    }
    info!("Imported {} games, {} duplicates, {} blank rows",
        summary.inserted, summary.duplicates, summary.blank);
    Ok(summary)
}

/// `None` when nothing matches the exact name.
pub fn find_game(store: &Store, name: &str) -> Result<Option<GameRecord>, Error> {
    let conn = store.reader()?;
    conn.find_game(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: [(u16, &str); 10] = [
        (2, "QueryName"), (4, "ReleaseDate"), (5, "RequiredAge"), (9, "Metacritic"),
        (12, "RecommendationCount"), (15, "SteamSpyOwners"), (17, "SteamSpyPlayersEstimate"),
        (26, "PlatformWindows"), (27, "PlatformLinux"), (28, "PlatformMac")
    ];

    // name, date, age, metacritic, recommendations, owners, players, pc, linux, mac
    type Row<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, &'a str, &'a str, &'a str, &'a str, &'a str);

    const GAMES: [Row<'static>; 5] = [
        ("Counter-Strike", "Nov 1 2000", "0", "88", "68991", "13033334", "9140731", "True", "True", "True"),
        ("Team Fortress Classic", "Apr 1 1999", "0", "0", "2439", "5399140", "753627", "True", "True", "False"),
        ("Day of Defeat", "May 1 2003", "0", "79", "2319", "7621102", "1709740", "True", "False", "True"),
        ("Counter-Strike", "Jan 1 2020", "18", "1", "1", "1", "1", "False", "False", "False"),
        ("Ricochet", "Nov 1 2000", "lots", "n/a", "1965", "5399129", "??", "True", "True", "True"),
    ];

    fn write_workbook(dir: &TempDir, rows: &[Row]) -> PathBuf {
        let path = dir.path().join("games.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("games-features").unwrap();
        for (col, header) in HEADER.iter() {
            worksheet.write_string(0, *col, *header).unwrap();
        }
        worksheet.write_string(0, 0, "QueryID").unwrap();
        for (i, r) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            let cells = [r.0, r.1, r.2, r.3, r.4, r.5, r.6, r.7, r.8, r.9];
            for ((col, _), value) in HEADER.iter().zip(cells.iter()) {
                worksheet.write_string(row, *col, *value).unwrap();
            }
            worksheet.write_number(row, 0, row).unwrap();
        }
        workbook.save(&path).unwrap();
        path
    }

    fn setup(rows: &[Row]) -> (TempDir, Store, Config) {
        let dir = tempfile::tempdir().unwrap();
        let workbook = write_workbook(&dir, rows);
        let config = Config {
            database: dir.path().join("games.db").to_string_lossy().into_owned(),
            workbook: workbook.to_string_lossy().into_owned(),
            batch_size: 2,
            ..Config::default()
        };
        let store = Store::new(&config.database);
        (dir, store, config)
    }

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn import_is_idempotent() {
        let (_dir, store, config) = setup(&GAMES);
        let first = import_games(&store, &config, running(), |_| {}).unwrap();
        assert_eq!(first, ImportSummary { rows: 5, inserted: 4, duplicates: 1, blank: 0, interrupted: false });
        let count = store.reader().unwrap().count_games().unwrap();

        let second = import_games(&store, &config, running(), |_| {}).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 5);
        assert_eq!(store.reader().unwrap().count_games().unwrap(), count);
        assert_eq!(count, 4);
    }

    #[test]
    fn counter_strike_keeps_first_row() {
        let (_dir, store, config) = setup(&GAMES);
        let mut duplicates = Vec::new();
        import_games(&store, &config, running(), |m| {
            if let Message::NoteDuplicate(name) = m {
                duplicates.push(name);
            }
        })
        .unwrap();
        assert_eq!(duplicates, vec!["Counter-Strike".to_string()]);

        let game = find_game(&store, "Counter-Strike").unwrap().unwrap();
        assert_eq!(
            game,
            GameRecord {
                name: "Counter-Strike".to_string(),
                owner_count: 13033334,
                meta_critic_score: 88,
                recommendations: 68991,
                release_date: "Nov 1 2000".to_string(),
                required_age: 0,
                systems: "pc linux mac".to_string(),
                player_estimate: 9140731,
            }
        );
    }

    #[test]
    fn systems_and_bad_numbers() {
        let (_dir, store, config) = setup(&GAMES);
        import_games(&store, &config, running(), |_| {}).unwrap();

        let tfc = find_game(&store, "Team Fortress Classic").unwrap().unwrap();
        assert_eq!(tfc.systems, "pc linux ");
        let dod = find_game(&store, "Day of Defeat").unwrap().unwrap();
        assert_eq!(dod.systems, "pc mac");

        let ricochet = find_game(&store, "Ricochet").unwrap().unwrap();
        assert_eq!(ricochet.required_age, 0);
        assert_eq!(ricochet.meta_critic_score, 0);
        assert_eq!(ricochet.player_estimate, 0);
        assert_eq!(ricochet.recommendations, 1965);
        assert_eq!(ricochet.owner_count, 5399129);
    }

    #[test]
    fn unknown_name_is_none() {
        let (_dir, store, config) = setup(&GAMES);
        import_games(&store, &config, running(), |_| {}).unwrap();
        assert_eq!(find_game(&store, "Half-Life 3").unwrap(), None);
        assert_eq!(find_game(&store, "counter-strike").unwrap(), None);
    }

    #[test]
    fn blank_names_are_skipped() {
        let rows = [
            ("", "", "", "", "", "", "", "True", "", ""),
            ("Deathmatch Classic", "Jun 1 2001", "0", "0", "1", "2", "3", "True", "False", "False"),
        ];
        let (_dir, store, config) = setup(&rows);
        let summary = import_games(&store, &config, running(), |_| {}).unwrap();
        assert_eq!(summary.blank, 1);
        assert_eq!(summary.inserted, 1);
        assert_eq!(find_game(&store, "").unwrap(), None);
    }

    #[test]
    fn header_row_is_not_a_game() {
        let (_dir, store, config) = setup(&GAMES);
        let mut headers = 0;
        import_games(&store, &config, running(), |m| {
            if let Message::NoteHeader(_) = m {
                headers += 1;
            }
        })
        .unwrap();
        assert_eq!(headers, 0);
        assert_eq!(find_game(&store, "QueryName").unwrap(), None);
    }

    #[test]
    fn stop_flag_ends_after_batch() {
        let (_dir, store, config) = setup(&GAMES);
        let summary = import_games(&store, &config, Arc::new(AtomicBool::new(false)), |_| {}).unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.inserted, 2);
        assert_eq!(store.reader().unwrap().count_games().unwrap(), 2);
    }

    #[test]
    fn missing_sheet_is_fatal() {
        let (_dir, store, config) = setup(&GAMES);
        let config = Config { sheet: "games".to_string(), ..config };
        let err = import_games(&store, &config, running(), |_| {}).err().unwrap();
        assert!(err.to_string().contains("games"));
    }

    #[test]
    fn missing_workbook_is_fatal() {
        let (_dir, store, config) = setup(&GAMES);
        let config = Config { workbook: "nowhere.xlsx".to_string(), ..config };
        assert!(import_games(&store, &config, running(), |_| {}).is_err());
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, to_string_pretty(&Config::default()).unwrap()).unwrap();
        let conf = read_config(&path).unwrap();
        assert_eq!(conf, Config::default());
        assert_eq!(conf.address(), "0.0.0.0:8090");
    }

    #[test]
    fn config_rejects_zero_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let conf = Config { batch_size: 0, ..Config::default() };
        fs::write(&path, to_string_pretty(&conf).unwrap()).unwrap();
        assert!(read_config(&path).is_err());
        assert!(read_config(dir.path().join("missing.config")).is_err());
    }
}
