mod cli;
mod core;
mod db;
mod lib;
mod server;
mod sheet;

use crate::core::{Config, ImportSummary, Message};
use crate::db::Store;
use cli::Cli;
use structopt::StructOpt;
use failure::Error;
use exitfailure::ExitFailure;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::io::{self, Write};
use tokio::sync::Notify;

fn main() -> Result<(), ExitFailure> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::from_args();
    match cli {
        Cli::New { } => create_structure()?,
        Cli::Import { } => import_only()?,
        Cli::Lookup { name } => lookup(&name)?,
        Cli::Serve { } => serve()?
    }
    Ok(())
}

fn create_structure() -> Result<(), Error> {
    let config = core::create_structure()?;
    println!("Created {} and {}.", core::CONFIG_FILE_NAME, config.database);
    Ok(())
}

fn import_only() -> Result<(), Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
         r.store(false, Ordering::SeqCst);
    })?;
    let config = core::config()?;
    let store = Store::new(&config.database);
    import(&store, &config, running)?;
    Ok(())
}

fn lookup(name: &str) -> Result<(), Error> {
    let config = core::config()?;
    let store = Store::new(&config.database);
    match core::find_game(&store, name)? {
        None => println!("No game named {:?}.", name),
        Some(game) => {
            println!("Name\tOwners\tMetaCritic\tRecommendations\tRelease\tAge\tSystems\tPlayers");
            println!("{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                game.name, game.owner_count, game.meta_critic_score, game.recommendations,
                game.release_date, game.required_age, game.systems, game.player_estimate);
        }
    }
    Ok(())
}

fn serve() -> Result<(), Error> {
    // Cancellation token, also wakes the server
    let running = Arc::new(AtomicBool::new(true));
    let stop = Arc::new(Notify::new());
    let r = running.clone();
    let s = stop.clone();
    ctrlc::set_handler(move || {
         r.store(false, Ordering::SeqCst);
         s.notify_one();
    })?;
    let config = core::config()?;
    let store = Arc::new(Store::new(&config.database));
    let summary = import(&store, &config, running)?;
    if summary.interrupted {
        println!("Import interrupted, not serving.");
        return Ok(());
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(store, &config.address(), async move {
        stop.notified().await;
    }))?;
    println!("Stopped.");
    Ok(())
}

fn import(store: &Store, config: &Config, running: Arc<AtomicBool>) -> Result<ImportSummary, Error> {
    println!("Starting import of {}.", config.workbook);
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut header_problems: u32 = 0;
    // first terminal error, raised once the import is done
    let mut term: io::Result<()> = Ok(());
    let summary = core::import_games(store, config, running, |m| {
        let line = match m {
            Message::NoteBatch(stored) => (Color::Green, format!("Stored {} games.", stored)),
            Message::NoteHeader(problem) => {
                header_problems += 1;
                (Color::Red, format!("Header mismatch, {}", problem))
            },
            Message::NoteDuplicate(_) => return
        };
        if term.is_ok() {
            term = note(&mut stdout, line.0, &line.1);
        }
    })?;
    term?;
    stdout.reset()?;
    println!("Read {} rows: {} new games, {} duplicates, {} blank, {} header mismatches.",
        summary.rows, summary.inserted, summary.duplicates, summary.blank, header_problems);
    Ok(summary)
}

fn note(out: &mut impl WriteColor, color: Color, line: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    writeln!(out, "{}", line)
}
