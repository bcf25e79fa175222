use structopt::StructOpt;

#[derive(Debug, StructOpt)]
/// Imports the Steam games-features sheet
/// and looks games up by name.
pub enum Cli {
    #[structopt(name = "new")]
    /// Creates new .db and .config files.
    New { },
    #[structopt(name = "import")]
    /// Loads games from the workbook named
    /// in config. Known names are skipped.
    Import { },
    #[structopt(name = "lookup")]
    /// Prints the game with exactly this name.
    Lookup {
        name: String
    },
    #[structopt(name = "serve")]
    /// Imports games, then answers
    /// GET /search/{name} until Ctrl+C.
    Serve { }
}
