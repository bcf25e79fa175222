//! Reads game rows out of the `games-features` workbook.

use crate::lib::GameRecord;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use failure::{ensure, Error, ResultExt};
use std::path::Path;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Field {
    Name,
    ReleaseDate,
    RequiredAge,
    MetaCritic,
    Recommendations,
    Owners,
    PlayerEstimate,
    PlatformPc,
    PlatformLinux,
    PlatformMac,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: Field,
    pub index: usize,
    pub header: &'static str,
}

/// Layout of the Steam games-features export. Indices are absolute sheet
/// columns and must not drift.
pub const STEAM_COLUMNS: &[Column] = &[
    Column { field: Field::Name, index: 2, header: "QueryName" },
    Column { field: Field::ReleaseDate, index: 4, header: "ReleaseDate" },
    Column { field: Field::RequiredAge, index: 5, header: "RequiredAge" },
    Column { field: Field::MetaCritic, index: 9, header: "Metacritic" },
    Column { field: Field::Recommendations, index: 12, header: "RecommendationCount" },
    Column { field: Field::Owners, index: 15, header: "SteamSpyOwners" },
    Column { field: Field::PlayerEstimate, index: 17, header: "SteamSpyPlayersEstimate" },
    Column { field: Field::PlatformPc, index: 26, header: "PlatformWindows" },
    Column { field: Field::PlatformLinux, index: 27, header: "PlatformLinux" },
    Column { field: Field::PlatformMac, index: 28, header: "PlatformMac" },
];

#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: &'static [Column],
}

impl Default for ColumnMap {
    fn default() -> ColumnMap {
        ColumnMap { columns: STEAM_COLUMNS }
    }
}

impl ColumnMap {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.iter().find(|c| c.field == field).map(|c| c.index)
    }

    /// Lists every column whose header cell differs from the expected one.
    pub fn check_header(&self, row: &SheetRow) -> Vec<String> {
        self.columns
            .iter()
            .filter_map(|c| {
                let found = row.text(c.index);
                if found == c.header {
                    None
                } else {
                    Some(format!("column {}: expected `{}`, found `{}`", c.index, c.header, found))
                }
            })
            .collect()
    }

    pub fn record(&self, row: &SheetRow) -> GameRecord {
        let text = |f| self.index(f).map(|i| row.text(i)).unwrap_or_default();
        let int = |f| self.index(f).map(|i| row.int(i)).unwrap_or_default();
        let flag = |f| self.index(f).map(|i| row.flag(i)).unwrap_or_default();
        GameRecord {
            name: text(Field::Name),
            owner_count: int(Field::Owners),
            meta_critic_score: int(Field::MetaCritic),
            recommendations: int(Field::Recommendations),
            release_date: text(Field::ReleaseDate),
            required_age: int(Field::RequiredAge),
            systems: systems(flag(Field::PlatformPc), flag(Field::PlatformLinux), flag(Field::PlatformMac)),
            player_estimate: int(Field::PlayerEstimate),
        }
    }
}

/// Platform tags in fixed order. `pc` and `linux` keep their trailing
/// space even when nothing follows; stored values depend on it.
pub fn systems(pc: bool, linux: bool, mac: bool) -> String {
    let mut tags = String::new();
    if pc {
        tags.push_str("pc ");
    }
    if linux {
        tags.push_str("linux ");
    }
    if mac {
        tags.push_str("mac");
    }
    tags
}

/// One sheet row, addressed by absolute column index.
pub struct SheetRow<'a> {
    cells: &'a [Data],
    offset: usize,
}

impl<'a> SheetRow<'a> {
    pub fn new(cells: &'a [Data], offset: usize) -> SheetRow<'a> {
        SheetRow { cells, offset }
    }

    fn cell(&self, col: usize) -> Option<&Data> {
        col.checked_sub(self.offset).and_then(|i| self.cells.get(i))
    }

    pub fn text(&self, col: usize) -> String {
        match self.cell(col) {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Some(Data::Empty) | Some(Data::Error(_)) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Anything that is not a whole number reads as zero.
    pub fn int(&self, col: usize) -> i64 {
        match self.cell(col) {
            Some(Data::Int(i)) => *i,
            Some(Data::Float(f)) if f.fract() == 0.0 => *f as i64,
            Some(Data::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn flag(&self, col: usize) -> bool {
        match self.cell(col) {
            Some(Data::Bool(b)) => *b,
            Some(Data::String(s)) => s == "True",
            _ => false,
        }
    }
}

/// The used range of a sheet, with the position it starts at.
pub struct Sheet {
    range: Range<Data>,
}

impl Sheet {
    pub fn open<P: AsRef<Path>>(path: P, sheet: &str) -> Result<Sheet, Error> {
        let path = path.as_ref();
        let mut workbook = open_workbook::<Xlsx<_>, _>(path)
            .with_context(|_| format!("Can't open workbook: {}", path.display()))?;
        ensure!(
            workbook.sheet_names().iter().any(|s| s == sheet),
            "No sheet `{}` in {}",
            sheet,
            path.display()
        );
        let range = workbook
            .worksheet_range(sheet)
            .with_context(|_| format!("Can't read sheet: {}", sheet))?;
        Ok(Sheet { range })
    }

    /// Rows paired with their absolute sheet row index.
    pub fn rows(&self) -> impl Iterator<Item = (usize, SheetRow<'_>)> {
        let (row_start, col_start) = self
            .range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        self.range
            .rows()
            .enumerate()
            .map(move |(i, cells)| (row_start + i, SheetRow::new(cells, col_start)))
    }

    pub fn height(&self) -> usize {
        self.range.height()
    }
}
