//! Box scores: per-inning runs for each side of a game, and the first-five-innings total derived
//! from them.

use std::fmt::{Display, Formatter};
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::csv::{cell, Table};
use crate::error::InputError;
use crate::team::{Team, UnknownTeamPolicy};

pub const INNINGS: usize = 9;
pub const FIRST_FIVE: usize = 5;
pub const PENDING: &str = "Pending";

/// Runs scored by one side in one inning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InningScore {
    Runs(u8),
    /// The inning has not been resolved yet.
    Pending,
    /// Blank or non-numeric, e.g. an unplayed bottom of the ninth.
    #[default]
    Void,
}
impl InningScore {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case(PENDING) {
            return InningScore::Pending;
        }
        match s.parse::<f64>() {
            Ok(runs) if runs.is_finite() && runs >= 0.0 && runs.fract() == 0.0 && runs <= u8::MAX as f64 => {
                InningScore::Runs(runs as u8)
            }
            _ => InningScore::Void,
        }
    }

    pub fn runs(&self) -> Option<u8> {
        match self {
            InningScore::Runs(runs) => Some(*runs),
            _ => None,
        }
    }
}

impl Display for InningScore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InningScore::Runs(runs) => write!(f, "{runs}"),
            InningScore::Pending => write!(f, "{PENDING}"),
            InningScore::Void => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameKey {
    pub date: NaiveDate,
    pub home: Team,
    pub away: Team,
}

impl Display for GameKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} @ {}", self.date, self.away, self.home)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("game {0} has unresolved innings and cannot be labelled")]
pub struct PendingGameLabeled(pub GameKey);

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub date: NaiveDate,
    pub home: Team,
    pub away: Team,
    pub away_innings: [InningScore; INNINGS],
    pub home_innings: [InningScore; INNINGS],
}
impl Game {
    pub fn key(&self) -> GameKey {
        GameKey {
            date: self.date,
            home: self.home,
            away: self.away,
        }
    }

    fn first_five(&self) -> impl Iterator<Item = &InningScore> {
        self.away_innings[..FIRST_FIVE]
            .iter()
            .chain(self.home_innings[..FIRST_FIVE].iter())
    }

    /// Whether any of the first five innings, on either side, is still pending.
    pub fn is_pending(&self) -> bool {
        self.first_five().any(|score| *score == InningScore::Pending)
    }

    /// Combined runs of both sides over innings 1–5, defined only when all ten half-innings are resolved.
    pub fn runs_1_5(&self) -> Option<u32> {
        self.first_five()
            .map(|score| score.runs().map(u32::from))
            .sum()
    }

    /// Whether the game went over the `line`. Refuses games whose first five innings are unresolved.
    pub fn label(&self, line: f64) -> Result<bool, PendingGameLabeled> {
        match self.runs_1_5() {
            Some(runs) if !self.is_pending() => Ok(runs as f64 > line),
            _ => Err(PendingGameLabeled(self.key())),
        }
    }

    pub fn actual_over(&self, line: f64) -> Option<bool> {
        self.label(line).ok()
    }
}

/// Parses `YYYY-MM-DD`, ignoring any trailing time component.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let date = s.split_whitespace().next()?;
    let date = date.split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

pub fn inning_column(side: &str, inning: usize) -> String {
    format!("{side}_{inning}th")
}

pub fn read_games(path: impl AsRef<Path>, policy: UnknownTeamPolicy) -> Result<Vec<Game>, InputError> {
    let table = Table::read(path)?;
    parse_games(&table, policy)
}

/// Converts a box-score table into games. Innings 1–5 are required columns; later innings are
/// read as void when absent.
pub fn parse_games(table: &Table, policy: UnknownTeamPolicy) -> Result<Vec<Game>, InputError> {
    let date_col = table.require("Game_Date")?;
    let home_col = table.require("Home_Team")?;
    let away_col = table.require("Away_Team")?;
    let mut inning_cols = [[None; INNINGS]; 2];
    for (side_index, side) in ["Away", "Home"].into_iter().enumerate() {
        for inning in 0..INNINGS {
            let column = inning_column(side, inning + 1);
            inning_cols[side_index][inning] = if inning < FIRST_FIVE {
                Some(table.require(&column)?)
            } else {
                table.column(&column)
            };
        }
    }

    let mut games = Vec::with_capacity(table.len());
    for (row, record) in table.rows() {
        let date_str = cell(record, date_col);
        let date = parse_date(date_str).ok_or_else(|| table.invalid("Game_Date", date_str, row))?;
        let teams = Team::from_name(cell(record, home_col))
            .and_then(|home| Team::from_name(cell(record, away_col)).map(|away| (home, away)));
        let (home, away) = match (teams, policy) {
            (Ok(teams), _) => teams,
            (Err(err), UnknownTeamPolicy::Skip) => {
                warn!("{}: skipping row {row}: {err}", table.name());
                continue;
            }
            (Err(err), UnknownTeamPolicy::Halt) => return Err(err.into()),
        };
        let mut innings = [[InningScore::Void; INNINGS]; 2];
        for (side_index, side_cols) in inning_cols.iter().enumerate() {
            for (inning, column) in side_cols.iter().enumerate() {
                if let Some(column) = column {
                    innings[side_index][inning] = InningScore::parse(cell(record, *column));
                }
            }
        }
        let [away_innings, home_innings] = innings;
        games.push(Game {
            date,
            home,
            away,
            away_innings,
            home_innings,
        });
    }
    debug!("{}: read {} of {} games", table.name(), games.len(), table.len());
    Ok(games)
}
