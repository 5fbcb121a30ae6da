//! Team-level season batting statistics, joined from the standard and advanced leaderboards.

use std::ops::Index;
use std::path::{Path, PathBuf};

use ::csv::StringRecord;
use chrono::{Days, NaiveDate};
use ordinalizer::Ordinal;
use rustc_hash::FxHashMap;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};
use tracing::{debug, warn};

use crate::csv::{cell, Table};
use crate::error::{InputError, SchemaError};
use crate::team::{Team, UnknownTeamPolicy};

pub const STANDARD_FILE_STEM: &str = "team_standard";
pub const ADVANCED_FILE_STEM: &str = "team_advanced";
const TEAM_COLUMN: &str = "Tm";
const TEAM_COLUMN_ALT: &str = "Team";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinal, EnumCount, EnumIter)]
pub enum Stat {
    WalkRate,
    StrikeoutRate,
    IsolatedPower,
    WeightedRunsCreatedPlus,
    OnBasePercentage,
    Slugging,
    RunsBattedIn,
    BattingAverage,
    OnBasePlusSlugging,
}
impl Stat {
    /// Column header as it appears in the leaderboard exports.
    pub fn column(&self) -> &'static str {
        match self {
            Stat::WalkRate => "BB%",
            Stat::StrikeoutRate => "K%",
            Stat::IsolatedPower => "ISO",
            Stat::WeightedRunsCreatedPlus => "wRC+",
            Stat::OnBasePercentage => "OBP",
            Stat::Slugging => "SLG",
            Stat::RunsBattedIn => "RBI",
            Stat::BattingAverage => "AVG",
            Stat::OnBasePlusSlugging => "OPS",
        }
    }

    /// The leaderboard consulted first for this statistic.
    pub fn preferred_table(&self) -> StatTable {
        match self {
            Stat::WalkRate | Stat::StrikeoutRate | Stat::IsolatedPower | Stat::WeightedRunsCreatedPlus => {
                StatTable::Advanced
            }
            _ => StatTable::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StatTable {
    #[strum(serialize = "standard")]
    Standard,
    #[strum(serialize = "advanced")]
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeamSeasonStats {
    values: [f64; Stat::COUNT],
}
impl TeamSeasonStats {
    pub fn new(values: [f64; Stat::COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; Stat::COUNT] {
        &self.values
    }
}

impl Index<Stat> for TeamSeasonStats {
    type Output = f64;

    fn index(&self, stat: Stat) -> &Self::Output {
        &self.values[stat.ordinal()]
    }
}

/// Parses a statistic cell. A trailing `%` is dropped; blank and `-` read as zero.
pub fn parse_stat(s: &str) -> Option<f64> {
    let s = s.trim().trim_end_matches('%').trim_end();
    if s.is_empty() || s == "-" {
        return Some(0.);
    }
    s.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Season statistics for every team present in both leaderboards at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    teams: FxHashMap<Team, TeamSeasonStats>,
}
impl StatsSnapshot {
    pub fn read(
        standard: impl AsRef<Path>,
        advanced: impl AsRef<Path>,
        policy: UnknownTeamPolicy,
    ) -> Result<Self, InputError> {
        let standard = Table::read(standard)?;
        let advanced = Table::read(advanced)?;
        Self::join(&standard, &advanced, policy)
    }

    /// Inner-joins the two leaderboards on the team column.
    pub fn join(standard: &Table, advanced: &Table, policy: UnknownTeamPolicy) -> Result<Self, InputError> {
        let lookups = Stat::iter()
            .map(|stat| locate_stat(stat, standard, advanced))
            .collect::<Result<Vec<_>, _>>()?;
        let standard_rows = index_by_team(standard, policy)?;
        let advanced_rows = index_by_team(advanced, policy)?;

        let mut teams = FxHashMap::default();
        for (team, standard_row) in &standard_rows {
            let Some(advanced_row) = advanced_rows.get(team) else {
                debug!("{team} absent from {}", advanced.name());
                continue;
            };
            let mut values = [0.; Stat::COUNT];
            for (stat, (source, column)) in Stat::iter().zip(&lookups) {
                let (table, (row, record)) = match source {
                    StatTable::Standard => (standard, standard_row),
                    StatTable::Advanced => (advanced, advanced_row),
                };
                let raw = cell(record, *column);
                values[stat.ordinal()] =
                    parse_stat(raw).ok_or_else(|| table.invalid(stat.column(), raw, *row))?;
            }
            teams.insert(*team, TeamSeasonStats::new(values));
        }
        debug!(
            "joined {} and {}: {} teams",
            standard.name(),
            advanced.name(),
            teams.len()
        );
        Ok(Self { teams })
    }

    pub fn get(&self, team: Team) -> Option<&TeamSeasonStats> {
        self.teams.get(&team)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

impl FromIterator<(Team, TeamSeasonStats)> for StatsSnapshot {
    fn from_iter<T: IntoIterator<Item = (Team, TeamSeasonStats)>>(iter: T) -> Self {
        Self {
            teams: iter.into_iter().collect(),
        }
    }
}

fn locate_stat(stat: Stat, standard: &Table, advanced: &Table) -> Result<(StatTable, usize), SchemaError> {
    let (preferred, fallback) = match stat.preferred_table() {
        StatTable::Standard => ((StatTable::Standard, standard), (StatTable::Advanced, advanced)),
        StatTable::Advanced => ((StatTable::Advanced, advanced), (StatTable::Standard, standard)),
    };
    [preferred, fallback]
        .into_iter()
        .find_map(|(source, table)| table.column(stat.column()).map(|column| (source, column)))
        .ok_or_else(|| SchemaError::MissingColumn {
            table: format!("{} + {}", standard.name(), advanced.name()),
            column: stat.column().to_string(),
        })
}

fn index_by_team(
    table: &Table,
    policy: UnknownTeamPolicy,
) -> Result<FxHashMap<Team, (usize, &StringRecord)>, InputError> {
    let team_col = table
        .column(TEAM_COLUMN)
        .or_else(|| table.column(TEAM_COLUMN_ALT))
        .map_or_else(|| table.require(TEAM_COLUMN), Ok)?;
    let mut rows = FxHashMap::default();
    for (row, record) in table.rows() {
        let name = cell(record, team_col);
        if is_summary_row(name) {
            debug!("{}: skipping summary row {row} '{name}'", table.name());
            continue;
        }
        let team = match (Team::from_name(name), policy) {
            (Ok(team), _) => team,
            (Err(err), UnknownTeamPolicy::Skip) => {
                warn!("{}: skipping row {row}: {err}", table.name());
                continue;
            }
            (Err(err), UnknownTeamPolicy::Halt) => return Err(err.into()),
        };
        if rows.insert(team, (row, record)).is_some() {
            return Err(SchemaError::DuplicateTeam {
                table: table.name().to_string(),
                team: team.to_string(),
            }
            .into());
        }
    }
    Ok(rows)
}

/// Leaderboard rows aggregating over every team, such as "League Average" or "Totals".
fn is_summary_row(name: &str) -> bool {
    let name = name.trim().to_ascii_lowercase();
    name.starts_with("league ")
        || name.starts_with("lg ")
        || matches!(name.as_str(), "league" | "average" | "avg" | "total" | "totals" | "tot")
}

/// Paths to a pair of leaderboard files captured on a given date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedSnapshot {
    pub date: NaiveDate,
    pub standard: PathBuf,
    pub advanced: PathBuf,
}

/// A directory of dated leaderboard captures, laid out as `<root>/<YYYY-MM-DD>/team_*.csv`.
#[derive(Debug, Clone)]
pub struct SnapshotArchive {
    root: PathBuf,
}
impl SnapshotArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds the most recent capture taken 1 to `days_back` days before `date`. A capture counts only
    /// when both leaderboards are present, under either their plain or date-suffixed names.
    pub fn locate(&self, date: NaiveDate, days_back: u64) -> Option<ArchivedSnapshot> {
        (1..=days_back)
            .filter_map(|offset| date.checked_sub_days(Days::new(offset)))
            .find_map(|prior| self.at(prior))
    }

    fn at(&self, date: NaiveDate) -> Option<ArchivedSnapshot> {
        let dir = self.root.join(date.format("%Y-%m-%d").to_string());
        let standard = find_capture(&dir, STANDARD_FILE_STEM, date)?;
        let advanced = find_capture(&dir, ADVANCED_FILE_STEM, date)?;
        Some(ArchivedSnapshot {
            date,
            standard,
            advanced,
        })
    }
}

fn find_capture(dir: &Path, stem: &str, date: NaiveDate) -> Option<PathBuf> {
    [
        format!("{stem}.csv"),
        format!("{stem}_{}.csv", date.format("%Y-%m-%d")),
    ]
    .into_iter()
    .map(|filename| dir.join(filename))
    .find(|path| path.is_file())
}
