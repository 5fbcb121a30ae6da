//! Per-game predictions over a box-score table, the derived bet and its dynamic confidence, and the
//! predictions CSV format.

use std::fmt::{Display, Formatter};
use std::io;
use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::boxscore::{parse_date, Game, GameKey};
use crate::csv::{cell, CsvWriter, Table};
use crate::error::InputError;
use crate::features::{FeatureMismatch, FeatureVector};
use crate::form::FormTable;
use crate::model::OverModel;
use crate::normal;
use crate::stats::{SnapshotArchive, StatsSnapshot};
use crate::team::{Team, UnknownTeamPolicy, UnrecognizedTeam};

/// Spread of the realised first-five total around the model total.
pub const CONFIDENCE_STD_DEV: f64 = 1.25;

pub const PREDICTION_COLUMNS: usize = 9;

pub const PREDICTION_HEADER: [&str; PREDICTION_COLUMNS] = [
    "Game_Date",
    "Home_Team",
    "Away_Team",
    "Predicted_Over_4_5",
    "Actual_Over_4_5",
    "Runs_1_5",
    "Confidence",
    "Model_Total",
    "is_pending",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Over,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bet {
    pub side: Side,
    pub line: f64,
}
impl Bet {
    /// Backs the over when the model total is strictly above the line.
    pub fn derive(model_total: f64, line: f64) -> Self {
        let side = if model_total > line { Side::Over } else { Side::Under };
        Self { side, line }
    }

    pub fn dynamic_confidence(&self, model_total: f64, std_dev: f64) -> f64 {
        dynamic_confidence(model_total, self.line, self.side, std_dev)
    }

    pub fn wins(&self, runs_1_5: f64) -> bool {
        match self.side {
            Side::Over => runs_1_5 > self.line,
            Side::Under => runs_1_5 <= self.line,
        }
    }
}

impl Display for Bet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let side = match self.side {
            Side::Over => "OVER",
            Side::Under => "UNDER",
        };
        write!(f, "{side} {}", self.line)
    }
}

/// Probability that the realised total lands on the backed side of `line`, taking the total as
/// normally distributed about `model_total`.
pub fn dynamic_confidence(model_total: f64, line: f64, side: Side, std_dev: f64) -> f64 {
    let below = normal::cdf(line, model_total, std_dev);
    match side {
        Side::Over => 1. - below,
        Side::Under => below,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub date: NaiveDate,
    pub home: Team,
    pub away: Team,
    pub predicted_over: bool,
    pub actual_over: Option<bool>,
    pub runs_1_5: Option<f64>,
    pub confidence: f64,
    pub model_total: f64,
    pub is_pending: bool,
}
impl Prediction {
    pub fn key(&self) -> GameKey {
        GameKey {
            date: self.date,
            home: self.home,
            away: self.away,
        }
    }

    pub fn bet(&self, line: f64) -> Bet {
        Bet::derive(self.model_total, line)
    }

    pub fn to_record(&self) -> [String; PREDICTION_COLUMNS] {
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.home.to_string(),
            self.away.to_string(),
            format_flag(self.predicted_over),
            self.actual_over.map(format_flag).unwrap_or_default(),
            self.runs_1_5.map(|runs| format!("{runs:.1}")).unwrap_or_default(),
            format!("{:.4}", self.confidence),
            format!("{:.2}", self.model_total),
            if self.is_pending { "True" } else { "False" }.to_string(),
        ]
    }
}

fn format_flag(flag: bool) -> String {
    if flag { "1" } else { "0" }.to_string()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

/// A row of a predictions table. Rows naming a team outside the normalisation map are kept with
/// their cells as read.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRow {
    Resolved(Prediction),
    Unresolved {
        /// Cells under [PREDICTION_HEADER]; absent columns are blank.
        record: [String; PREDICTION_COLUMNS],
        team: UnrecognizedTeam,
    },
}
impl PredictionRow {
    pub fn to_record(&self) -> [String; PREDICTION_COLUMNS] {
        match self {
            PredictionRow::Resolved(prediction) => prediction.to_record(),
            PredictionRow::Unresolved { record, .. } => record.clone(),
        }
    }

    pub fn resolved(&self) -> Option<&Prediction> {
        match self {
            PredictionRow::Resolved(prediction) => Some(prediction),
            PredictionRow::Unresolved { .. } => None,
        }
    }
}

pub fn write_predictions(path: impl AsRef<Path>, predictions: &[Prediction]) -> Result<(), ::csv::Error> {
    write_records(path.as_ref(), predictions.iter().map(Prediction::to_record))
}

pub fn write_prediction_rows(path: impl AsRef<Path>, rows: &[PredictionRow]) -> Result<(), ::csv::Error> {
    write_records(path.as_ref(), rows.iter().map(PredictionRow::to_record))
}

fn write_records(
    path: &Path,
    records: impl IntoIterator<Item = [String; PREDICTION_COLUMNS]>,
) -> Result<(), ::csv::Error> {
    crate::file::ensure_parent_dir(path)?;
    write_records_to(CsvWriter::create(path)?, records)?;
    Ok(())
}

pub fn write_predictions_to<W: io::Write>(
    writer: CsvWriter<W>,
    predictions: &[Prediction],
) -> Result<W, ::csv::Error> {
    write_records_to(writer, predictions.iter().map(Prediction::to_record))
}

pub fn write_prediction_rows_to<W: io::Write>(
    writer: CsvWriter<W>,
    rows: &[PredictionRow],
) -> Result<W, ::csv::Error> {
    write_records_to(writer, rows.iter().map(PredictionRow::to_record))
}

fn write_records_to<W: io::Write>(
    mut writer: CsvWriter<W>,
    records: impl IntoIterator<Item = [String; PREDICTION_COLUMNS]>,
) -> Result<W, ::csv::Error> {
    writer.append(PREDICTION_HEADER)?;
    for record in records {
        writer.append(record)?;
    }
    Ok(writer.into_inner()?)
}

pub fn read_predictions(path: impl AsRef<Path>, policy: UnknownTeamPolicy) -> Result<Vec<Prediction>, InputError> {
    parse_predictions(Table::read(path)?, policy)
}

pub fn read_prediction_rows(path: impl AsRef<Path>) -> Result<Vec<PredictionRow>, InputError> {
    parse_prediction_rows(Table::read(path)?)
}

/// Reads a predictions table, dropping or halting on rows with unrecognised teams as `policy`
/// directs.
pub fn parse_predictions(table: Table, policy: UnknownTeamPolicy) -> Result<Vec<Prediction>, InputError> {
    let name = table.name().to_string();
    let mut predictions = vec![];
    for row in parse_prediction_rows(table)? {
        match (row, policy) {
            (PredictionRow::Resolved(prediction), _) => predictions.push(prediction),
            (PredictionRow::Unresolved { team, .. }, UnknownTeamPolicy::Skip) => {
                warn!("{name}: skipping row: {team}");
            }
            (PredictionRow::Unresolved { team, .. }, UnknownTeamPolicy::Halt) => return Err(team.into()),
        }
    }
    Ok(predictions)
}

/// Reads every row of a predictions table. `Date`, `Home` and `Away` are accepted in place of the
/// standard key columns; the outcome columns and `is_pending` may be absent.
pub fn parse_prediction_rows(mut table: Table) -> Result<Vec<PredictionRow>, InputError> {
    table.alias("Date", "Game_Date");
    table.alias("Home", "Home_Team");
    table.alias("Away", "Away_Team");
    let date_col = table.require("Game_Date")?;
    let home_col = table.require("Home_Team")?;
    let away_col = table.require("Away_Team")?;
    let predicted_col = table.require("Predicted_Over_4_5")?;
    let confidence_col = table.require("Confidence")?;
    let total_col = table.require("Model_Total")?;
    let actual_col = table.column("Actual_Over_4_5");
    let runs_col = table.column("Runs_1_5");
    let pending_col = table.column("is_pending");
    let header_cols = PREDICTION_HEADER.map(|column| table.column(column));

    let mut rows = Vec::with_capacity(table.len());
    for (row, record) in table.rows() {
        let date_str = cell(record, date_col);
        let date = parse_date(date_str).ok_or_else(|| table.invalid("Game_Date", date_str, row))?;
        let teams = Team::from_name(cell(record, home_col))
            .and_then(|home| Team::from_name(cell(record, away_col)).map(|away| (home, away)));
        let (home, away) = match teams {
            Ok(teams) => teams,
            Err(team) => {
                let mut cells = header_cols.map(|col| col.map(|col| cell(record, col).to_string()).unwrap_or_default());
                cells[0] = date.format("%Y-%m-%d").to_string();
                rows.push(PredictionRow::Unresolved { record: cells, team });
                continue;
            }
        };

        let required_flag = |column: &str, col: usize| {
            let raw = cell(record, col);
            parse_flag(raw).ok_or_else(|| table.invalid(column, raw, row))
        };
        let required_number = |column: &str, col: usize| {
            let raw = cell(record, col);
            raw.parse::<f64>().ok().ok_or_else(|| table.invalid(column, raw, row))
        };
        let optional = |col: Option<usize>| col.map(|col| cell(record, col)).filter(|raw| !raw.is_empty());

        let actual_over = match optional(actual_col) {
            Some(raw) => Some(parse_flag(raw).ok_or_else(|| table.invalid("Actual_Over_4_5", raw, row))?),
            None => None,
        };
        let runs_1_5 = match optional(runs_col) {
            Some(raw) => Some(raw.parse::<f64>().map_err(|_| table.invalid("Runs_1_5", raw, row))?),
            None => None,
        };
        let is_pending = match optional(pending_col) {
            Some(raw) => parse_flag(raw).ok_or_else(|| table.invalid("is_pending", raw, row))?,
            None => false,
        };
        rows.push(PredictionRow::Resolved(Prediction {
            date,
            home,
            away,
            predicted_over: required_flag("Predicted_Over_4_5", predicted_col)?,
            actual_over,
            runs_1_5: runs_1_5.filter(|runs| runs.is_finite()),
            confidence: required_number("Confidence", confidence_col)?,
            model_total: required_number("Model_Total", total_col)?,
            is_pending,
        }));
    }
    debug!("{}: read {} prediction rows", table.name(), rows.len());
    Ok(rows)
}

/// Supplies the stats snapshot in force for a game date.
pub trait StatsSource {
    fn snapshot_for(&mut self, date: NaiveDate) -> Result<Option<Rc<StatsSnapshot>>, InputError>;
}

/// The same snapshot for every date.
#[derive(Debug, Clone)]
pub struct FixedStats(Rc<StatsSnapshot>);
impl FixedStats {
    pub fn new(snapshot: StatsSnapshot) -> Self {
        Self(Rc::new(snapshot))
    }
}

impl StatsSource for FixedStats {
    fn snapshot_for(&mut self, _: NaiveDate) -> Result<Option<Rc<StatsSnapshot>>, InputError> {
        Ok(Some(self.0.clone()))
    }
}

/// The most recent archived capture taken a few days before each game date.
#[derive(Debug)]
pub struct ArchivedStats {
    archive: SnapshotArchive,
    days_back: u64,
    policy: UnknownTeamPolicy,
    cache: FxHashMap<NaiveDate, Rc<StatsSnapshot>>,
}
impl ArchivedStats {
    pub fn new(archive: SnapshotArchive, days_back: u64, policy: UnknownTeamPolicy) -> Self {
        Self {
            archive,
            days_back,
            policy,
            cache: FxHashMap::default(),
        }
    }
}

impl StatsSource for ArchivedStats {
    fn snapshot_for(&mut self, date: NaiveDate) -> Result<Option<Rc<StatsSnapshot>>, InputError> {
        let Some(located) = self.archive.locate(date, self.days_back) else {
            return Ok(None);
        };
        if let Some(snapshot) = self.cache.get(&located.date) {
            return Ok(Some(snapshot.clone()));
        }
        debug!("loading archived stats from {}", located.standard.display());
        let snapshot = Rc::new(StatsSnapshot::read(&located.standard, &located.advanced, self.policy)?);
        self.cache.insert(located.date, snapshot.clone());
        Ok(Some(snapshot))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSnapshot,
    MissingStats(Team),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoSnapshot => write!(f, "no stats snapshot"),
            SkipReason::MissingStats(team) => write!(f, "no stats for {team}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedGame {
    pub key: GameKey,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionBatch {
    pub predictions: Vec<Prediction>,
    pub skipped: Vec<SkippedGame>,
}
impl PredictionBatch {
    /// Fraction of played games whose predicted label matches the outcome.
    pub fn accuracy(&self) -> Option<f64> {
        let (played, correct) = self
            .predictions
            .iter()
            .filter_map(|prediction| prediction.actual_over.map(|actual| actual == prediction.predicted_over))
            .fold((0, 0), |(played, correct), hit| (played + 1, correct + hit as usize));
        if played == 0 {
            None
        } else {
            Some(correct as f64 / played as f64)
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    Input(#[from] InputError),

    #[error("{0}")]
    FeatureMismatch(#[from] FeatureMismatch),
}

/// Builds the features for a game from the stats in force on its date and each team's form going
/// into it, or gives the reason it cannot be built.
pub fn game_features(
    stats: &mut impl StatsSource,
    form: &FormTable,
    game: &Game,
) -> Result<Result<FeatureVector, SkipReason>, InputError> {
    let Some(snapshot) = stats.snapshot_for(game.date)? else {
        return Ok(Err(SkipReason::NoSnapshot));
    };
    let Some(home) = snapshot.get(game.home) else {
        return Ok(Err(SkipReason::MissingStats(game.home)));
    };
    let Some(away) = snapshot.get(game.away) else {
        return Ok(Err(SkipReason::MissingStats(game.away)));
    };
    Ok(Ok(FeatureVector::build(
        home,
        away,
        form.form_before(game.home, game.date),
        form.form_before(game.away, game.date),
    )))
}

pub struct PredictionEngine<'a, S: StatsSource> {
    model: &'a OverModel,
    form: &'a FormTable,
    stats: S,
}
impl<'a, S: StatsSource> PredictionEngine<'a, S> {
    pub fn new(model: &'a OverModel, form: &'a FormTable, stats: S) -> Self {
        Self { model, form, stats }
    }

    pub fn features(&mut self, game: &Game) -> Result<Result<FeatureVector, SkipReason>, InputError> {
        game_features(&mut self.stats, self.form, game)
    }

    /// Predicts every game that has stats for both teams, skipping and logging the rest.
    pub fn predict<'g>(&mut self, games: impl IntoIterator<Item = &'g Game>) -> Result<PredictionBatch, PredictError> {
        let mut batch = PredictionBatch::default();
        for game in games {
            let features = match self.features(game)? {
                Ok(features) => features,
                Err(reason) => {
                    debug!("skipping {}: {reason}", game.key());
                    batch.skipped.push(SkippedGame {
                        key: game.key(),
                        reason,
                    });
                    continue;
                }
            };
            let assessment = self.model.assess(features.as_slice())?;
            let is_pending = game.is_pending();
            let runs_1_5 = if is_pending { None } else { game.runs_1_5() };
            batch.predictions.push(Prediction {
                date: game.date,
                home: game.home,
                away: game.away,
                predicted_over: assessment.over,
                actual_over: game.actual_over(self.model.line),
                runs_1_5: runs_1_5.map(f64::from),
                confidence: assessment.confidence,
                model_total: assessment.model_total,
                is_pending,
            });
        }
        if !batch.skipped.is_empty() {
            info!("skipped {} games lacking stats", batch.skipped.len());
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests;
