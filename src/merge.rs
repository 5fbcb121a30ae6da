//! Joins predictions to the realised first-five totals of games already played.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::boxscore::{Game, GameKey};
use crate::predict::{Prediction, PredictionRow};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome<P = Prediction> {
    /// Every prediction, in input order, with outcome columns taken from the box scores.
    pub merged: Vec<P>,
    /// Predictions for which no outcome was found.
    pub unmatched: Vec<P>,
}

impl<P> Default for MergeOutcome<P> {
    fn default() -> Self {
        Self {
            merged: vec![],
            unmatched: vec![],
        }
    }
}

/// Realised first-five totals keyed by game, over completed games dated before `today`. Where a
/// key repeats, the first game wins.
pub fn outcomes(games: &[Game], today: NaiveDate) -> FxHashMap<GameKey, u32> {
    let mut outcomes = FxHashMap::default();
    for game in games.iter().filter(|game| game.date < today && !game.is_pending()) {
        let Some(runs) = game.runs_1_5() else {
            continue;
        };
        if outcomes.contains_key(&game.key()) {
            warn!("duplicate box score for {}; keeping the first", game.key());
            continue;
        }
        outcomes.insert(game.key(), runs);
    }
    outcomes
}

/// Left-joins `predictions` to the box scores on (date, home, away). Any outcome already carried by a
/// prediction is discarded.
pub fn merge(predictions: &[Prediction], games: &[Game], today: NaiveDate, line: f64) -> MergeOutcome {
    let outcomes = outcomes(games, today);
    debug!("{} outcomes available before {today}", outcomes.len());
    let mut joined = MergeOutcome::default();
    for prediction in predictions {
        let mut prediction = prediction.clone();
        if !settle(&mut prediction, &outcomes, line) {
            joined.unmatched.push(prediction.clone());
        }
        joined.merged.push(prediction);
    }
    log_outcome(&joined);
    joined
}

/// As [merge], over rows that may name unrecognised teams. Such rows cannot match a game; they are
/// carried through with blank outcome cells and also reported as unmatched.
pub fn merge_rows(
    rows: &[PredictionRow],
    games: &[Game],
    today: NaiveDate,
    line: f64,
) -> MergeOutcome<PredictionRow> {
    let outcomes = outcomes(games, today);
    debug!("{} outcomes available before {today}", outcomes.len());
    let mut joined = MergeOutcome::default();
    for row in rows {
        let row = match row {
            PredictionRow::Resolved(prediction) => {
                let mut prediction = prediction.clone();
                let matched = settle(&mut prediction, &outcomes, line);
                let row = PredictionRow::Resolved(prediction);
                if !matched {
                    joined.unmatched.push(row.clone());
                }
                row
            }
            PredictionRow::Unresolved { record, team } => {
                warn!("cannot match the {} prediction: {team}", record[0]);
                let mut record = record.clone();
                record[ACTUAL_COLUMN].clear();
                record[RUNS_COLUMN].clear();
                let row = PredictionRow::Unresolved {
                    record,
                    team: team.clone(),
                };
                joined.unmatched.push(row.clone());
                row
            }
        };
        joined.merged.push(row);
    }
    log_outcome(&joined);
    joined
}

const ACTUAL_COLUMN: usize = 4;
const RUNS_COLUMN: usize = 5;

/// Fills the outcome of `prediction` from `outcomes`, or clears it if there is none. Returns whether
/// an outcome was found.
fn settle(prediction: &mut Prediction, outcomes: &FxHashMap<GameKey, u32>, line: f64) -> bool {
    match outcomes.get(&prediction.key()) {
        Some(&runs) => {
            let runs = f64::from(runs);
            prediction.runs_1_5 = Some(runs);
            prediction.actual_over = Some(runs > line);
            prediction.is_pending = false;
            true
        }
        None => {
            prediction.runs_1_5 = None;
            prediction.actual_over = None;
            false
        }
    }
}

fn log_outcome<P>(joined: &MergeOutcome<P>) {
    info!(
        "merged {} predictions, {} missing first-five totals",
        joined.merged.len(),
        joined.unmatched.len()
    );
}
