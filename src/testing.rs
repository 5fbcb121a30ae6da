//! Testing helpers.

use std::fs;
use std::path::PathBuf;

use assert_float_eq::*;
use chrono::NaiveDate;
use strum::EnumCount;

use crate::boxscore::{Game, InningScore, FIRST_FIVE, INNINGS};
use crate::features::FeatureVector;
use crate::forest::{ForestOptions, RandomForest};
use crate::model::{OverModel, DEFAULT_LINE};
use crate::scaler::StandardScaler;
use crate::stats::{Stat, TeamSeasonStats};
use crate::team::Team;

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn team(code: &str) -> Team {
    Team::from_name(code).unwrap()
}

/// A completed game with the given first-five innings and a scoreless 6th–9th.
pub fn game(date_str: &str, home: &str, away: &str, away_runs: [u8; FIRST_FIVE], home_runs: [u8; FIRST_FIVE]) -> Game {
    let mut away_innings = [InningScore::Runs(0); INNINGS];
    let mut home_innings = [InningScore::Runs(0); INNINGS];
    for inning in 0..FIRST_FIVE {
        away_innings[inning] = InningScore::Runs(away_runs[inning]);
        home_innings[inning] = InningScore::Runs(home_runs[inning]);
    }
    Game {
        date: date(date_str),
        home: team(home),
        away: team(away),
        away_innings,
        home_innings,
    }
}

/// A completed game whose first-five total is `runs`, all scored by the away side in the 1st.
pub fn game_with_total(date_str: &str, home: &str, away: &str, runs: u8) -> Game {
    game(date_str, home, away, [runs, 0, 0, 0, 0], [0; FIRST_FIVE])
}

pub fn pending_game(date_str: &str, home: &str, away: &str) -> Game {
    Game {
        date: date(date_str),
        home: team(home),
        away: team(away),
        away_innings: [InningScore::Pending; INNINGS],
        home_innings: [InningScore::Pending; INNINGS],
    }
}

/// Plausible season stats scaled by `strength`, so that stronger offences score higher on every metric
/// except strikeout rate.
pub fn stats(strength: f64) -> TeamSeasonStats {
    let mut values = [0.; Stat::COUNT];
    values[0] = 8. * strength;
    values[1] = 24. / strength;
    values[2] = 0.15 * strength;
    values[3] = 100. * strength;
    values[4] = 0.31 * strength;
    values[5] = 0.40 * strength;
    values[6] = 130. * strength;
    values[7] = 0.245 * strength;
    values[8] = 0.71 * strength;
    TeamSeasonStats::new(values)
}

/// A freshly emptied directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("firstfive_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Training rows in which the over is decided by the two form features alone.
pub fn toy_training_set() -> (Vec<Vec<f64>>, Vec<bool>) {
    let mut rows = vec![];
    let mut labels = vec![];
    for i in 0..200 {
        let (home_form, away_form) = ((i % 10) as f64, ((i * 7 + i / 10) % 10) as f64);
        let strength = 0.9 + (i / 50) as f64 * 0.05;
        let vector = FeatureVector::build(&stats(strength), &stats(1.1 - strength / 5.), Some(home_form), Some(away_form));
        rows.push(vector.as_slice().to_vec());
        labels.push(home_form + away_form > 9.);
    }
    (rows, labels)
}

pub fn toy_model() -> OverModel {
    let (rows, labels) = toy_training_set();
    let scaler = StandardScaler::fit(&rows).unwrap();
    let scaled: Vec<_> = rows.iter().map(|row| scaler.transform(row).unwrap()).collect();
    let forest = RandomForest::fit(&scaled, &labels, &ForestOptions { trees: 25, ..ForestOptions::default() }).unwrap();
    OverModel::new(scaler, forest, DEFAULT_LINE)
}
