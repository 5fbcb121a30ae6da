//! Fitting the over/under model to completed games.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, Seeded, StdRand};
use tracing::{debug, info};

use crate::boxscore::{Game, GameKey};
use crate::error::InputError;
use crate::forest::{ForestOptions, RandomForest};
use crate::form::FormTable;
use crate::metrics::ClassificationReport;
use crate::model::{OverModel, DEFAULT_LINE};
use crate::predict::{game_features, StatsSource};
use crate::scaler::StandardScaler;

/// Labelled feature rows, one per completed game with stats for both teams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub keys: Vec<GameKey>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
    /// Completed games left out for want of stats.
    pub skipped: usize,
}
impl TrainingSet {
    pub fn build<'g>(
        games: impl IntoIterator<Item = &'g Game>,
        stats: &mut impl StatsSource,
        form: &FormTable,
        line: f64,
    ) -> Result<Self, InputError> {
        let mut set = Self::default();
        for game in games {
            let Ok(label) = game.label(line) else {
                continue;
            };
            match game_features(stats, form, game)? {
                Ok(features) => {
                    set.keys.push(game.key());
                    set.rows.push(features.as_slice().to_vec());
                    set.labels.push(label);
                }
                Err(reason) => {
                    debug!("leaving out {}: {reason}", game.key());
                    set.skipped += 1;
                }
            }
        }
        info!(
            "training set: {} games ({} over, {} under), {} left out for want of stats",
            set.len(),
            set.overs(),
            set.len() - set.overs(),
            set.skipped
        );
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn overs(&self) -> usize {
        self.labels.iter().filter(|&&label| label).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub line: f64,
    pub test_fraction: f64,
    pub seed: u64,
    pub forest: ForestOptions,
}
impl TrainOptions {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            bail!("test fraction must lie in [0, 1)");
        }
        if !self.line.is_finite() {
            bail!("line must be finite");
        }
        if self.seed != self.forest.seed {
            bail!(
                "split seed {} must equal forest seed {}",
                self.seed,
                self.forest.seed
            );
        }
        self.forest.validate()
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            line: DEFAULT_LINE,
            test_fraction: 0.2,
            seed: 42,
            forest: ForestOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: OverModel,
    pub report: ClassificationReport,
    /// Feature names with their importances, most important first.
    pub importances: Vec<(String, f64)>,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// Shuffles `0..samples` and holds out `ceil(samples * test_fraction)` of them, returning the
/// training and test indices.
pub fn split(samples: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<_> = (0..samples).collect();
    let mut rand = StdRand::seed(seed);
    for i in (1..samples).rev() {
        let j = (rand.next_u64() % (i as u64 + 1)) as usize;
        indices.swap(i, j);
    }
    let test = ((samples as f64 * test_fraction).ceil() as usize).min(samples);
    let train = indices.split_off(test);
    (train, indices)
}

/// Fits the scaler and forest on the training partition and scores the held-out partition.
pub fn train(set: &TrainingSet, options: &TrainOptions) -> Result<TrainOutcome, anyhow::Error> {
    options.validate()?;
    if set.len() < 2 {
        bail!("at least 2 labelled games are needed, got {}", set.len());
    }
    let overs = set.overs();
    if overs == 0 || overs == set.len() {
        bail!("every labelled game falls on the same side of the line");
    }

    let (train_indices, test_indices) = split(set.len(), options.test_fraction, options.seed);
    if train_indices.is_empty() {
        bail!("no games left to train on");
    }
    let train_rows: Vec<_> = train_indices.iter().map(|&index| set.rows[index].clone()).collect();
    let train_labels: Vec<_> = train_indices.iter().map(|&index| set.labels[index]).collect();

    let scaler = StandardScaler::fit(&train_rows)?;
    let scaled = train_rows
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<Vec<_>, _>>()?;
    let forest = RandomForest::fit(&scaled, &train_labels, &options.forest)?;
    let model = OverModel::new(scaler, forest, options.line);

    let mut actual = Vec::with_capacity(test_indices.len());
    let mut predicted = Vec::with_capacity(test_indices.len());
    for &index in &test_indices {
        actual.push(set.labels[index]);
        predicted.push(model.predict(&set.rows[index])?);
    }
    let report = ClassificationReport::compute(&actual, &predicted);

    let mut importances: Vec<_> = model
        .schema
        .names()
        .iter()
        .cloned()
        .zip(model.forest.feature_importances().iter().copied())
        .collect();
    importances.sort_by(|a, b| b.1.total_cmp(&a.1));

    info!(
        "trained on {} games, held out {}, accuracy {:.4}",
        train_indices.len(),
        test_indices.len(),
        report.accuracy
    );
    Ok(TrainOutcome {
        model,
        report,
        importances,
        train_samples: train_indices.len(),
        test_samples: test_indices.len(),
    })
}
