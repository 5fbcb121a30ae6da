//! Locations and tunables shared by the pipeline stages.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluate::EvaluateOptions;
use crate::file::FromJsonFile;
use crate::form::FORM_WINDOW;
use crate::predict::CONFIDENCE_STD_DEV;
use crate::team::UnknownTeamPolicy;
use crate::train::TrainOptions;

pub const DEFAULT_CONFIG: &str = "config/firstfive.json";
pub const DEFAULT_ARCHIVE_DAYS_BACK: u64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub box_scores: PathBuf,
    pub standard_stats: PathBuf,
    pub advanced_stats: PathBuf,
    pub archive: PathBuf,
    pub model: PathBuf,
    pub predictions: PathBuf,
    pub backfilled_predictions: PathBuf,
    pub merged_predictions: PathBuf,
    pub unmatched: PathBuf,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            box_scores: "data/mlb_boxscores_full.csv".into(),
            standard_stats: "downloads/team_standard.csv".into(),
            advanced_stats: "downloads/team_advanced.csv".into(),
            archive: "downloads/archive".into(),
            model: "models/over_4_5.model.json".into(),
            predictions: "data/mlb_predictions.csv".into(),
            backfilled_predictions: "data/mlb_backfilled_predictions.csv".into(),
            merged_predictions: "data/mlb_predictions_merged.csv".into(),
            unmatched: "data/unmatched_rows.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: Paths,
    pub form_window: usize,
    pub archive_days_back: u64,
    pub confidence_std_dev: f64,
    pub miss_confidence: f64,
    /// Fail a stage on an unrecognised team name, rather than skipping the row.
    pub strict_teams: bool,
    pub train: TrainOptions,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: Paths::default(),
            form_window: FORM_WINDOW,
            archive_days_back: DEFAULT_ARCHIVE_DAYS_BACK,
            confidence_std_dev: CONFIDENCE_STD_DEV,
            miss_confidence: EvaluateOptions::default().miss_confidence,
            strict_teams: false,
            train: TrainOptions::default(),
        }
    }
}
impl PipelineConfig {
    /// Reads the config from `path` if given; otherwise from the default location if that exists, or
    /// else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => Self::read(Path::new(DEFAULT_CONFIG))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, anyhow::Error> {
        debug!("reading config from {}", path.display());
        Self::from_json_file(path).with_context(|| format!("reading config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.form_window == 0 {
            bail!("form window must be positive");
        }
        if self.archive_days_back == 0 {
            bail!("archive lookback must be at least one day");
        }
        if !(self.confidence_std_dev > 0.) {
            bail!("confidence standard deviation must be positive");
        }
        self.train.validate()
    }

    pub fn line(&self) -> f64 {
        self.train.line
    }

    pub fn team_policy(&self) -> UnknownTeamPolicy {
        if self.strict_teams {
            UnknownTeamPolicy::Halt
        } else {
            UnknownTeamPolicy::Skip
        }
    }

    pub fn evaluate_options(&self) -> EvaluateOptions {
        EvaluateOptions {
            line: self.line(),
            std_dev: self.confidence_std_dev,
            miss_confidence: self.miss_confidence,
        }
    }
}
