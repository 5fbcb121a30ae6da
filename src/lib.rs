//! Over/under modelling of first-five-innings run totals in Major League Baseball.
//! Builds per-game features from team season stats and recent scoring form, fits a random forest
//! classifier, and produces, backfills, settles and evaluates daily predictions.

#![allow(clippy::too_many_arguments)]

pub mod boxscore;
pub mod config;
pub mod csv;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod file;
pub mod forest;
pub mod form;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod normal;
pub mod predict;
pub mod print;
pub mod scaler;
pub mod stats;
pub mod team;
pub mod train;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
