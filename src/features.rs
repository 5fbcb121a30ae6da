//! The fixed-order feature vector describing a matchup.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use thiserror::Error;

use crate::stats::{Stat, TeamSeasonStats};

pub const FEATURES: usize = 2 * Stat::COUNT + 2;
pub const HOME_FORM: &str = "Home_Last7_Runs_1_5";
pub const AWAY_FORM: &str = "Away_Last7_Runs_1_5";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureMismatch {
    #[error("expected {expected} features, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("feature {index} should be '{expected}', got '{actual}'")]
    Name {
        index: usize,
        expected: String,
        actual: String,
    },
}

/// `[home stats, away stats, home form, away form]`, with stats in [`Stat`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURES]);
impl FeatureVector {
    /// Missing form and non-finite values are encoded as zero.
    pub fn build(
        home: &TeamSeasonStats,
        away: &TeamSeasonStats,
        home_form: Option<f64>,
        away_form: Option<f64>,
    ) -> Self {
        let mut values = [0.; FEATURES];
        let (home_values, rest) = values.split_at_mut(Stat::COUNT);
        let (away_values, forms) = rest.split_at_mut(Stat::COUNT);
        home_values.copy_from_slice(home.values());
        away_values.copy_from_slice(away.values());
        forms[0] = home_form.unwrap_or_default();
        forms[1] = away_form.unwrap_or_default();
        for value in &mut values {
            if !value.is_finite() {
                *value = 0.;
            }
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<[f64; FEATURES]> for FeatureVector {
    fn from(values: [f64; FEATURES]) -> Self {
        Self(values)
    }
}

/// Names of the features a model was fitted on, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}
impl FeatureSchema {
    pub fn current() -> Self {
        let mut names = Vec::with_capacity(FEATURES);
        for side in ["home", "away"] {
            names.extend(Stat::iter().map(|stat| format!("{side}_{}", stat.column())));
        }
        names.push(HOME_FORM.to_string());
        names.push(AWAY_FORM.to_string());
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn check_len(&self, actual: usize) -> Result<(), FeatureMismatch> {
        if actual != self.len() {
            return Err(FeatureMismatch::Length {
                expected: self.len(),
                actual,
            });
        }
        Ok(())
    }

    /// Verifies that `other` names the same features in the same order.
    pub fn check(&self, other: &FeatureSchema) -> Result<(), FeatureMismatch> {
        self.check_len(other.len())?;
        match self
            .names
            .iter()
            .zip(&other.names)
            .enumerate()
            .find(|(_, (expected, actual))| expected != actual)
        {
            None => Ok(()),
            Some((index, (expected, actual))) => Err(FeatureMismatch::Name {
                index,
                expected: expected.clone(),
                actual: actual.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::stats;

    use super::*;

    #[test]
    fn schema_names_and_order() {
        let schema = FeatureSchema::current();
        assert_eq!(FEATURES, schema.len());
        assert_eq!(20, schema.len());
        assert_eq!("home_BB%", schema.names()[0]);
        assert_eq!("home_OPS", schema.names()[8]);
        assert_eq!("away_BB%", schema.names()[9]);
        assert_eq!("away_wRC+", schema.names()[12]);
        assert_eq!("away_OPS", schema.names()[17]);
        assert_eq!(HOME_FORM, schema.names()[18]);
        assert_eq!(AWAY_FORM, schema.names()[19]);
    }

    #[test]
    fn build_layout() {
        let home = stats(1.);
        let away = stats(2.);
        let vector = FeatureVector::build(&home, &away, Some(4.5), Some(5.5));
        let values = vector.as_slice();
        assert_eq!(FEATURES, values.len());
        assert_eq!(home.values(), &values[..9]);
        assert_eq!(away.values(), &values[9..18]);
        assert_eq!(4.5, values[18]);
        assert_eq!(5.5, values[19]);
        assert_eq!(vector, FeatureVector::build(&home, &away, Some(4.5), Some(5.5)));
    }

    #[test]
    fn missing_and_non_finite_become_zero() {
        let mut values = *stats(1.).values();
        values[3] = f64::NAN;
        let home = TeamSeasonStats::new(values);
        let vector = FeatureVector::build(&home, &stats(1.), None, Some(f64::INFINITY));
        assert_eq!(0., vector.as_slice()[3]);
        assert_eq!(0., vector.as_slice()[18]);
        assert_eq!(0., vector.as_slice()[19]);
    }

    #[test]
    fn check_schema() {
        let current = FeatureSchema::current();
        assert_eq!(Ok(()), current.check(&FeatureSchema::current()));

        let mut truncated = FeatureSchema::current();
        truncated.names.pop();
        assert_eq!(
            Err(FeatureMismatch::Length { expected: 20, actual: 19 }),
            current.check(&truncated)
        );

        let mut reordered = FeatureSchema::current();
        reordered.names.swap(0, 1);
        assert_eq!(
            Err(FeatureMismatch::Name {
                index: 0,
                expected: "home_BB%".into(),
                actual: "home_K%".into()
            }),
            current.check(&reordered)
        );
    }
}
