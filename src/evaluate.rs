//! Scoring settled predictions: bet accuracy overall and by confidence tier, flat-stake profit, and
//! how well the model total tracks the realised first-five total.

use anyhow::bail;
use chrono::NaiveDate;
use linregress::fit_low_level_regression_model;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};
use tracing::{debug, warn};

use crate::model::DEFAULT_LINE;
use crate::predict::{Bet, Prediction, CONFIDENCE_STD_DEV};

/// Lower confidence bounds of tiers 2 to 5.
pub const TIER_CUTS: [f64; 4] = [0.6, 0.7, 0.8, 0.9];
pub const TIERS: usize = TIER_CUTS.len() + 1;

/// Winnings of a winning flat-stake bet.
pub const STAKE_WIN: f64 = 100.;
/// Stake lost on a losing bet when the classifier labelled the game over.
pub const OVER_LOSS: f64 = -110.;
/// Stake lost on a losing bet when the classifier labelled the game under.
pub const UNDER_LOSS: f64 = -100.;

/// Confidence tier from 1 (below 0.6) to 5 (0.9 and above).
pub fn tier(confidence: f64) -> usize {
    1 + TIER_CUTS.iter().filter(|&&cut| confidence >= cut).count()
}

pub fn tier_label(tier: usize) -> String {
    "*".repeat(tier)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateOptions {
    pub line: f64,
    pub std_dev: f64,
    /// Losing bets at or above this confidence are listed as misses.
    pub miss_confidence: f64,
}
impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            line: DEFAULT_LINE,
            std_dev: CONFIDENCE_STD_DEV,
            miss_confidence: 0.85,
        }
    }
}

/// A prediction whose game has been played, with its bet settled.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub prediction: Prediction,
    pub runs_1_5: f64,
    pub bet: Bet,
    pub confidence: f64,
    pub correct: bool,
}
impl Settled {
    pub fn settle(prediction: &Prediction, options: &EvaluateOptions) -> Option<Self> {
        let runs_1_5 = prediction.runs_1_5?;
        let bet = prediction.bet(options.line);
        Some(Self {
            prediction: prediction.clone(),
            runs_1_5,
            bet,
            confidence: bet.dynamic_confidence(prediction.model_total, options.std_dev),
            correct: bet.wins(runs_1_5),
        })
    }

    /// The cost of a loss follows the classifier's label, not the side of the derived bet.
    pub fn profit(&self) -> f64 {
        match (self.correct, self.prediction.predicted_over) {
            (true, _) => STAKE_WIN,
            (false, true) => OVER_LOSS,
            (false, false) => UNDER_LOSS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tally {
    pub total: usize,
    pub correct: usize,
}
impl Tally {
    pub fn add(&mut self, correct: bool) {
        self.total += 1;
        self.correct += correct as usize;
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub tally: Tally,
    pub profit: f64,
    pub cumulative_profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub settled: Vec<Settled>,
    pub overall: Tally,
    /// Indexed by tier − 1.
    pub tiers: [Tally; TIERS],
    pub profit: f64,
    pub daily: Vec<DailySummary>,
    pub calibration: Option<Calibration>,
}
impl Evaluation {
    pub fn evaluate(predictions: &[Prediction], options: &EvaluateOptions) -> Self {
        let mut settled: Vec<_> = predictions
            .iter()
            .filter_map(|prediction| Settled::settle(prediction, options))
            .collect();
        settled.sort_by_key(|settled| settled.prediction.date);
        debug!("{} of {} predictions settled", settled.len(), predictions.len());

        let mut overall = Tally::default();
        let mut tiers = [Tally::default(); TIERS];
        let mut daily: Vec<DailySummary> = vec![];
        let mut profit = 0.;
        for settled in &settled {
            overall.add(settled.correct);
            tiers[tier(settled.confidence) - 1].add(settled.correct);
            profit += settled.profit();
            let date = settled.prediction.date;
            match daily.last_mut() {
                Some(day) if day.date == date => {
                    day.tally.add(settled.correct);
                    day.profit += settled.profit();
                    day.cumulative_profit = profit;
                }
                _ => {
                    let mut tally = Tally::default();
                    tally.add(settled.correct);
                    daily.push(DailySummary {
                        date,
                        tally,
                        profit: settled.profit(),
                        cumulative_profit: profit,
                    });
                }
            }
        }

        let points: Vec<_> = settled
            .iter()
            .map(|settled| (settled.prediction.model_total, settled.runs_1_5))
            .collect();
        let calibration = match Calibration::fit(&points) {
            Ok(calibration) => Some(calibration),
            Err(err) => {
                warn!("no calibration: {err}");
                None
            }
        };

        Self {
            settled,
            overall,
            tiers,
            profit,
            daily,
            calibration,
        }
    }

    /// Losing bets at or above the given confidence.
    pub fn misses(&self, min_confidence: f64) -> Vec<&Settled> {
        self.settled
            .iter()
            .filter(|settled| !settled.correct && settled.confidence >= min_confidence)
            .collect()
    }
}

/// Ordinary least squares fit of the realised first-five total against the model total.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub intercept: f64,
    pub slope: f64,
    pub std_errors: [f64; 2],
    pub p_values: [f64; 2],
    pub r_squared: f64,
    pub r_squared_adj: f64,
    pub samples: usize,
}
impl Calibration {
    /// Fits `runs_1_5 ~ 1 + model_total` over `(model_total, runs_1_5)` points.
    pub fn fit(points: &[(f64, f64)]) -> Result<Self, anyhow::Error> {
        if points.len() < 3 {
            bail!("at least 3 settled games are needed, got {}", points.len());
        }
        let mut data = Vec::with_capacity(points.len() * 3);
        for &(model_total, runs_1_5) in points {
            data.extend([runs_1_5, 1., model_total]);
        }
        let model = fit_low_level_regression_model(&data, points.len(), 3)?;
        let parameters = model.parameters();
        let std_errors = model.se();
        let p_values = model.p_values();
        Ok(Self {
            intercept: parameters[0],
            slope: parameters[1],
            std_errors: [std_errors[0], std_errors[1]],
            p_values: [p_values[0], p_values[1]],
            r_squared: model.rsquared(),
            r_squared_adj: model.rsquared_adj(),
            samples: points.len(),
        })
    }

    pub fn predict(&self, model_total: f64) -> f64 {
        self.intercept + self.slope * model_total
    }

    pub fn tabulate(&self) -> Table {
        let mut table = Table::default()
            .with_cols(vec![
                Col::new(Styles::default().with(MinWidth(12))),
                Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
            ])
            .with_row(Row::new(
                Styles::default().with(Header(true)),
                vec![
                    "Regressor".into(),
                    "Coefficient".into(),
                    "Std. error".into(),
                    "P-value".into(),
                ],
            ));
        for (index, (name, coefficient)) in [("Intercept", self.intercept), ("Model_Total", self.slope)]
            .into_iter()
            .enumerate()
        {
            table.push_row(Row::new(
                Styles::default(),
                vec![
                    name.into(),
                    format!("{coefficient:.6}").into(),
                    format!("{:.6}", self.std_errors[index]).into(),
                    format!("{:.6}", self.p_values[index]).into(),
                ],
            ));
        }
        table
    }
}

pub fn tabulate_tiers(tiers: &[Tally; TIERS]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(6))),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Tier".into(), "Total".into(), "Correct".into(), "Accuracy".into()],
        ));
    for (index, tally) in tiers.iter().enumerate().rev() {
        if tally.total == 0 {
            continue;
        }
        table.push_row(Row::new(
            Styles::default(),
            vec![
                tier_label(index + 1).into(),
                format!("{}", tally.total).into(),
                format!("{}", tally.correct).into(),
                format_accuracy(tally.accuracy()).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_misses(misses: &[&Settled]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(9))),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Date".into(),
                "Matchup".into(),
                "Bet".into(),
                "Confidence".into(),
                "Model total".into(),
                "Runs 1-5".into(),
            ],
        ));
    table.push_rows(misses.iter().map(|settled| {
        Row::new(
            Styles::default(),
            vec![
                format!("{}", settled.prediction.date).into(),
                format!("{} @ {}", settled.prediction.away, settled.prediction.home).into(),
                format!("{}", settled.bet).into(),
                format!("{:.4}", settled.confidence).into(),
                format!("{:.2}", settled.prediction.model_total).into(),
                format!("{:.1}", settled.runs_1_5).into(),
            ],
        )
    }));
    table
}

pub fn tabulate_daily(daily: &[DailySummary]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Date".into(),
                "Total".into(),
                "Correct".into(),
                "Accuracy".into(),
                "Profit".into(),
                "Cumulative".into(),
            ],
        ));
    table.push_rows(daily.iter().map(|day| {
        Row::new(
            Styles::default(),
            vec![
                format!("{}", day.date).into(),
                format!("{}", day.tally.total).into(),
                format!("{}", day.tally.correct).into(),
                format_accuracy(day.tally.accuracy()).into(),
                format!("{:.0}", day.profit).into(),
                format!("{:.0}", day.cumulative_profit).into(),
            ],
        )
    }));
    table
}

pub fn format_accuracy(accuracy: Option<f64>) -> String {
    accuracy.map_or_else(|| "-".to_string(), |accuracy| format!("{:.1}%", accuracy * 100.))
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use crate::predict::Side;
    use crate::team::Team;
    use crate::testing::date;

    use super::*;

    fn played(date_str: &str, model_total: f64, runs_1_5: Option<f64>) -> Prediction {
        Prediction {
            date: date(date_str),
            home: Team::Braves,
            away: Team::Mets,
            predicted_over: model_total > 3.,
            actual_over: runs_1_5.map(|runs| runs > 4.5),
            runs_1_5,
            confidence: 0.6,
            model_total,
            is_pending: runs_1_5.is_none(),
        }
    }

    #[test]
    fn tiers_by_confidence() {
        assert_eq!(1, tier(0.55));
        assert_eq!(2, tier(0.6));
        assert_eq!(3, tier(0.75));
        assert_eq!(4, tier(0.8));
        assert_eq!(5, tier(0.95));
        assert_eq!("***", tier_label(3));
    }

    #[test]
    fn settle_over_and_under() {
        let options = EvaluateOptions::default();
        let over = Settled::settle(&played("2025-05-01", 5.2, Some(6.)), &options).unwrap();
        assert_eq!(Side::Over, over.bet.side);
        assert!(over.correct);
        assert_float_absolute_eq!(0.7123, over.confidence, 1e-4);
        assert_eq!(STAKE_WIN, over.profit());

        let losing_over = Settled::settle(&played("2025-05-01", 5.2, Some(4.)), &options).unwrap();
        assert_eq!(OVER_LOSS, losing_over.profit());

        let losing_under = Settled::settle(&played("2025-05-01", 3.0, Some(5.)), &options).unwrap();
        assert_eq!(Side::Under, losing_under.bet.side);
        assert!(!losing_under.correct);
        assert_eq!(UNDER_LOSS, losing_under.profit());

        assert_eq!(None, Settled::settle(&played("2025-05-01", 3.0, None), &options));
    }

    #[test]
    fn loss_follows_the_predicted_label() {
        let options = EvaluateOptions::default();
        // labelled over, but the model total backs the under
        let labelled_over = Settled::settle(&played("2025-05-01", 4.0, Some(6.)), &options).unwrap();
        assert_eq!(Side::Under, labelled_over.bet.side);
        assert!(labelled_over.prediction.predicted_over);
        assert!(!labelled_over.correct);
        assert_eq!(OVER_LOSS, labelled_over.profit());

        let labelled_under = Prediction {
            predicted_over: false,
            ..played("2025-05-01", 5.2, Some(4.))
        };
        let labelled_under = Settled::settle(&labelled_under, &options).unwrap();
        assert_eq!(Side::Over, labelled_under.bet.side);
        assert!(!labelled_under.correct);
        assert_eq!(UNDER_LOSS, labelled_under.profit());
    }

    #[test]
    fn evaluation_summary() {
        let predictions = vec![
            played("2025-05-02", 5.2, Some(6.)),
            played("2025-05-01", 1.0, Some(2.)),
            played("2025-05-01", 5.9, Some(3.)),
            played("2025-05-02", 3.0, Some(4.)),
            played("2025-05-03", 4.0, None),
        ];
        let evaluation = Evaluation::evaluate(&predictions, &EvaluateOptions::default());
        assert_eq!(4, evaluation.settled.len());
        assert_eq!(Tally { total: 4, correct: 3 }, evaluation.overall);
        assert_eq!(Some(0.75), evaluation.overall.accuracy());
        assert_eq!(3. * STAKE_WIN + OVER_LOSS, evaluation.profit);
        assert_eq!(4, evaluation.tiers.iter().map(|tally| tally.total).sum::<usize>());

        assert_eq!(2, evaluation.daily.len());
        assert_eq!(date("2025-05-01"), evaluation.daily[0].date);
        assert_eq!(Tally { total: 2, correct: 1 }, evaluation.daily[0].tally);
        assert_eq!(STAKE_WIN + OVER_LOSS, evaluation.daily[0].cumulative_profit);
        assert_eq!(evaluation.profit, evaluation.daily[1].cumulative_profit);

        // model total 5.9 over 4.5: Φ(1.12)
        let misses = evaluation.misses(0.85);
        assert_eq!(1, misses.len());
        assert_eq!(5.9, misses[0].prediction.model_total);

        assert!(evaluation.calibration.is_some());
    }

    #[test]
    fn calibration_recovers_a_linear_relationship() {
        let points: Vec<_> = (0..20)
            .map(|i| {
                let model_total = i as f64 * 0.3;
                let noise = if i % 2 == 0 { 0.1 } else { -0.1 };
                (model_total, 0.5 + 1.5 * model_total + noise)
            })
            .collect();
        let calibration = Calibration::fit(&points).unwrap();
        assert_float_absolute_eq!(1.5, calibration.slope, 0.05);
        assert_float_absolute_eq!(0.5, calibration.intercept, 0.1);
        assert!(calibration.r_squared > 0.99);
        assert!(calibration.p_values[1] < 0.001);
        assert_eq!(20, calibration.samples);
        assert_float_absolute_eq!(0.5 + 1.5 * 2., calibration.predict(2.), 0.2);
    }

    #[test]
    fn calibration_needs_enough_points() {
        assert!(Calibration::fit(&[(1., 2.), (2., 3.)]).is_err());
    }

    #[test]
    fn accuracy_formatting() {
        assert_eq!("75.0%", format_accuracy(Some(0.75)));
        assert_eq!("-", format_accuracy(None));
    }
}
