//! Held-out classification metrics.

use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};

use crate::forest::CLASSES;

pub const CLASS_LABELS: [&str; CLASSES] = ["0", "1"];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: [ClassMetrics; CLASSES],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}
impl ClassificationReport {
    /// Per-class precision, recall and F1, where `true` is class 1. A ratio with a zero denominator is
    /// reported as zero.
    pub fn compute(actual: &[bool], predicted: &[bool]) -> Self {
        assert_eq!(actual.len(), predicted.len(), "actual and predicted lengths differ");
        let mut confusion = [[0_usize; CLASSES]; CLASSES];
        for (&actual, &predicted) in actual.iter().zip(predicted) {
            confusion[actual as usize][predicted as usize] += 1;
        }
        let samples = actual.len();
        let mut classes = [ClassMetrics::default(); CLASSES];
        for (class, metrics) in classes.iter_mut().enumerate() {
            let true_positives = confusion[class][class];
            let predicted_count: usize = (0..CLASSES).map(|actual| confusion[actual][class]).sum();
            let support: usize = confusion[class].iter().sum();
            let precision = ratio(true_positives, predicted_count);
            let recall = ratio(true_positives, support);
            let f1 = if precision + recall > 0. {
                2. * precision * recall / (precision + recall)
            } else {
                0.
            };
            *metrics = ClassMetrics {
                precision,
                recall,
                f1,
                support,
            };
        }
        let correct: usize = (0..CLASSES).map(|class| confusion[class][class]).sum();

        let macro_avg = average(&classes, [1.; CLASSES], samples);
        let weighted_avg = average(&classes, classes.map(|metrics| metrics.support as f64), samples);

        Self {
            classes,
            accuracy: ratio(correct, samples),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn support(&self) -> usize {
        self.macro_avg.support
    }

    pub fn tabulate(&self) -> Table {
        let mut table = Table::default()
            .with_cols(vec![
                Col::new(Styles::default().with(MinWidth(12))),
                Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            ])
            .with_row(Row::new(
                Styles::default().with(Header(true)).with(Separator(true)),
                vec![
                    "".into(),
                    "Precision".into(),
                    "Recall".into(),
                    "F1-score".into(),
                    "Support".into(),
                ],
            ));
        for (label, metrics) in CLASS_LABELS.iter().zip(&self.classes) {
            table.push_row(metrics_row(label, metrics, Styles::default()));
        }
        table.push_row(Row::new(
            Styles::default().with(Separator(true)),
            vec![
                "accuracy".into(),
                "".into(),
                "".into(),
                format!("{:.2}", self.accuracy).into(),
                format!("{}", self.support()).into(),
            ],
        ));
        table.push_row(metrics_row("macro avg", &self.macro_avg, Styles::default()));
        table.push_row(metrics_row("weighted avg", &self.weighted_avg, Styles::default()));
        table
    }
}

fn metrics_row(label: &str, metrics: &ClassMetrics, styles: Styles) -> Row {
    Row::new(
        styles,
        vec![
            label.to_string().into(),
            format!("{:.2}", metrics.precision).into(),
            format!("{:.2}", metrics.recall).into(),
            format!("{:.2}", metrics.f1).into(),
            format!("{}", metrics.support).into(),
        ],
    )
}

fn average(classes: &[ClassMetrics; CLASSES], weights: [f64; CLASSES], samples: usize) -> ClassMetrics {
    let total_weight: f64 = weights.iter().sum();
    let weighted = |field: fn(&ClassMetrics) -> f64| {
        if total_weight > 0. {
            classes.iter().zip(weights).map(|(metrics, weight)| weight * field(metrics)).sum::<f64>() / total_weight
        } else {
            0.
        }
    };
    ClassMetrics {
        precision: weighted(|metrics| metrics.precision),
        recall: weighted(|metrics| metrics.recall),
        f1: weighted(|metrics| metrics.f1),
        support: samples,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.
    } else {
        numerator as f64 / denominator as f64
    }
}
