use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Cell, Col, Row, Table};

use crate::evaluate::{format_accuracy, tier, tier_label, Tally};
use crate::predict::Prediction;

/// Predictions as the bettor sees them: the bet derived from each model total, its dynamic confidence,
/// and the result where the game has been played. Rows below `min_confidence` are left out.
pub fn tabulate_predictions(predictions: &[Prediction], line: f64, std_dev: f64, min_confidence: f64) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Centred)),
            Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(7)).with(HAlign::Centred)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Date".into(),
                "Matchup".into(),
                "Bet".into(),
                "Confidence".into(),
                "Tier".into(),
                "Model total".into(),
                "Runs 1-5".into(),
                "Correct".into(),
            ],
        ));

    let mut tally = Tally::default();
    for prediction in predictions {
        let bet = prediction.bet(line);
        let confidence = bet.dynamic_confidence(prediction.model_total, std_dev);
        if confidence < min_confidence {
            continue;
        }
        let correct = prediction.runs_1_5.map(|runs| bet.wins(runs));
        if let Some(correct) = correct {
            tally.add(correct);
        }
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{}", prediction.date).into(),
                format!("{} @ {}", prediction.away, prediction.home).into(),
                format!("{bet}").into(),
                format!("{confidence:.4}").into(),
                tier_label(tier(confidence)).into(),
                format!("{:.2}", prediction.model_total).into(),
                prediction
                    .runs_1_5
                    .map_or_else(|| "-".to_string(), |runs| format!("{runs:.1}"))
                    .into(),
                match correct {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "",
                }
                .to_string()
                .into(),
            ],
        ));
    }

    table.push_row(Row::new(
        Styles::default().with(Separator(true)),
        vec![
            Cell::new(Styles::default(), "Accuracy".into()),
            "".into(),
            "".into(),
            "".into(),
            "".into(),
            "".into(),
            "".into(),
            Cell::new(
                Styles::default().with(HAlign::Right),
                format!("{} ({}/{})", format_accuracy(tally.accuracy()), tally.correct, tally.total).into(),
            ),
        ],
    ));
    table
}
