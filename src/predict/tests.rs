use std::fs;
use std::path::Path;

use assert_float_eq::*;
use ordinalizer::Ordinal;
use strum::EnumCount;

use crate::error::SchemaError;
use crate::form::FORM_WINDOW;
use crate::stats::Stat;
use crate::testing::{date, game, pending_game, scratch_dir, stats, toy_model};

use super::*;

fn prediction(date_str: &str, home: Team, away: Team) -> Prediction {
    Prediction {
        date: date(date_str),
        home,
        away,
        predicted_over: true,
        actual_over: Some(true),
        runs_1_5: Some(6.),
        confidence: 0.7123,
        model_total: 5.2,
        is_pending: false,
    }
}

#[test]
fn bet_side_follows_model_total() {
    let bet = Bet::derive(5.2, 4.5);
    assert_eq!(Side::Over, bet.side);
    assert_eq!("OVER 4.5", bet.to_string());
    assert_eq!("UNDER 4.5", Bet::derive(4.5, 4.5).to_string());
    assert_eq!("UNDER 4.5", Bet::derive(3.0, 4.5).to_string());
}

#[test]
fn dynamic_confidence_of_the_over() {
    let bet = Bet::derive(5.2, 4.5);
    // 1 - Φ((4.5 - 5.2) / 1.25) = Φ(0.56)
    assert_float_absolute_eq!(0.7123, bet.dynamic_confidence(5.2, CONFIDENCE_STD_DEV), 1e-4);
}

#[test]
fn dynamic_confidence_of_the_under() {
    let bet = Bet::derive(3.0, 4.5);
    // Φ(1.2)
    assert_float_absolute_eq!(0.88493, bet.dynamic_confidence(3.0, CONFIDENCE_STD_DEV), 1e-4);
    assert_float_absolute_eq!(0.5, dynamic_confidence(4.5, 4.5, Side::Under, CONFIDENCE_STD_DEV), 1e-7);
}

#[test]
fn bet_settlement() {
    let over = Bet::derive(5.2, 4.5);
    assert!(over.wins(5.));
    assert!(!over.wins(4.));
    let under = Bet::derive(4.0, 4.5);
    assert!(under.wins(4.));
    assert!(!under.wins(5.));
}

#[test]
fn record_formatting() {
    let completed = Prediction {
        confidence: 0.712_345,
        model_total: 5.2049,
        ..prediction("2025-05-01", Team::Braves, Team::Mets)
    };
    assert_eq!(
        ["2025-05-01", "ATL", "NYM", "1", "1", "6.0", "0.7123", "5.20", "False"],
        completed.to_record()
    );

    let pending = Prediction {
        predicted_over: false,
        actual_over: None,
        runs_1_5: None,
        is_pending: true,
        ..prediction("2025-05-02", Team::RedSox, Team::Yankees)
    };
    assert_eq!(
        ["2025-05-02", "BOS", "NYY", "0", "", "", "0.7123", "5.20", "True"],
        pending.to_record()
    );
}

#[test]
fn written_predictions_read_back() {
    let predictions = vec![
        prediction("2025-05-01", Team::Braves, Team::Mets),
        Prediction {
            actual_over: None,
            runs_1_5: None,
            is_pending: true,
            ..prediction("2025-05-02", Team::RedSox, Team::Yankees)
        },
    ];
    let bytes = write_predictions_to(CsvWriter::from_writer(vec![]), &predictions).unwrap();
    let table = Table::from_reader("predictions", bytes.as_slice()).unwrap();
    assert_eq!(PREDICTION_HEADER.as_slice(), table.headers());
    assert_eq!(predictions, parse_predictions(table, UnknownTeamPolicy::Halt).unwrap());
}

#[test]
fn written_predictions_to_file() {
    let path = scratch_dir("written_predictions_to_file").join("data/predictions.csv");
    let predictions = vec![prediction("2025-05-01", Team::Braves, Team::Mets)];
    write_predictions(&path, &predictions).unwrap();
    assert_eq!(predictions, read_predictions(&path, UnknownTeamPolicy::Halt).unwrap());
}

#[test]
fn parse_with_header_aliases_and_optional_columns() {
    let csv = "\
Date,Home,Away,Predicted_Over_4_5,Confidence,Model_Total
2025-05-01 00:00:00,Atlanta Braves,New York Mets,1.0,0.61,3.66
2025-05-01,Springfield Isotopes,New York Mets,0,0.55,2.7
";
    let table = Table::from_reader("predictions", csv.as_bytes()).unwrap();
    let predictions = parse_predictions(table, UnknownTeamPolicy::Skip).unwrap();
    assert_eq!(1, predictions.len());
    assert_eq!(
        Prediction {
            date: date("2025-05-01"),
            home: Team::Braves,
            away: Team::Mets,
            predicted_over: true,
            actual_over: None,
            runs_1_5: None,
            confidence: 0.61,
            model_total: 3.66,
            is_pending: false,
        },
        predictions[0]
    );
}

#[test]
fn parse_without_date_column() {
    let table = Table::from_reader(
        "predictions",
        "Home_Team,Away_Team,Predicted_Over_4_5,Confidence,Model_Total\n".as_bytes(),
    )
    .unwrap();
    match parse_predictions(table, UnknownTeamPolicy::Skip) {
        Err(InputError::Schema(SchemaError::MissingColumn { column, .. })) => assert_eq!("Game_Date", column),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parse_invalid_flag() {
    let table = Table::from_reader(
        "predictions",
        "Game_Date,Home_Team,Away_Team,Predicted_Over_4_5,Confidence,Model_Total\n2025-05-01,ATL,NYM,maybe,0.6,3.6\n".as_bytes(),
    )
    .unwrap();
    assert!(matches!(
        parse_predictions(table, UnknownTeamPolicy::Skip),
        Err(InputError::Schema(SchemaError::InvalidValue { .. }))
    ));
}

fn snapshot() -> StatsSnapshot {
    [
        (Team::Braves, stats(1.)),
        (Team::Mets, stats(0.95)),
        (Team::RedSox, stats(1.05)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn engine_predicts_completed_and_pending_games() {
    let model = toy_model();
    let games = vec![
        game("2025-05-01", "ATL", "NYM", [1, 0, 2, 0, 0], [0, 1, 0, 2, 0]),
        pending_game("2025-05-02", "BOS", "NYY"),
        pending_game("2025-05-03", "NYM", "ATL"),
    ];
    let form = FormTable::from_games(&games, FORM_WINDOW);
    let mut engine = PredictionEngine::new(&model, &form, FixedStats::new(snapshot()));
    let batch = engine.predict(&games).unwrap();

    assert_eq!(
        vec![SkippedGame {
            key: games[1].key(),
            reason: SkipReason::MissingStats(Team::Yankees)
        }],
        batch.skipped
    );
    assert_eq!(2, batch.predictions.len());

    let completed = &batch.predictions[0];
    assert_eq!(games[0].key(), completed.key());
    assert_eq!(Some(6.), completed.runs_1_5);
    assert_eq!(Some(true), completed.actual_over);
    assert!(!completed.is_pending);

    let pending = &batch.predictions[1];
    assert_eq!(games[2].key(), pending.key());
    assert!(pending.is_pending);
    assert_eq!(None, pending.actual_over);
    assert_eq!(None, pending.runs_1_5);

    for (prediction, game) in batch.predictions.iter().zip([&games[0], &games[2]]) {
        let features = FeatureVector::build(
            snapshot().get(game.home).unwrap(),
            snapshot().get(game.away).unwrap(),
            form.form_before(game.home, game.date),
            form.form_before(game.away, game.date),
        );
        let assessment = model.assess(features.as_slice()).unwrap();
        assert_eq!(assessment.over, prediction.predicted_over);
        assert_eq!(assessment.confidence, prediction.confidence);
        assert_eq!(assessment.model_total, prediction.model_total);
    }
}

#[test]
fn engine_uses_form_strictly_before_the_game() {
    let model = toy_model();
    let games = vec![
        game("2025-05-01", "ATL", "NYM", [1, 0, 2, 0, 0], [0, 1, 0, 2, 0]),
        game("2025-05-02", "ATL", "NYM", [5, 5, 5, 5, 5], [5, 5, 5, 5, 5]),
    ];
    let form = FormTable::from_games(&games, FORM_WINDOW);
    let mut engine = PredictionEngine::new(&model, &form, FixedStats::new(snapshot()));
    let features = engine.features(&games[1]).unwrap().unwrap();
    assert_eq!(6., features.as_slice()[18]);
    assert_eq!(6., features.as_slice()[19]);
    let features = engine.features(&games[0]).unwrap().unwrap();
    assert_eq!(0., features.as_slice()[18]);
}

#[test]
fn engine_skips_games_without_archived_stats() {
    let model = toy_model();
    let games = vec![game("2025-05-01", "ATL", "NYM", [1, 0, 2, 0, 0], [0, 1, 0, 2, 0])];
    let form = FormTable::from_games(&games, FORM_WINDOW);
    let archive = SnapshotArchive::new(scratch_dir("engine_skips_games_without_archived_stats"));
    let mut engine = PredictionEngine::new(&model, &form, ArchivedStats::new(archive, 3, UnknownTeamPolicy::Skip));
    let batch = engine.predict(&games).unwrap();
    assert!(batch.predictions.is_empty());
    assert_eq!(SkipReason::NoSnapshot, batch.skipped[0].reason);
    assert_eq!(None, batch.accuracy());
}

fn capture(root: &Path, day: &str, suffixed: bool, atl_obp: &str) {
    let dir = root.join(day);
    fs::create_dir_all(&dir).unwrap();
    let suffix = if suffixed { format!("_{day}") } else { String::new() };
    fs::write(
        dir.join(format!("team_standard{suffix}.csv")),
        format!("Tm,AVG,OBP,SLG,OPS,RBI\nATL,.251,{atl_obp},.418,.740,140\nNYM,.240,.310,.400,.710,128\n"),
    )
    .unwrap();
    fs::write(
        dir.join(format!("team_advanced{suffix}.csv")),
        "Team,BB%,K%,ISO,wRC+\nATL,9.5%,21.0%,.167,108\nNYM,8.1%,22.4%,.160,98\n",
    )
    .unwrap();
}

fn home_obp(features: &FeatureVector) -> f64 {
    features.as_slice()[Stat::OnBasePercentage.ordinal()]
}

#[test]
fn engine_takes_the_capture_in_force_for_each_game() {
    let root = scratch_dir("engine_takes_the_capture_in_force_for_each_game");
    capture(&root, "2025-05-01", false, ".300");
    capture(&root, "2025-05-05", true, ".350");

    let model = toy_model();
    let games = vec![
        game("2025-05-02", "ATL", "NYM", [1, 0, 2, 0, 0], [0, 1, 0, 2, 0]),
        game("2025-05-03", "ATL", "NYM", [0, 0, 0, 1, 0], [2, 0, 0, 0, 1]),
        game("2025-05-05", "ATL", "NYM", [3, 0, 0, 0, 0], [0, 0, 1, 0, 0]),
        game("2025-05-06", "ATL", "NYM", [0, 2, 0, 0, 2], [1, 1, 0, 0, 0]),
    ];
    let form = FormTable::from_games(&games, FORM_WINDOW);
    let stats = ArchivedStats::new(SnapshotArchive::new(&root), 3, UnknownTeamPolicy::Halt);
    let mut engine = PredictionEngine::new(&model, &form, stats);
    let batch = engine.predict(&games).unwrap();

    // the 05-01 capture is four days before the 05-05 game
    assert_eq!(
        vec![SkippedGame {
            key: games[2].key(),
            reason: SkipReason::NoSnapshot
        }],
        batch.skipped
    );
    let keys: Vec<_> = batch.predictions.iter().map(Prediction::key).collect();
    assert_eq!(vec![games[0].key(), games[1].key(), games[3].key()], keys);

    for (prediction, game, obp) in [
        (&batch.predictions[0], &games[0], 0.300),
        (&batch.predictions[1], &games[1], 0.300),
        (&batch.predictions[2], &games[3], 0.350),
    ] {
        let features = engine.features(game).unwrap().unwrap();
        assert_float_absolute_eq!(obp, home_obp(&features));
        assert_float_absolute_eq!(0.310, features.as_slice()[Stat::COUNT + Stat::OnBasePercentage.ordinal()]);
        let assessment = model.assess(features.as_slice()).unwrap();
        assert_eq!(assessment.model_total, prediction.model_total);
    }
}

#[test]
fn engine_reuses_loaded_captures() {
    let root = scratch_dir("engine_reuses_loaded_captures");
    capture(&root, "2025-05-01", false, ".300");

    let model = toy_model();
    let games = vec![
        game("2025-05-02", "ATL", "NYM", [1, 0, 2, 0, 0], [0, 1, 0, 2, 0]),
        game("2025-05-03", "ATL", "NYM", [0, 0, 0, 1, 0], [2, 0, 0, 0, 1]),
    ];
    let form = FormTable::from_games(&games, FORM_WINDOW);
    let stats = ArchivedStats::new(SnapshotArchive::new(&root), 3, UnknownTeamPolicy::Halt);
    let mut engine = PredictionEngine::new(&model, &form, stats);
    assert_float_absolute_eq!(0.300, home_obp(&engine.features(&games[0]).unwrap().unwrap()));

    capture(&root, "2025-05-01", false, ".999");
    assert_float_absolute_eq!(0.300, home_obp(&engine.features(&games[1]).unwrap().unwrap()));

    let fresh = ArchivedStats::new(SnapshotArchive::new(&root), 3, UnknownTeamPolicy::Halt);
    let mut engine = PredictionEngine::new(&model, &form, fresh);
    assert_float_absolute_eq!(0.999, home_obp(&engine.features(&games[1]).unwrap().unwrap()));
}

#[test]
fn batch_accuracy_over_played_games() {
    let batch = PredictionBatch {
        predictions: vec![
            prediction("2025-05-01", Team::Braves, Team::Mets),
            Prediction {
                predicted_over: false,
                ..prediction("2025-05-01", Team::RedSox, Team::Yankees)
            },
            Prediction {
                actual_over: None,
                ..prediction("2025-05-02", Team::RedSox, Team::Yankees)
            },
        ],
        skipped: vec![],
    };
    assert_eq!(Some(0.5), batch.accuracy());
}
