use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{debug, info, warn};

use firstfive::boxscore::read_games;
use firstfive::config::PipelineConfig;
use firstfive::merge::merge_rows;
use firstfive::predict::{read_prediction_rows, write_prediction_rows};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// pipeline config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// predictions to settle
    #[clap(short = 'p', long)]
    predictions: Option<PathBuf>,

    /// box scores to take outcomes from
    #[clap(short = 'b', long)]
    box_scores: Option<PathBuf>,

    /// where to write the merged predictions
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// only games before this date are settled; defaults to the local date
    #[clap(long)]
    today: Option<NaiveDate>,
}
impl Args {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(predictions) = &self.predictions {
            config.paths.predictions = predictions.clone();
        }
        if let Some(box_scores) = &self.box_scores {
            config.paths.box_scores = box_scores.clone();
        }
        if let Some(output) = &self.output {
            config.paths.merged_predictions = output.clone();
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    debug!("args: {args:?}");

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let start_time = Instant::now();
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let policy = config.team_policy();
    let rows = read_prediction_rows(&config.paths.predictions)?;
    let unresolved = rows.iter().filter(|row| row.resolved().is_none()).count();
    if unresolved > 0 {
        warn!("{unresolved} predictions name unrecognised teams and cannot be settled");
    }
    let games = read_games(&config.paths.box_scores, policy)?;
    let outcome = merge_rows(&rows, &games, today, config.line());

    write_prediction_rows(&config.paths.merged_predictions, &outcome.merged)?;
    write_prediction_rows(&config.paths.unmatched, &outcome.unmatched)?;
    info!(
        "merged {} predictions into {}, {} unmatched written to {}",
        outcome.merged.len(),
        config.paths.merged_predictions.display(),
        outcome.unmatched.len(),
        config.paths.unmatched.display()
    );
    let elapsed = start_time.elapsed();
    info!("took {:.3}s", elapsed.as_secs_f64());
    Ok(())
}
