use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{debug, info};

use firstfive::boxscore::read_games;
use firstfive::config::PipelineConfig;
use firstfive::evaluate::format_accuracy;
use firstfive::form::FormTable;
use firstfive::model::OverModel;
use firstfive::predict::{write_predictions, ArchivedStats, PredictionEngine};
use firstfive::stats::SnapshotArchive;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// pipeline config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// directory of dated stats snapshots
    #[clap(short = 'd', long)]
    archive: Option<PathBuf>,

    /// model artifact
    #[clap(short = 'm', long)]
    model: Option<PathBuf>,

    /// where to write the backfilled predictions
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// number of days before each game to look for a snapshot
    #[clap(long)]
    days_back: Option<u64>,

    /// earliest game date to backfill
    #[clap(long)]
    since: Option<NaiveDate>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.days_back == Some(0) {
            bail!("must look back at least one day");
        }
        Ok(())
    }

    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(archive) = &self.archive {
            config.paths.archive = archive.clone();
        }
        if let Some(model) = &self.model {
            config.paths.model = model.clone();
        }
        if let Some(output) = &self.output {
            config.paths.backfilled_predictions = output.clone();
        }
        if let Some(days_back) = self.days_back {
            config.archive_days_back = days_back;
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
    args.validate()?;
    debug!("args: {args:?}");

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let start_time = Instant::now();
    let policy = config.team_policy();
    let model = OverModel::load(&config.paths.model)?;
    let games = read_games(&config.paths.box_scores, policy)?;
    let form = FormTable::from_games(&games, config.form_window);
    let completed: Vec<_> = games
        .iter()
        .filter(|game| !game.is_pending())
        .filter(|game| args.since.map_or(true, |since| game.date >= since))
        .collect();
    info!("backfilling {} of {} games", completed.len(), games.len());

    let archive = SnapshotArchive::new(config.paths.archive.clone());
    let stats = ArchivedStats::new(archive, config.archive_days_back, policy);
    let mut engine = PredictionEngine::new(&model, &form, stats);
    let batch = engine.predict(completed)?;
    write_predictions(&config.paths.backfilled_predictions, &batch.predictions)?;
    info!(
        "wrote {} predictions to {}, skipped {}",
        batch.predictions.len(),
        config.paths.backfilled_predictions.display(),
        batch.skipped.len()
    );
    info!("backfill accuracy: {}", format_accuracy(batch.accuracy()));
    let elapsed = start_time.elapsed();
    info!("took {:.3}s", elapsed.as_secs_f64());
    Ok(())
}
