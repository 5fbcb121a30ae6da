use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use firstfive::boxscore::read_games;
use firstfive::config::PipelineConfig;
use firstfive::evaluate::format_accuracy;
use firstfive::form::FormTable;
use firstfive::model::OverModel;
use firstfive::predict::{write_predictions, FixedStats, PredictionEngine};
use firstfive::print::tabulate_predictions;
use firstfive::stats::StatsSnapshot;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// pipeline config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// box scores, including the games yet to be played
    #[clap(short = 'b', long)]
    box_scores: Option<PathBuf>,

    /// model artifact
    #[clap(short = 'm', long)]
    model: Option<PathBuf>,

    /// where to write the predictions
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// only display bets at or above this confidence
    #[clap(long, default_value_t = 0.)]
    min_confidence: f64,

    /// display played games as well as pending ones
    #[clap(short = 'a', long)]
    all: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            bail!("minimum confidence must lie in [0, 1]");
        }
        Ok(())
    }

    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(box_scores) = &self.box_scores {
            config.paths.box_scores = box_scores.clone();
        }
        if let Some(model) = &self.model {
            config.paths.model = model.clone();
        }
        if let Some(output) = &self.output {
            config.paths.predictions = output.clone();
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
    let snapshot = StatsSnapshot::read(&config.paths.standard_stats, &config.paths.advanced_stats, policy)?;
    let form = FormTable::from_games(&games, config.form_window);

    let mut engine = PredictionEngine::new(&model, &form, FixedStats::new(snapshot));
    let batch = engine.predict(&games)?;
    write_predictions(&config.paths.predictions, &batch.predictions)?;
    let pending = batch.predictions.iter().filter(|prediction| prediction.is_pending).count();
    info!(
        "wrote {} predictions ({pending} pending) to {}",
        batch.predictions.len(),
        config.paths.predictions.display()
    );
    info!("accuracy over played games: {}", format_accuracy(batch.accuracy()));

    let displayed: Vec<_> = batch
        .predictions
        .into_iter()
        .filter(|prediction| args.all || prediction.is_pending)
        .collect();
    if !displayed.is_empty() {
        let table = tabulate_predictions(&displayed, model.line, config.confidence_std_dev, args.min_confidence);
        info!("predictions:\n{}", Console::default().render(&table));
    }
    let elapsed = start_time.elapsed();
    info!("took {:.3}s", elapsed.as_secs_f64());
    Ok(())
}
