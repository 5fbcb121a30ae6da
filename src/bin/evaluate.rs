use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use firstfive::config::PipelineConfig;
use firstfive::evaluate::{format_accuracy, tabulate_daily, tabulate_misses, tabulate_tiers, Evaluation};
use firstfive::predict::read_predictions;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// pipeline config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// settled predictions; defaults to the merged predictions
    predictions: Option<PathBuf>,

    /// list losing bets at or above this confidence
    #[clap(long)]
    miss_confidence: Option<f64>,

    /// print the day-by-day summary
    #[clap(short = 'd', long)]
    daily: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if let Some(miss_confidence) = self.miss_confidence {
            if !(0.0..=1.0).contains(&miss_confidence) {
                bail!("miss confidence must lie in [0, 1]");
            }
        }
        Ok(())
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
    if let Some(miss_confidence) = args.miss_confidence {
        config.miss_confidence = miss_confidence;
    }
    config.validate()?;

    let path = args.predictions.unwrap_or(config.paths.merged_predictions.clone());
    let predictions = read_predictions(&path, config.team_policy())?;
    let options = config.evaluate_options();
    let evaluation = Evaluation::evaluate(&predictions, &options);

    info!(
        "{} settled of {} predictions, accuracy {} ({}/{}), profit {:.2}",
        evaluation.settled.len(),
        predictions.len(),
        format_accuracy(evaluation.overall.accuracy()),
        evaluation.overall.correct,
        evaluation.overall.total,
        evaluation.profit
    );
    info!("accuracy by tier:\n{}", Console::default().render(&tabulate_tiers(&evaluation.tiers)));
    if args.daily {
        info!("daily summary:\n{}", Console::default().render(&tabulate_daily(&evaluation.daily)));
    }
    let misses = evaluation.misses(options.miss_confidence);
    if !misses.is_empty() {
        info!(
            "{} misses at confidence {} and above:\n{}",
            misses.len(),
            options.miss_confidence,
            Console::default().render(&tabulate_misses(&misses))
        );
    }
    if let Some(calibration) = &evaluation.calibration {
        info!("calibration:\n{}", Console::default().render(&calibration.tabulate()));
    }
    Ok(())
}
