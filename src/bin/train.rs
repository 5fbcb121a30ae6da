use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};
use tracing::{debug, info};

use firstfive::boxscore::read_games;
use firstfive::config::PipelineConfig;
use firstfive::form::FormTable;
use firstfive::predict::FixedStats;
use firstfive::stats::StatsSnapshot;
use firstfive::train::{train, TrainingSet};

const TOP_IMPORTANCES: usize = 10;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// pipeline config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// box scores to train on
    #[clap(short = 'b', long)]
    box_scores: Option<PathBuf>,

    /// where to write the model artifact
    #[clap(short = 'm', long)]
    model: Option<PathBuf>,

    /// number of trees in the forest
    #[clap(short = 't', long)]
    trees: Option<usize>,

    /// seed for the split and the forest
    #[clap(short = 's', long)]
    seed: Option<u64>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.trees == Some(0) {
            bail!("the forest needs at least one tree");
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
        if let Some(trees) = self.trees {
            config.train.forest.trees = trees;
        }
        if let Some(seed) = self.seed {
            config.train.seed = seed;
            config.train.forest.seed = seed;
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
    debug!("config: {config:?}");

    let start_time = Instant::now();
    let policy = config.team_policy();
    let games = read_games(&config.paths.box_scores, policy)?;
    info!("read {} games from {}", games.len(), config.paths.box_scores.display());
    let snapshot = StatsSnapshot::read(&config.paths.standard_stats, &config.paths.advanced_stats, policy)?;
    info!("read season stats for {} teams", snapshot.len());
    let form = FormTable::from_games(&games, config.form_window);

    let set = TrainingSet::build(&games, &mut FixedStats::new(snapshot), &form, config.line())?;
    let outcome = train(&set, &config.train)?;
    info!(
        "held-out report ({} train, {} test):\n{}",
        outcome.train_samples,
        outcome.test_samples,
        Console::default().render(&outcome.report.tabulate())
    );
    info!(
        "top {TOP_IMPORTANCES} features:\n{}",
        Console::default().render(&tabulate_importances(&outcome.importances[..TOP_IMPORTANCES.min(outcome.importances.len())]))
    );

    outcome.model.save(&config.paths.model)?;
    let elapsed = start_time.elapsed();
    info!("saved model to {} in {:.3}s", config.paths.model.display(), elapsed.as_secs_f64());
    Ok(())
}

fn tabulate_importances(importances: &[(String, f64)]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(5)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(22))),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Rank".into(), "Feature".into(), "Importance".into()],
        ));
    table.push_rows(importances.iter().enumerate().map(|(index, (name, importance))| {
        Row::new(
            Styles::default(),
            vec![
                format!("{}", index + 1).into(),
                name.clone().into(),
                format!("{importance:.4}").into(),
            ],
        )
    }));
    table
}
