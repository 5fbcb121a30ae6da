//! Rolling scoring form: the trailing mean of first-five-innings totals in a team's prior games.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::boxscore::Game;
use crate::team::Team;

pub const FORM_WINDOW: usize = 7;

/// One completed game as seen by one of its two teams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub runs_1_5: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormRecord {
    pub team: Team,
    pub date: NaiveDate,
    pub form: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FormTable {
    window: usize,
    history: FxHashMap<Team, Vec<Observation>>,
}
impl FormTable {
    /// Indexes completed games by team. Pending games and games with an undefined first-five total
    /// contribute no observations.
    pub fn from_games<'a>(games: impl IntoIterator<Item = &'a Game>, window: usize) -> Self {
        let mut history: FxHashMap<Team, Vec<Observation>> = FxHashMap::default();
        let mut completed = 0;
        for game in games {
            let runs_1_5 = match game.runs_1_5() {
                Some(runs) if !game.is_pending() => runs as f64,
                _ => continue,
            };
            completed += 1;
            for team in [game.home, game.away] {
                history.entry(team).or_default().push(Observation {
                    date: game.date,
                    runs_1_5,
                });
            }
        }
        for observations in history.values_mut() {
            observations.sort_by_key(|observation| observation.date);
        }
        debug!("form history over {completed} completed games, {} teams", history.len());
        Self { window, history }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Mean first-five total over the team's last `window` games played strictly before `date`, or
    /// `None` if it has no such games. Games on `date` itself, including the other half of a
    /// doubleheader, are never seen.
    pub fn form_before(&self, team: Team, date: NaiveDate) -> Option<f64> {
        let observations = self.history.get(&team)?;
        let end = observations.partition_point(|observation| observation.date < date);
        if end == 0 || self.window == 0 {
            return None;
        }
        let recent = &observations[end.saturating_sub(self.window)..end];
        let sum: f64 = recent.iter().map(|observation| observation.runs_1_5).sum();
        Some(sum / recent.len() as f64)
    }

    /// Form for every (team, date) on which the team played, ordered by team then date.
    pub fn records(&self) -> Vec<FormRecord> {
        let mut teams: Vec<_> = self.history.keys().copied().collect();
        teams.sort();
        let mut records = vec![];
        for team in teams {
            let mut last_date = None;
            for observation in &self.history[&team] {
                if last_date == Some(observation.date) {
                    continue;
                }
                last_date = Some(observation.date);
                records.push(FormRecord {
                    team,
                    date: observation.date,
                    form: self.form_before(team, observation.date),
                });
            }
        }
        records
    }

    pub fn observations(&self, team: Team) -> &[Observation] {
        self.history.get(&team).map(Vec::as_slice).unwrap_or_default()
    }
}
