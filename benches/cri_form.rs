use chrono::{Days, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use strum::IntoEnumIterator;

use firstfive::boxscore::{Game, InningScore, FIRST_FIVE, INNINGS};
use firstfive::form::{FormTable, FORM_WINDOW};
use firstfive::team::Team;

const DAYS: u64 = 160;

/// Every team plays once a day, paired off in rotation.
fn season() -> Vec<Game> {
    let teams: Vec<_> = Team::iter().collect();
    let opening = NaiveDate::from_ymd_opt(2025, 3, 27).unwrap();
    let mut games = vec![];
    for day in 0..DAYS {
        let date = opening.checked_add_days(Days::new(day)).unwrap();
        let offset = day as usize % teams.len();
        for pair in 0..teams.len() / 2 {
            let home = teams[(offset + pair) % teams.len()];
            let away = teams[(offset + teams.len() - 1 - pair) % teams.len()];
            let mut away_innings = [InningScore::Runs(0); INNINGS];
            let mut home_innings = [InningScore::Runs(0); INNINGS];
            for inning in 0..FIRST_FIVE {
                away_innings[inning] = InningScore::Runs(((day as usize + pair + inning) % 3) as u8);
                home_innings[inning] = InningScore::Runs(((day as usize * 3 + pair + inning) % 2) as u8);
            }
            games.push(Game {
                date,
                home,
                away,
                away_innings,
                home_innings,
            });
        }
    }
    games
}

fn criterion_benchmark(c: &mut Criterion) {
    let games = season();
    c.bench_function("cri_form_build", |b| {
        b.iter(|| FormTable::from_games(&games, FORM_WINDOW));
    });

    let form = FormTable::from_games(&games, FORM_WINDOW);
    let date = games[games.len() / 2].date;
    c.bench_function("cri_form_lookup", |b| {
        b.iter(|| form.form_before(Team::Braves, date));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
