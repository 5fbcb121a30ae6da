//! Normalisation of free-text franchise names to fixed 3-letter team codes.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumIter};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumCount, EnumIter)]
pub enum Team {
    Diamondbacks,
    Braves,
    Orioles,
    RedSox,
    Cubs,
    WhiteSox,
    Reds,
    Guardians,
    Rockies,
    Tigers,
    Astros,
    Royals,
    Angels,
    Dodgers,
    Marlins,
    Brewers,
    Twins,
    Mets,
    Yankees,
    Athletics,
    Phillies,
    Pirates,
    Padres,
    Giants,
    Mariners,
    Cardinals,
    Rays,
    Rangers,
    BlueJays,
    Nationals,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised team '{0}'")]
pub struct UnrecognizedTeam(pub String);

/// What a loader does with a row naming a team outside the normalisation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTeamPolicy {
    /// Exclude the row and log it.
    #[default]
    Skip,
    /// Fail the load.
    Halt,
}

/// Full names, historical names and alternate abbreviations. Canonical codes are matched separately.
const ALIASES: [(&str, Team); 57] = [
    ("Arizona Diamondbacks", Team::Diamondbacks),
    ("Arizona D-backs", Team::Diamondbacks),
    ("AZ", Team::Diamondbacks),
    ("Atlanta Braves", Team::Braves),
    ("Baltimore Orioles", Team::Orioles),
    ("Boston Red Sox", Team::RedSox),
    ("Chicago Cubs", Team::Cubs),
    ("Chicago White Sox", Team::WhiteSox),
    ("CWS", Team::WhiteSox),
    ("Cincinnati Reds", Team::Reds),
    ("Cleveland Guardians", Team::Guardians),
    ("Cleveland Indians", Team::Guardians),
    ("Colorado Rockies", Team::Rockies),
    ("Detroit Tigers", Team::Tigers),
    ("Houston Astros", Team::Astros),
    ("Kansas City Royals", Team::Royals),
    ("KC", Team::Royals),
    ("KCA", Team::Royals),
    ("Los Angeles Angels", Team::Angels),
    ("Los Angeles Angels of Anaheim", Team::Angels),
    ("Anaheim Angels", Team::Angels),
    ("California Angels", Team::Angels),
    ("ANA", Team::Angels),
    ("Los Angeles Dodgers", Team::Dodgers),
    ("Miami Marlins", Team::Marlins),
    ("Florida Marlins", Team::Marlins),
    ("FLA", Team::Marlins),
    ("Milwaukee Brewers", Team::Brewers),
    ("Minnesota Twins", Team::Twins),
    ("New York Mets", Team::Mets),
    ("New York Yankees", Team::Yankees),
    ("Athletics", Team::Athletics),
    ("Oakland Athletics", Team::Athletics),
    ("Sacramento Athletics", Team::Athletics),
    ("Las Vegas Athletics", Team::Athletics),
    ("ATH", Team::Athletics),
    ("Philadelphia Phillies", Team::Phillies),
    ("Pittsburgh Pirates", Team::Pirates),
    ("San Diego Padres", Team::Padres),
    ("SD", Team::Padres),
    ("San Francisco Giants", Team::Giants),
    ("SF", Team::Giants),
    ("Seattle Mariners", Team::Mariners),
    ("St. Louis Cardinals", Team::Cardinals),
    ("St Louis Cardinals", Team::Cardinals),
    ("Saint Louis Cardinals", Team::Cardinals),
    ("Tampa Bay Rays", Team::Rays),
    ("Tampa Bay Devil Rays", Team::Rays),
    ("TB", Team::Rays),
    ("Texas Rangers", Team::Rangers),
    ("Toronto Blue Jays", Team::BlueJays),
    ("Washington Nationals", Team::Nationals),
    ("Montreal Expos", Team::Nationals),
    ("WSH", Team::Nationals),
    ("WAS", Team::Nationals),
    ("MON", Team::Nationals),
    ("CHA", Team::WhiteSox),
];

impl Team {
    pub fn code(&self) -> &'static str {
        match self {
            Team::Diamondbacks => "ARI",
            Team::Braves => "ATL",
            Team::Orioles => "BAL",
            Team::RedSox => "BOS",
            Team::Cubs => "CHC",
            Team::WhiteSox => "CHW",
            Team::Reds => "CIN",
            Team::Guardians => "CLE",
            Team::Rockies => "COL",
            Team::Tigers => "DET",
            Team::Astros => "HOU",
            Team::Royals => "KCR",
            Team::Angels => "LAA",
            Team::Dodgers => "LAD",
            Team::Marlins => "MIA",
            Team::Brewers => "MIL",
            Team::Twins => "MIN",
            Team::Mets => "NYM",
            Team::Yankees => "NYY",
            Team::Athletics => "OAK",
            Team::Phillies => "PHI",
            Team::Pirates => "PIT",
            Team::Padres => "SDP",
            Team::Giants => "SFG",
            Team::Mariners => "SEA",
            Team::Cardinals => "STL",
            Team::Rays => "TBR",
            Team::Rangers => "TEX",
            Team::BlueJays => "TOR",
            Team::Nationals => "WSN",
        }
    }

    /// Resolves a franchise name, historical name or team code. Matching ignores case, surrounding
    /// whitespace and repeated inner whitespace.
    pub fn from_name(name: &str) -> Result<Self, UnrecognizedTeam> {
        let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return Err(UnrecognizedTeam(name.to_string()));
        }
        if let Some(team) = Team::iter()
            .find(|team| team.code().eq_ignore_ascii_case(&cleaned))
        {
            return Ok(team);
        }
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(&cleaned))
            .map(|&(_, team)| team)
            .ok_or_else(|| UnrecognizedTeam(name.to_string()))
    }
}

impl Display for Team {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Team {
    type Err = UnrecognizedTeam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use strum::EnumCount;

    use super::*;

    const CANONICAL_NAMES: [(&str, &str); 30] = [
        ("Arizona Diamondbacks", "ARI"),
        ("Atlanta Braves", "ATL"),
        ("Baltimore Orioles", "BAL"),
        ("Boston Red Sox", "BOS"),
        ("Chicago Cubs", "CHC"),
        ("Chicago White Sox", "CHW"),
        ("Cincinnati Reds", "CIN"),
        ("Cleveland Guardians", "CLE"),
        ("Colorado Rockies", "COL"),
        ("Detroit Tigers", "DET"),
        ("Houston Astros", "HOU"),
        ("Kansas City Royals", "KCR"),
        ("Los Angeles Angels", "LAA"),
        ("Los Angeles Dodgers", "LAD"),
        ("Miami Marlins", "MIA"),
        ("Milwaukee Brewers", "MIL"),
        ("Minnesota Twins", "MIN"),
        ("New York Mets", "NYM"),
        ("New York Yankees", "NYY"),
        ("Athletics", "OAK"),
        ("Philadelphia Phillies", "PHI"),
        ("Pittsburgh Pirates", "PIT"),
        ("San Diego Padres", "SDP"),
        ("San Francisco Giants", "SFG"),
        ("Seattle Mariners", "SEA"),
        ("St. Louis Cardinals", "STL"),
        ("Tampa Bay Rays", "TBR"),
        ("Texas Rangers", "TEX"),
        ("Toronto Blue Jays", "TOR"),
        ("Washington Nationals", "WSN"),
    ];

    #[test]
    fn canonical_names() {
        for (name, code) in CANONICAL_NAMES {
            assert_eq!(code, Team::from_name(name).unwrap().code(), "for {name}");
        }
    }

    #[test]
    fn every_team_reachable_by_name() {
        let mut seen: Vec<_> = CANONICAL_NAMES
            .iter()
            .map(|(name, _)| Team::from_name(name).unwrap())
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(Team::COUNT, seen.len());
    }

    #[test]
    fn oakland_variants() {
        assert_eq!(Team::Athletics, Team::from_name("Athletics").unwrap());
        assert_eq!(Team::Athletics, Team::from_name("Oakland Athletics").unwrap());
        assert_eq!("OAK", Team::from_name("Oakland Athletics").unwrap().to_string());
    }

    #[test]
    fn historical_renames() {
        assert_eq!(Team::Guardians, Team::from_name("Cleveland Indians").unwrap());
        assert_eq!(Team::Marlins, Team::from_name("Florida Marlins").unwrap());
        assert_eq!(Team::Rays, Team::from_name("Tampa Bay Devil Rays").unwrap());
        assert_eq!(Team::Nationals, Team::from_name("Montreal Expos").unwrap());
    }

    #[test]
    fn codes_are_idempotent() {
        for team in Team::iter() {
            assert_eq!(team, Team::from_name(team.code()).unwrap());
            assert_eq!(team, team.code().to_lowercase().parse().unwrap());
        }
    }

    #[test]
    fn whitespace_and_case_insensitive() {
        assert_eq!(Team::RedSox, Team::from_name("  boston   RED sox ").unwrap());
    }

    #[test]
    fn unrecognised() {
        assert_eq!(
            Err(UnrecognizedTeam("Springfield Isotopes".into())),
            Team::from_name("Springfield Isotopes")
        );
        assert_eq!(Err(UnrecognizedTeam("".into())), Team::from_name(""));
    }

    #[test]
    fn aliases_do_not_shadow_codes() {
        for (alias, _) in ALIASES {
            assert!(
                Team::iter().all(|team| !team.code().eq_ignore_ascii_case(alias)),
                "alias {alias} duplicates a canonical code"
            );
        }
    }
}
