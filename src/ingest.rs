//! Loads season batting statistics, assigns league membership and applies the
//! playing-time eligibility filter. Rows with missing values are dropped;
//! structural problems (bad numbers, unknown team codes, missing columns) are
//! fatal before any modeling happens.

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use serde::Deserialize;

use crate::error::PipelineError;

/// Eligibility floor: a season shorter than this is not MVP material.
pub const MIN_GAMES: u32 = 100;
pub const MIN_AT_BATS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum League {
    AL,
    NL,
}

impl League {
    pub fn name(self) -> &'static str {
        match self {
            League::AL => "American League",
            League::NL => "National League",
        }
    }
}

/// Immutable team-code -> league lookup. Passed into ingestion explicitly so
/// tests can inject alternate league structures (expansion, relocation).
#[derive(Debug, Clone)]
pub struct LeagueMap(HashMap<String, League>);

impl LeagueMap {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = (S, League)>,
        S: Into<String>,
    {
        Self(teams.into_iter().map(|(t, l)| (t.into(), l)).collect())
    }

    pub fn league_of(&self, team: &str) -> Option<League> {
        self.0.get(team).copied()
    }
}

impl Default for LeagueMap {
    fn default() -> Self {
        const AL: [&str; 15] = [
            "NYY", "BOS", "TOR", "BAL", "TBR", "CLE", "DET", "KCR", "MIN", "CHW", "HOU", "LAA",
            "OAK", "SEA", "TEX",
        ];
        const NL: [&str; 15] = [
            "ATL", "MIA", "NYM", "PHI", "WSN", "CHC", "CIN", "MIL", "PIT", "STL", "ARI", "COL",
            "LAD", "SDP", "SFG",
        ];
        Self::new(
            AL.iter()
                .map(|&t| (t, League::AL))
                .chain(NL.iter().map(|&t| (t, League::NL))),
        )
    }
}

/// One eligible player-season. Rate stats are already coerced to floats.
#[derive(Debug, Clone)]
pub struct PlayerSeason {
    pub name: String,
    pub team: String,
    pub league: League,
    /// All listed positions; the first one is authoritative.
    pub positions: Vec<String>,
    pub games: u32,
    pub at_bats: u32,
    pub hits: u32,
    pub doubles: u32,
    pub triples: u32,
    pub home_runs: u32,
    pub runs: u32,
    pub rbi: u32,
    pub stolen_bases: u32,
    pub walks: u32,
    pub strikeouts: u32,
    pub hit_by_pitch: u32,
    pub sac_flies: u32,
    pub avg: f64,
    pub obp: f64,
    pub slg: f64,
    pub ops: f64,
}

impl PlayerSeason {
    pub fn primary_position(&self) -> &str {
        self.positions.first().map(String::as_str).unwrap_or("")
    }
}

const REQUIRED_COLUMNS: [&str; 20] = [
    "Player", "Team", "Pos", "G", "AB", "R", "H", "2B", "3B", "HR", "RBI", "SB", "BB", "SO",
    "HBP", "SF", "BA", "OBP", "SLG", "OPS",
];

/// Raw CSV row; every field optional so a missing value drops the row instead
/// of failing deserialization. Rate stats stay as text until coercion.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Player")]
    player: Option<String>,
    #[serde(rename = "Team")]
    team: Option<String>,
    #[serde(rename = "Pos")]
    pos: Option<String>,
    #[serde(rename = "G")]
    games: Option<u32>,
    #[serde(rename = "AB")]
    at_bats: Option<u32>,
    #[serde(rename = "R")]
    runs: Option<u32>,
    #[serde(rename = "H")]
    hits: Option<u32>,
    #[serde(rename = "2B")]
    doubles: Option<u32>,
    #[serde(rename = "3B")]
    triples: Option<u32>,
    #[serde(rename = "HR")]
    home_runs: Option<u32>,
    #[serde(rename = "RBI")]
    rbi: Option<u32>,
    #[serde(rename = "SB")]
    stolen_bases: Option<u32>,
    #[serde(rename = "BB")]
    walks: Option<u32>,
    #[serde(rename = "SO")]
    strikeouts: Option<u32>,
    #[serde(rename = "HBP")]
    hit_by_pitch: Option<u32>,
    #[serde(rename = "SF")]
    sac_flies: Option<u32>,
    #[serde(rename = "BA")]
    avg: Option<String>,
    #[serde(rename = "OBP")]
    obp: Option<String>,
    #[serde(rename = "SLG")]
    slg: Option<String>,
    #[serde(rename = "OPS")]
    ops: Option<String>,
}

fn parse_rate(field: &'static str, value: &str, line: u64) -> Result<f64, PipelineError> {
    value.parse::<f64>().map_err(|_| PipelineError::BadNumber {
        line,
        field,
        value: value.to_string(),
    })
}

/// Reads the batting CSV and returns the eligible player-season set.
pub fn load_batting_csv(path: &Path, leagues: &LeagueMap) -> Result<Vec<PlayerSeason>, PipelineError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = rdr.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(PipelineError::MissingColumn(col));
        }
    }

    let mut eligible = Vec::new();
    let mut dropped = 0usize;
    let mut short_seasons = 0usize;
    for result in rdr.records() {
        let record: StringRecord = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw: RawRow = record
            .deserialize(Some(&headers))
            .map_err(|source| PipelineError::MalformedRow { line, source })?;

        // any missing value drops the whole row, no imputation
        let (
            Some(player),
            Some(team),
            Some(pos),
            Some(games),
            Some(at_bats),
            Some(runs),
            Some(hits),
            Some(doubles),
            Some(triples),
            Some(home_runs),
            Some(rbi),
            Some(stolen_bases),
            Some(walks),
            Some(strikeouts),
            Some(hit_by_pitch),
            Some(sac_flies),
            Some(avg),
            Some(obp),
            Some(slg),
            Some(ops),
        ) = (
            raw.player,
            raw.team,
            raw.pos,
            raw.games,
            raw.at_bats,
            raw.runs,
            raw.hits,
            raw.doubles,
            raw.triples,
            raw.home_runs,
            raw.rbi,
            raw.stolen_bases,
            raw.walks,
            raw.strikeouts,
            raw.hit_by_pitch,
            raw.sac_flies,
            raw.avg,
            raw.obp,
            raw.slg,
            raw.ops,
        )
        else {
            dropped += 1;
            debug!("line {line}: dropped row with missing fields");
            continue;
        };

        let league = leagues
            .league_of(&team)
            .ok_or_else(|| PipelineError::UnknownTeam {
                line,
                team: team.clone(),
            })?;

        if games < MIN_GAMES || at_bats < MIN_AT_BATS {
            short_seasons += 1;
            continue;
        }

        let positions: Vec<String> = pos
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        eligible.push(PlayerSeason {
            name: player,
            team,
            league,
            positions,
            games,
            at_bats,
            hits,
            doubles,
            triples,
            home_runs,
            runs,
            rbi,
            stolen_bases,
            walks,
            strikeouts,
            hit_by_pitch,
            sac_flies,
            avg: parse_rate("BA", &avg, line)?,
            obp: parse_rate("OBP", &obp, line)?,
            slg: parse_rate("SLG", &slg, line)?,
            ops: parse_rate("OPS", &ops, line)?,
        });
    }

    info!(
        "ingested {} eligible player-seasons ({dropped} incomplete rows dropped, {short_seasons} below the playing-time floor)",
        eligible.len()
    );
    Ok(eligible)
}

/// A plausible full-time season for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn test_season(name: &str, league: League) -> PlayerSeason {
    PlayerSeason {
        name: name.to_string(),
        team: match league {
            League::AL => "NYY".to_string(),
            League::NL => "LAD".to_string(),
        },
        league,
        positions: vec!["RF".to_string()],
        games: 150,
        at_bats: 550,
        hits: 160,
        doubles: 30,
        triples: 2,
        home_runs: 25,
        runs: 90,
        rbi: 85,
        stolen_bases: 10,
        walks: 60,
        strikeouts: 120,
        hit_by_pitch: 5,
        sac_flies: 4,
        avg: 0.291,
        obp: 0.360,
        slg: 0.490,
        ops: 0.850,
    }
}
