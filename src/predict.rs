//! Scores the season through the trained bundle, applies the manual boosts
//! for statistically dominant seasons and normalizes probabilities into
//! per-league percentage distributions.

use crate::features::{feature_matrix, Engineered};
use crate::ingest::{League, PlayerSeason};
use crate::model::ModelBundle;

/// Manual probability overrides, kept as a named rule table rather than
/// inline constants.
#[derive(Debug, Clone)]
pub struct BoostRules {
    /// OPS above this with more than `ceiling_hr` homers pins the
    /// probability to 1.0 outright.
    pub ceiling_ops: f64,
    pub ceiling_hr: u32,
    pub elite_ops: f64,
    pub elite_hr: u32,
    pub elite_mult: f64,
    pub rbi_cutoff: u32,
    pub rbi_mult: f64,
    /// Minimum boosted probability for a player to stay in the race at all.
    pub relevance_floor: f64,
}

impl Default for BoostRules {
    fn default() -> Self {
        Self {
            ceiling_ops: 1.100,
            ceiling_hr: 50,
            elite_ops: 1.000,
            elite_hr: 40,
            elite_mult: 1.15,
            rbi_cutoff: 130,
            rbi_mult: 1.1,
            relevance_floor: 0.001,
        }
    }
}

impl BoostRules {
    /// A ceilinged season is exactly 1.0 and ignores the multiplicative
    /// rules; otherwise the elite and RBI boosts compound.
    pub fn apply(&self, probability: f64, season: &PlayerSeason) -> f64 {
        if season.ops > self.ceiling_ops && season.home_runs > self.ceiling_hr {
            return 1.0;
        }
        let mut p = probability;
        if season.ops > self.elite_ops && season.home_runs > self.elite_hr {
            p *= self.elite_mult;
        }
        if season.rbi > self.rbi_cutoff {
            p *= self.rbi_mult;
        }
        p
    }
}

/// Final output row for one player: identity, headline stats, raw probability
/// and the within-league normalized percentage.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub name: String,
    pub team: String,
    pub position: String,
    pub games: u32,
    pub avg: f64,
    pub home_runs: u32,
    pub rbi: u32,
    pub runs: u32,
    pub stolen_bases: u32,
    pub ops: f64,
    pub probability: f64,
    pub pct: f64,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Ranks one league: boost, apply the relevance floor, normalize the retained
/// probabilities to percentages and order by descending probability.
pub fn rank_league(
    players: &[Engineered],
    probs: &[f64],
    league: League,
    rules: &BoostRules,
) -> Vec<CandidateResult> {
    let retained: Vec<(&Engineered, f64)> = players
        .iter()
        .zip(probs)
        .filter(|(p, _)| p.season.league == league)
        .map(|(p, &prob)| (p, rules.apply(prob, &p.season)))
        .filter(|(_, boosted)| *boosted >= rules.relevance_floor)
        .collect();

    let total: f64 = retained.iter().map(|(_, p)| p).sum();
    let mut results: Vec<CandidateResult> = retained
        .into_iter()
        .map(|(p, boosted)| CandidateResult {
            name: p.season.name.clone(),
            team: p.season.team.clone(),
            position: p.season.primary_position().to_string(),
            games: p.season.games,
            avg: p.season.avg,
            home_runs: p.season.home_runs,
            rbi: p.season.rbi,
            runs: p.season.runs,
            stolen_bases: p.season.stolen_bases,
            ops: p.season.ops,
            probability: boosted,
            pct: round1(boosted / total * 100.0),
        })
        .collect();
    results.sort_by(|a, b| {
        b.probability
            .total_cmp(&a.probability)
            .then_with(|| a.name.cmp(&b.name))
    });
    results
}

/// Scores every player once through the bundle and produces the (AL, NL)
/// ranked candidate lists.
pub fn rank_candidates(
    bundle: &ModelBundle,
    players: &[Engineered],
    rules: &BoostRules,
) -> (Vec<CandidateResult>, Vec<CandidateResult>) {
    let probs = bundle.probabilities(&feature_matrix(players));
    (
        rank_league(players, &probs, League::AL, rules),
        rank_league(players, &probs, League::NL, rules),
    )
}
