//! Synthetic training labels: a weighted composite MVP score per player and a
//! per-league selective percentile cutoff. No real voting ground truth exists,
//! so labels are recomputed on every run.

use log::debug;

use crate::features::Engineered;
use crate::ingest::League;

/// Hand-tuned coefficient table behind the composite score. Kept as a named
/// config so weights can be tuned or swapped without touching pipeline logic.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub ops: f64,
    pub hr: f64,
    pub hr_per_g: f64,
    pub rbi: f64,
    pub run_prod_per_g: f64,
    pub tb_per_g: f64,
    pub sb_per_g: f64,
    pub power_score: f64,
    pub bb_to_so: f64,
    pub pos_value: f64,
    /// Applied once to seasons with OPS >= 1.000 and 40+ home runs.
    pub exceptional_boost: f64,
    /// Per-league selectivity of the positive class.
    pub percentile: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ops: 0.35,
            hr: 0.007,
            hr_per_g: 0.15,
            rbi: 0.005,
            run_prod_per_g: 0.15,
            tb_per_g: 0.15,
            sb_per_g: 0.03,
            power_score: 0.0015,
            bb_to_so: 0.05,
            pos_value: 0.02,
            exceptional_boost: 1.2,
            percentile: 0.97,
        }
    }
}

impl ScoreWeights {
    pub fn score(&self, p: &Engineered) -> f64 {
        let base = p.season.ops * self.ops
            + f64::from(p.season.home_runs) * self.hr
            + p.hr_per_g * self.hr_per_g
            + f64::from(p.season.rbi) * self.rbi
            + p.run_prod_per_g * self.run_prod_per_g
            + p.tb_per_g * self.tb_per_g
            + p.sb_per_g * self.sb_per_g
            + p.power_score * self.power_score
            + p.bb_to_so * self.bb_to_so
            + p.pos_value * self.pos_value;
        if p.season.ops >= 1.0 && p.season.home_runs >= 40 {
            base * self.exceptional_boost
        } else {
            base
        }
    }
}

/// Scores every player and flags, independently per league, those at or above
/// that league's percentile cutoff of the (possibly boosted) score.
pub fn synthesize_labels(players: &mut [Engineered], weights: &ScoreWeights) {
    for p in players.iter_mut() {
        p.mvp_score = weights.score(p);
    }
    for league in [League::AL, League::NL] {
        let mut scores: Vec<f64> = players
            .iter()
            .filter(|p| p.season.league == league)
            .map(|p| p.mvp_score)
            .collect();
        if scores.is_empty() {
            continue;
        }
        scores.sort_by(f64::total_cmp);
        let cutoff = percentile(&scores, weights.percentile);
        let flagged = players
            .iter_mut()
            .filter(|p| p.season.league == league)
            .map(|p| {
                p.candidate = p.mvp_score >= cutoff;
                usize::from(p.candidate)
            })
            .sum::<usize>();
        debug!(
            "{}: cutoff {cutoff:.4}, {flagged} of {} flagged",
            league.name(),
            scores.len()
        );
    }
}

/// Linear-interpolated percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
