//! Pure feature engineering: derives compound offensive metrics from a raw
//! player-season. No randomness, no side effects; identical input rows always
//! produce identical features.

use ndarray::Array2;

use crate::ingest::PlayerSeason;

/// Ordered names of the model's input features. `Engineered::feature_row`
/// must stay in sync with this list.
pub const FEATURE_NAMES: [&str; 18] = [
    "AVG",
    "OBP",
    "SLG",
    "OPS",
    "HR",
    "RBI",
    "R",
    "SB",
    "BB_rate",
    "BB_to_SO",
    "TotalBases",
    "PowerScore",
    "RunCreation",
    "StarPower_Adj",
    "OPSxRunProd",
    "AVGxTB",
    "SLGxHR",
    "OBPxSB",
];

/// Player-season plus every derived field the downstream stages read.
/// `mvp_score` and `candidate` start zeroed and are filled in by label
/// synthesis.
#[derive(Debug, Clone)]
pub struct Engineered {
    pub season: PlayerSeason,
    pub total_bases: u32,
    pub power_score: f64,
    pub run_creation: f64,
    pub run_prod: u32,
    pub hr_per_g: f64,
    pub rbi_per_g: f64,
    pub r_per_g: f64,
    pub h_per_g: f64,
    pub tb_per_g: f64,
    pub run_prod_per_g: f64,
    pub sb_per_g: f64,
    pub hr_per_ab: f64,
    pub tb_per_ab: f64,
    pub bb_rate: f64,
    pub bb_to_so: f64,
    pub ops_x_run_prod: f64,
    pub avg_x_tb: f64,
    pub slg_x_hr: f64,
    pub obp_x_sb: f64,
    pub star_power: f64,
    pub pos_value: f64,
    pub star_power_adj: f64,
    pub mvp_score: f64,
    pub candidate: bool,
}

/// Multiplier for the primary defensive position. Premium up-the-middle spots
/// sit above 1.0, bat-only spots below; unmapped codes stay neutral.
pub fn position_value(pos: &str) -> f64 {
    match pos {
        "C" => 1.20,
        "SS" => 1.15,
        "2B" => 1.10,
        "CF" => 1.10,
        "3B" => 1.05,
        "1B" => 0.95,
        "DH" => 0.90,
        _ => 1.00,
    }
}

pub fn engineer(season: PlayerSeason) -> Engineered {
    let g = f64::from(season.games);
    let ab = f64::from(season.at_bats);
    let hr = f64::from(season.home_runs);
    let rbi = f64::from(season.rbi);
    let runs = f64::from(season.runs);
    let sb = f64::from(season.stolen_bases);
    let bb = f64::from(season.walks);

    // integer arithmetic, exact by construction
    let total_bases =
        season.hits + season.doubles + 2 * season.triples + 3 * season.home_runs;
    let tb = f64::from(total_bases);
    let run_prod = season.runs + season.rbi;
    let rp = f64::from(run_prod);

    let power_score =
        1.5 * hr + 0.3 * f64::from(season.doubles) + 0.7 * f64::from(season.triples)
            + 100.0 * season.slg;
    let run_creation = 0.6 * runs + 0.4 * rbi;

    let plate_appearances =
        ab + bb + f64::from(season.hit_by_pitch) + f64::from(season.sac_flies);
    // zero strikeouts counts as one so the ratio stays finite
    let bb_to_so = bb / f64::from(season.strikeouts.max(1));

    let star_power = 150.0 * season.ops + 5.0 * hr + 2.0 * rbi + runs + sb;
    let pos_value = position_value(season.positions.first().map_or("", String::as_str));

    Engineered {
        total_bases,
        power_score,
        run_creation,
        run_prod,
        hr_per_g: hr / g,
        rbi_per_g: rbi / g,
        r_per_g: runs / g,
        h_per_g: f64::from(season.hits) / g,
        tb_per_g: tb / g,
        run_prod_per_g: rp / g,
        sb_per_g: sb / g,
        hr_per_ab: hr / ab,
        tb_per_ab: tb / ab,
        bb_rate: bb / plate_appearances,
        bb_to_so,
        ops_x_run_prod: season.ops * rp,
        avg_x_tb: season.avg * tb,
        slg_x_hr: season.slg * hr,
        obp_x_sb: season.obp * sb,
        star_power,
        pos_value,
        star_power_adj: star_power * pos_value,
        mvp_score: 0.0,
        candidate: false,
        season,
    }
}

impl Engineered {
    /// Numeric projection in `FEATURE_NAMES` order.
    pub fn feature_row(&self) -> [f64; 18] {
        [
            self.season.avg,
            self.season.obp,
            self.season.slg,
            self.season.ops,
            f64::from(self.season.home_runs),
            f64::from(self.season.rbi),
            f64::from(self.season.runs),
            f64::from(self.season.stolen_bases),
            self.bb_rate,
            self.bb_to_so,
            f64::from(self.total_bases),
            self.power_score,
            self.run_creation,
            self.star_power_adj,
            self.ops_x_run_prod,
            self.avg_x_tb,
            self.slg_x_hr,
            self.obp_x_sb,
        ]
    }
}

/// Stacks every player's feature row into an (n, 18) matrix.
pub fn feature_matrix(players: &[Engineered]) -> Array2<f64> {
    let mut x = Array2::zeros((players.len(), FEATURE_NAMES.len()));
    for (i, p) in players.iter().enumerate() {
        for (j, v) in p.feature_row().into_iter().enumerate() {
            x[(i, j)] = v;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{test_season, League};

    #[test]
    fn total_bases_is_exact_integer_arithmetic() {
        let mut season = test_season("TB", League::AL);
        season.hits = 180;
        season.doubles = 28;
        season.triples = 3;
        season.home_runs = 62;
        let e = engineer(season);
        assert_eq!(e.total_bases, 180 + 28 + 2 * 3 + 3 * 62);
    }

    #[test]
    fn run_production_composites() {
        let mut season = test_season("RP", League::NL);
        season.runs = 100;
        season.rbi = 110;
        let e = engineer(season);
        assert_eq!(e.run_prod, 210);
        assert!((e.run_creation - (0.6 * 100.0 + 0.4 * 110.0)).abs() < 1e-12);
    }

    #[test]
    fn per_game_and_per_at_bat_rates() {
        let mut season = test_season("Rates", League::AL);
        season.games = 150;
        season.at_bats = 600;
        season.hits = 150;
        season.doubles = 30;
        season.triples = 0;
        season.home_runs = 30;
        season.runs = 90;
        season.rbi = 105;
        season.stolen_bases = 15;
        let e = engineer(season);
        assert!((e.hr_per_g - 0.2).abs() < 1e-12);
        assert!((e.rbi_per_g - 0.7).abs() < 1e-12);
        assert!((e.r_per_g - 0.6).abs() < 1e-12);
        assert!((e.h_per_g - 1.0).abs() < 1e-12);
        assert!((e.sb_per_g - 0.1).abs() < 1e-12);
        assert!((e.run_prod_per_g - 1.3).abs() < 1e-12);
        assert!((e.hr_per_ab - 0.05).abs() < 1e-12);
        // TB = 150 + 30 + 90 = 270
        assert!((e.tb_per_ab - 0.45).abs() < 1e-12);
        assert!((e.tb_per_g - 1.8).abs() < 1e-12);
    }

    #[test]
    fn zero_strikeouts_caps_walk_ratio() {
        let mut season = test_season("Contact", League::AL);
        season.walks = 70;
        season.strikeouts = 0;
        let e = engineer(season);
        assert!((e.bb_to_so - 70.0).abs() < 1e-12);
        assert!(e.bb_to_so.is_finite());
    }

    #[test]
    fn position_multiplier_bounds_and_default() {
        for pos in ["C", "SS", "2B", "CF", "3B", "1B", "DH", "LF", "RF", "OF", "UT"] {
            let v = position_value(pos);
            assert!((0.9..=1.2).contains(&v), "{pos} multiplier {v} out of range");
        }
        assert!((position_value("P") - 1.0).abs() < 1e-12);
        assert!((position_value("") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn star_power_uses_primary_position() {
        let mut season = test_season("Backstop", League::AL);
        season.positions = vec!["C".to_string(), "1B".to_string()];
        let e = engineer(season);
        assert!((e.pos_value - 1.20).abs() < 1e-12);
        assert!((e.star_power_adj - e.star_power * 1.20).abs() < 1e-9);
    }

    #[test]
    fn engineering_is_deterministic() {
        let a = engineer(test_season("Twin", League::NL));
        let b = engineer(test_season("Twin", League::NL));
        assert_eq!(a.feature_row(), b.feature_row());
    }

    #[test]
    fn feature_matrix_matches_rows() {
        let players: Vec<Engineered> = vec![
            engineer(test_season("One", League::AL)),
            engineer(test_season("Two", League::NL)),
        ];
        let x = feature_matrix(&players);
        assert_eq!(x.dim(), (2, FEATURE_NAMES.len()));
        for (i, p) in players.iter().enumerate() {
            for (j, v) in p.feature_row().into_iter().enumerate() {
                assert_eq!(x[(i, j)], v);
            }
        }
    }
}
