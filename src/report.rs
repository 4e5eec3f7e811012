//! Presentation collaborators: console tables for the ranked candidates and
//! training diagnostics, plus the per-league chance chart. Consumes the data
//! contract only; nothing here mutates or re-derives pipeline values.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::model::TrainReport;
use crate::predict::CandidateResult;

/// Fixed-width console table over the top 10 candidates of one league.
pub fn league_table(title: &str, results: &[CandidateResult]) -> String {
    let mut out = format!("\n{title}\n");
    if results.is_empty() {
        out.push_str("  no significant candidates\n");
        return out;
    }
    out.push_str(&format!(
        "{:<4} {:<22} {:<5} {:<5} {:>4} {:>6} {:>4} {:>5} {:>5} {:>4} {:>6} {:>7}\n",
        "#", "Player", "Team", "Pos", "G", "AVG", "HR", "RBI", "R", "SB", "OPS", "Chance"
    ));
    for (i, r) in results.iter().take(10).enumerate() {
        out.push_str(&format!(
            "{:<4} {:<22} {:<5} {:<5} {:>4} {:>6.3} {:>4} {:>5} {:>5} {:>4} {:>6.3} {:>6.1}%\n",
            i + 1,
            r.name,
            r.team,
            r.position,
            r.games,
            r.avg,
            r.home_runs,
            r.rbi,
            r.runs,
            r.stolen_bases,
            r.ops,
            r.pct
        ));
    }
    out
}

/// Training diagnostics: accuracies, positive-class metrics and the feature
/// importance ranking.
pub fn metrics_summary(report: &TrainReport) -> String {
    let mut out = String::from("\nModel evaluation\n");
    out.push_str(&format!(
        "  accuracy: train {:.3}, test {:.3}\n",
        report.train_accuracy, report.test_accuracy
    ));
    out.push_str(&format!(
        "  candidate class: precision {:.3}, recall {:.3}, F1 {:.3}\n",
        report.precision, report.recall, report.f1
    ));
    out.push_str("  feature importances:\n");
    for (name, gain) in &report.importances {
        out.push_str(&format!("    {name:<16} {gain:>7.4}\n"));
    }
    out
}

/// Renders the output artifact: two horizontal bar charts (AL on top, NL
/// below) of every player with at least a 1.0% chance, ascending for display,
/// bars labeled with their percentages.
pub fn render_chance_chart(
    path: &Path,
    al: &[CandidateResult],
    nl: &[CandidateResult],
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1000, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));
    draw_league_panel(&panels[0], "American League MVP Chances", al, &BLUE)?;
    draw_league_panel(&panels[1], "National League MVP Chances", nl, &RED)?;
    root.present()?;
    Ok(())
}

fn draw_league_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    caption: &str,
    results: &[CandidateResult],
    color: &RGBColor,
) -> Result<(), Box<dyn Error>> {
    let mut shown: Vec<&CandidateResult> = results.iter().filter(|r| r.pct >= 1.0).collect();
    shown.sort_by(|a, b| a.pct.total_cmp(&b.pct));

    if shown.is_empty() {
        area.draw(&Text::new(
            caption.to_string(),
            (40, 30),
            ("sans-serif", 24).into_font(),
        ))?;
        area.draw(&Text::new(
            "no significant candidates".to_string(),
            (60, 80),
            ("sans-serif", 20).into_font(),
        ))?;
        return Ok(());
    }

    let count = shown.len();
    let max_pct = shown
        .iter()
        .map(|r| r.pct)
        .fold(f64::NEG_INFINITY, f64::max);
    let names: Vec<&str> = shown.iter().map(|r| r.name.as_str()).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(180)
        .build_cartesian_2d(0.0..max_pct * 1.15, 0..count)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(count)
        .y_label_formatter(&|idx| {
            let i = *idx;
            if i < count {
                names[i].to_string()
            } else {
                String::new()
            }
        })
        .x_desc("Chance (%)")
        .draw()?;

    chart.draw_series(shown.iter().enumerate().map(|(i, r)| {
        Rectangle::new([(0.0, i), (r.pct, i + 1)], color.mix(0.5).filled())
    }))?;
    // percentage label just past the end of each bar
    chart.draw_series(shown.iter().enumerate().map(|(i, r)| {
        Text::new(
            format!("{:.1}%", r.pct),
            (r.pct + max_pct * 0.01, i),
            ("sans-serif", 14).into_font(),
        )
    }))?;

    Ok(())
}
