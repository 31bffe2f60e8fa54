//! Human-readable report rendering.
//!
//! Produces the three classical sections - between-subjects effects,
//! within-subjects effects (four rows per effect, one per sphericity
//! treatment), and estimated marginal means. Numbers are fixed to a
//! configurable number of decimals, `-` marks a cell that does not apply
//! to its row, and an empty cell marks a value that is unavailable.

use super::{AnovaResult, Corrected, EffectEntry, EffectStats};

/// Rendering options.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Decimal places for statistics (p-values always use three)
    pub decimals: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { decimals: 3 }
    }
}

const NA: &str = "-";

const HEADERS: [&str; 13] = [
    "Source",
    "\u{03b5}",
    "SS",
    "df",
    "MS",
    "F",
    "Sig.",
    "\u{03b7}\u{00b2}_G",
    "Obs.",
    "SE",
    "95% CI",
    "\u{03bb}",
    "Obs. Power",
];

/// Render the full report for one analysis.
pub fn report(result: &AnovaResult, options: &ReportOptions) -> String {
    let mut out = String::new();
    let d = options.decimals;

    let dv_label = match &result.measure {
        Some(measure) => format!("{}_{}", result.dv, measure),
        None => result.dv.clone(),
    };

    let between: Vec<&EffectEntry> = result
        .effects
        .iter()
        .filter(|e| e.stats.sphericity.is_none())
        .collect();
    let within: Vec<&EffectEntry> = result
        .effects
        .iter()
        .filter(|e| e.stats.sphericity.is_some())
        .collect();

    if !between.is_empty() {
        out.push_str(&format!("Tests of Between-Subjects Effects ({})\n\n", dv_label));
        let mut rows = Vec::new();
        for entry in &between {
            rows.push(effect_row(&entry.key.label(), &entry.stats, d));
        }
        if let Some(first) = between.first() {
            rows.push(error_row("Error", first.stats.sse, first.stats.dfe, first.stats.mse, d));
        }
        push_table(&mut out, &rows, false);
        out.push('\n');
    }

    if !within.is_empty() {
        out.push_str(&format!("Tests of Within-Subjects Effects ({})\n\n", dv_label));
        let mut rows = Vec::new();
        for entry in &within {
            let stats = &entry.stats;
            let sph = stats.sphericity.as_ref().expect("filtered on presence");
            rows.push(within_row(&entry.key.label(), stats, d));
            rows.push(corrected_row("  Greenhouse-Geisser", sph.eps_gg, &sph.gg, stats, d));
            rows.push(corrected_row("  Huynh-Feldt", sph.eps_hf, &sph.hf, stats, d));
            rows.push(corrected_row("  Box", sph.eps_lb, &sph.lb, stats, d));
        }
        // one error block per distinct error term, in first-use order
        let mut seen: Vec<(u64, String)> = Vec::new();
        for entry in &within {
            let stats = &entry.stats;
            let fingerprint = stats.sse.to_bits() ^ stats.dfe.to_bits();
            if seen.iter().any(|(f, _)| *f == fingerprint) {
                continue;
            }
            seen.push((fingerprint, entry.key.label()));
            rows.push(error_row(
                &format!("Error({})", entry.key.label()),
                stats.sse,
                stats.dfe,
                stats.mse,
                d,
            ));
        }
        push_table(&mut out, &rows, true);
        out.push('\n');
    }

    out.push_str("Tables of Estimated Marginal Means\n\n");
    for entry in &result.effects {
        marginal_table(&mut out, result, entry, d);
    }

    if let (Some(total), Some(subject)) = (result.aggregate("TOTAL"), result.aggregate("SUBJECT")) {
        out.push_str(&format!(
            "Total SS = {} (df = {}), subject SS = {} (df = {})\n",
            fmt(total.ss, d),
            fmt(total.df, d),
            fmt(subject.ss, d),
            fmt(subject.df, d),
        ));
    }
    out
}

fn effect_row(label: &str, s: &EffectStats, d: usize) -> Vec<String> {
    vec![
        label.to_string(),
        NA.to_string(),
        fmt(s.ss, d),
        fmt(s.df, d),
        fmt(s.mss, d),
        fmt(s.f, d),
        fmt(s.p, 3),
        fmt(s.eta, d),
        fmt(s.obs, d),
        fmt(s.se, d),
        fmt(s.ci, d),
        fmt(s.lambda, d),
        fmt(s.power, d),
    ]
}

/// Uncorrected row of a within effect ("Sphericity Assumed").
fn within_row(label: &str, s: &EffectStats, d: usize) -> Vec<String> {
    let mut row = effect_row(&format!("{}  Sphericity Assumed", label), s, d);
    row[1] = NA.to_string();
    row
}

fn corrected_row(label: &str, eps: f64, c: &Corrected, s: &EffectStats, d: usize) -> Vec<String> {
    vec![
        label.to_string(),
        fmt(eps, d),
        fmt(s.ss, d),
        fmt(c.df, d),
        fmt(c.mss, d),
        fmt(c.f, d),
        fmt(c.p, 3),
        fmt(s.eta, d),
        fmt(s.obs, d),
        fmt(c.se, d),
        fmt(c.ci, d),
        fmt(c.lambda, d),
        fmt(c.power, d),
    ]
}

fn error_row(label: &str, sse: f64, dfe: f64, mse: f64, d: usize) -> Vec<String> {
    vec![
        label.to_string(),
        NA.to_string(),
        fmt(sse, d),
        fmt(dfe, d),
        fmt(mse, d),
        NA.to_string(),
        NA.to_string(),
        NA.to_string(),
        NA.to_string(),
        NA.to_string(),
        NA.to_string(),
        NA.to_string(),
        NA.to_string(),
    ]
}

fn marginal_table(out: &mut String, result: &AnovaResult, entry: &EffectEntry, d: usize) {
    let indices: Vec<usize> = entry
        .key
        .names()
        .iter()
        .map(|n| {
            result
                .factor_names
                .iter()
                .position(|f| f == n)
                .expect("keys are built from factor names")
        })
        .collect();
    let level_sets: Vec<&Vec<String>> = indices.iter().map(|&i| &result.factor_levels[i]).collect();

    out.push_str(&format!("Estimated Marginal Means of {}\n", entry.key.label()));
    let labels = cartesian_labels(&level_sets);
    let width = labels
        .iter()
        .map(String::len)
        .chain(std::iter::once(entry.key.label().len()))
        .max()
        .unwrap_or(8)
        .max(8);
    for (label, mean) in labels.iter().zip(&entry.stats.y2) {
        out.push_str(&format!("  {:<width$}  {}\n", label, fmt(*mean, d), width = width));
    }
    out.push('\n');
}

fn cartesian_labels(level_sets: &[&Vec<String>]) -> Vec<String> {
    let mut out = vec![String::new()];
    for set in level_sets {
        let mut next = Vec::with_capacity(out.len() * set.len());
        for prefix in &out {
            for level in *set {
                if prefix.is_empty() {
                    next.push(level.clone());
                } else {
                    next.push(format!("{}, {}", prefix, level));
                }
            }
        }
        out = next;
    }
    out
}

fn push_table(out: &mut String, rows: &[Vec<String>], with_eps: bool) {
    // drop the epsilon column for purely between tables
    let columns: Vec<usize> = if with_eps {
        (0..HEADERS.len()).collect()
    } else {
        (0..HEADERS.len()).filter(|&c| c != 1).collect()
    };

    let mut widths: Vec<usize> = columns.iter().map(|&c| HEADERS[c].chars().count()).collect();
    for row in rows {
        for (slot, &c) in columns.iter().enumerate() {
            widths[slot] = widths[slot].max(row[c].chars().count());
        }
    }

    let mut line = String::new();
    for (slot, &c) in columns.iter().enumerate() {
        if slot == 0 {
            line.push_str(&format!("{:<width$}", HEADERS[c], width = widths[slot]));
        } else {
            line.push_str(&format!("  {:>width$}", HEADERS[c], width = widths[slot]));
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
    out.push_str(&"\u{2500}".repeat(line.trim_end().chars().count()));
    out.push('\n');

    for row in rows {
        let mut line = String::new();
        for (slot, &c) in columns.iter().enumerate() {
            if slot == 0 {
                line.push_str(&format!("{:<width$}", row[c], width = widths[slot]));
            } else {
                line.push_str(&format!("  {:>width$}", row[c], width = widths[slot]));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

fn fmt(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    format!("{:.*}", decimals, value)
}
