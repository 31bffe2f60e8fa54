//! Factorial analysis of variance over long-format observation tables.
//!
//! The engine computes between-subjects, within-subjects, and mixed-design
//! factorial ANOVA from a [`DataFrame`]: sums of squares, F and p,
//! generalized eta squared, sphericity corrections
//! (Greenhouse-Geisser, Huynh-Feldt, Box), Loftus-Masson intervals,
//! noncentrality, and observed power.
//!
//! Entry point is [`run`]. The design kind is dispatched from the factor
//! lists: only within factors, only between factors, or both.
//!
//! ```no_run
//! use fieldstat_core::anova::{run, Transform};
//! use fieldstat_shared::DataFrame;
//!
//! # fn demo(table: &DataFrame) -> Result<(), fieldstat_core::anova::AnovaError> {
//! let result = run(
//!     table,
//!     "rt",
//!     &["angle", "noise"],
//!     &[],
//!     "subject",
//!     Some("ms"),
//!     Transform::None,
//!     0.05,
//! )?;
//! let angle = result.effect(&["angle"]).unwrap();
//! println!("F({}, {}) = {:.3}", angle.df, angle.dfe, angle.f);
//! # Ok(())
//! # }
//! ```

pub mod contrast;
pub mod effects;
pub mod error;
pub mod render;
pub mod sphericity;
pub mod transform;

mod between;
mod mixed;
mod within;

use ndarray::Array2;
use serde::Serialize;

use fieldstat_shared::{numeric, DataFrame};

pub use effects::{generalized_eta, loftus_masson, noncentrality, observed_power, Corrected};
pub use error::{AnalysisResult, AnovaError};
pub use sphericity::{eps_gg, eps_hf, eps_lb};
pub use transform::{winsorize, Transform};

/// Which family of procedures produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignKind {
    Between,
    Within,
    Mixed,
}

/// Ordered tuple of factor names identifying one effect.
///
/// Keys are canonical: names appear in the order the factors were declared
/// (within factors first, then between factors).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EffectKey(Vec<String>);

impl EffectKey {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Human-readable label, `"angle"` or `"angle * noise"`.
    pub fn label(&self) -> String {
        self.0.join(" * ")
    }

    fn from_indices(indices: &[usize], factor_names: &[String]) -> Self {
        EffectKey(indices.iter().map(|&i| factor_names[i].clone()).collect())
    }
}

/// One effect's complete statistics row.
#[derive(Debug, Clone, Serialize)]
pub struct EffectStats {
    pub df: f64,
    pub dfe: f64,
    pub ss: f64,
    pub sse: f64,
    pub mss: f64,
    pub mse: f64,
    pub f: f64,
    pub p: f64,
    /// Generalized eta squared
    pub eta: f64,
    /// Observations per cell of the effect
    pub obs: f64,
    pub se: f64,
    pub ci: f64,
    pub crit_t: f64,
    /// Noncentrality parameter
    pub lambda: f64,
    /// Observed power
    pub power: f64,
    /// Estimated marginal means over the effect's cells, Kronecker order
    pub y2: Vec<f64>,
    /// Present on effects containing a within-subject factor
    pub sphericity: Option<Sphericity>,
}

/// Sphericity estimates and the three corrected statistic blocks.
#[derive(Debug, Clone, Serialize)]
pub struct Sphericity {
    pub eps_gg: f64,
    pub eps_hf: f64,
    pub eps_lb: f64,
    pub gg: Corrected,
    pub hf: Corrected,
    pub lb: Corrected,
}

/// An effect row keyed for lookup.
#[derive(Debug, Clone, Serialize)]
pub struct EffectEntry {
    pub key: EffectKey,
    pub stats: EffectStats,
}

/// Aggregate SS/df rows (`SUBJECT`, `WITHIN`, `TOTAL`).
#[derive(Debug, Clone, Serialize)]
pub struct AggregateEntry {
    pub key: EffectKey,
    pub ss: f64,
    pub df: f64,
}

/// Complete result of one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnovaResult {
    pub design: DesignKind,
    pub dv: String,
    pub measure: Option<String>,
    pub factor_names: Vec<String>,
    /// Sorted level labels per factor, in factor order
    pub factor_levels: Vec<Vec<String>>,
    pub n_within: usize,
    pub subjects: usize,
    pub conditions: usize,
    pub alpha: f64,
    pub transform: Transform,
    /// Observations replaced by Winsorizing
    pub trim: usize,
    /// Empty design cells imputed with the grand mean
    pub imputed_cells: usize,
    pub grand_mean: f64,
    /// Effect rows in enumeration order (mains first, then interactions)
    pub effects: Vec<EffectEntry>,
    /// `SUBJECT`, `WITHIN`, `TOTAL` aggregate rows
    pub aggregates: Vec<AggregateEntry>,
}

impl AnovaResult {
    /// Look up an effect by factor names, in any order.
    pub fn effect(&self, names: &[&str]) -> Option<&EffectStats> {
        let mut indices: Vec<usize> = names
            .iter()
            .map(|n| self.factor_names.iter().position(|f| f == n))
            .collect::<Option<_>>()?;
        indices.sort_unstable();
        let key = EffectKey::from_indices(&indices, &self.factor_names);
        self.effects
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.stats)
    }

    /// Look up an aggregate row (`"SUBJECT"`, `"WITHIN"`, `"TOTAL"`).
    pub fn aggregate(&self, name: &str) -> Option<&AggregateEntry> {
        self.aggregates
            .iter()
            .find(|a| a.key.names().len() == 1 && a.key.names()[0] == name)
    }
}

/// Raw material shared by the three procedures.
pub(crate) struct Context {
    pub factor_names: Vec<String>,
    pub arities: Vec<usize>,
    /// The first `n_within` factors are within-subject
    pub n_within: usize,
    /// Dense subjects x conditions pivot, empty cells imputed
    pub pivot: Array2<f64>,
    /// Actual (subject, condition, value) cells, imputation excluded
    pub observations: Vec<(usize, usize, f64)>,
    pub subjects: usize,
    pub grand_mean: f64,
    /// Population-style variance of the transformed dependent variable
    pub grand_var: f64,
    /// Sum of squared deviations of actual cells about the grand mean
    pub ss_total: f64,
    pub n_obs: usize,
    pub alpha: f64,
    pub trim: usize,
}

/// What a procedure hands back to [`run`].
pub(crate) struct Procedure {
    pub effects: Vec<(Vec<usize>, EffectStats)>,
    pub ss_subject: f64,
    pub df_subject: f64,
}

impl Context {
    /// Product of arities over a factor subset.
    pub fn cells_of(&self, subset: &[usize]) -> usize {
        subset.iter().map(|&i| self.arities[i]).product()
    }

    /// Effect degrees of freedom, `prod (D_i - 1)`.
    pub fn df_of(&self, subset: &[usize]) -> f64 {
        subset
            .iter()
            .map(|&i| self.arities[i] as f64 - 1.0)
            .product()
    }

    /// Observations per cell of the effect.
    pub fn obs_of(&self, subset: &[usize]) -> f64 {
        self.n_obs as f64 / self.cells_of(subset) as f64
    }

    /// Marginal means of the actual observations over the effect's cells.
    pub fn marginal_means(&self, subset: &[usize]) -> Vec<f64> {
        let width = self.cells_of(subset);
        let mut sums = vec![0.0; width];
        let mut counts = vec![0usize; width];
        for &(_, cond, value) in &self.observations {
            let cell = subset_index(cond, &self.arities, subset);
            sums[cell] += value;
            counts[cell] += 1;
        }
        sums.iter()
            .zip(&counts)
            .map(|(&s, &c)| if c > 0 { s / c as f64 } else { self.grand_mean })
            .collect()
    }

    /// Mean of each subject's actual observations.
    pub fn subject_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.subjects];
        let mut counts = vec![0usize; self.subjects];
        for &(subject, _, value) in &self.observations {
            sums[subject] += value;
            counts[subject] += 1;
        }
        sums.iter()
            .zip(&counts)
            .map(|(&s, &c)| if c > 0 { s / c as f64 } else { self.grand_mean })
            .collect()
    }
}

/// Decompose a condition index into per-factor levels (first factor slowest).
pub(crate) fn factor_levels(cond: usize, arities: &[usize]) -> Vec<usize> {
    let mut levels = vec![0usize; arities.len()];
    let mut rem = cond;
    for i in (0..arities.len()).rev() {
        levels[i] = rem % arities[i];
        rem /= arities[i];
    }
    levels
}

/// Re-compose a condition index over a factor subset, Kronecker order.
pub(crate) fn subset_index(cond: usize, arities: &[usize], subset: &[usize]) -> usize {
    let levels = factor_levels(cond, arities);
    subset.iter().fold(0, |acc, &i| acc * arities[i] + levels[i])
}

/// Run a factorial analysis of variance.
///
/// `wfactors` and `bfactors` name the within- and between-subject factor
/// columns; `sub` names the subject identifier column and `dv` the value
/// column. `measure` is an optional display label carried into reports.
/// The transform is applied to the dependent variable before any statistic.
///
/// The result is all-or-nothing: any shape, design, numeric, or transform
/// failure surfaces as an error before a partial table can escape. Empty
/// design cells do not fail; they are imputed with the grand mean, counted
/// in the result, and warned once.
#[allow(clippy::too_many_arguments)]
pub fn run(
    table: &DataFrame,
    dv: &str,
    wfactors: &[&str],
    bfactors: &[&str],
    sub: &str,
    measure: Option<&str>,
    transform: Transform,
    alpha: f64,
) -> AnalysisResult<AnovaResult> {
    if wfactors.is_empty() && bfactors.is_empty() {
        return Err(AnovaError::design("no factors given"));
    }
    for w in wfactors {
        if bfactors.contains(w) {
            return Err(AnovaError::design(format!(
                "factor '{}' is listed as both within and between",
                w
            )));
        }
    }
    let factor_cols: Vec<&str> = wfactors.iter().chain(bfactors.iter()).copied().collect();
    for (i, a) in factor_cols.iter().enumerate() {
        if factor_cols[..i].contains(a) {
            return Err(AnovaError::design(format!("factor '{}' listed twice", a)));
        }
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AnovaError::design(format!("alpha {} outside (0, 1)", alpha)));
    }

    let raw = table.numeric(dv)?;
    let (values, trim) = transform.apply(raw)?;

    let pivot = table.pivot_with(&values, sub, &factor_cols)?;
    let subjects = pivot.row_ids.len();
    if subjects < 2 {
        return Err(AnovaError::design(format!(
            "{} subject(s); at least 2 required",
            subjects
        )));
    }

    let factor_levels: Vec<Vec<String>> = factor_cols
        .iter()
        .map(|c| table.levels(c))
        .collect::<Result<_, _>>()?;
    let arities: Vec<usize> = factor_levels.iter().map(Vec::len).collect();
    let nd: usize = arities.iter().product();
    if pivot.matrix.ncols() != nd {
        return Err(AnovaError::input_shape(nd, pivot.matrix.ncols()));
    }

    let grand_mean = pivot.grand_mean;
    let grand_var = numeric::population_variance(&values);
    if grand_var <= 0.0 {
        return Err(AnovaError::numeric("constant dependent variable"));
    }

    let mut observations = Vec::with_capacity(subjects * nd);
    for s in 0..subjects {
        for c in 0..nd {
            if pivot.counts[[s, c]] > 0 {
                observations.push((s, c, pivot.matrix[[s, c]]));
            }
        }
    }
    let ss_total: f64 = observations
        .iter()
        .map(|&(_, _, v)| (v - grand_mean) * (v - grand_mean))
        .sum();
    let n_obs = observations.len();
    let imputed_cells = pivot.imputed;

    let ctx = Context {
        factor_names: factor_cols.iter().map(|s| s.to_string()).collect(),
        arities,
        n_within: wfactors.len(),
        pivot: pivot.matrix,
        observations,
        subjects,
        grand_mean,
        grand_var,
        ss_total,
        n_obs,
        alpha,
        trim,
    };

    let (design, procedure) = if ctx.n_within == ctx.factor_names.len() {
        if imputed_cells > 0 {
            eprintln!(
                "fieldstat: {} empty design cell(s) imputed with the grand mean",
                imputed_cells
            );
        }
        (DesignKind::Within, within::run(&ctx)?)
    } else if ctx.n_within == 0 {
        warn_structural_imputation(&ctx, imputed_cells);
        (DesignKind::Between, between::run(&ctx)?)
    } else {
        warn_structural_imputation(&ctx, imputed_cells);
        (DesignKind::Mixed, mixed::run(&ctx)?)
    };

    let effects = procedure
        .effects
        .into_iter()
        .map(|(indices, stats)| EffectEntry {
            key: EffectKey::from_indices(&indices, &ctx.factor_names),
            stats,
        })
        .collect();

    let df_total = ctx.n_obs as f64 - 1.0 - ctx.trim as f64;
    let aggregates = vec![
        AggregateEntry {
            key: EffectKey(vec!["SUBJECT".to_string()]),
            ss: procedure.ss_subject,
            df: procedure.df_subject,
        },
        AggregateEntry {
            key: EffectKey(vec!["WITHIN".to_string()]),
            ss: ctx.ss_total - procedure.ss_subject,
            df: df_total - procedure.df_subject,
        },
        AggregateEntry {
            key: EffectKey(vec!["TOTAL".to_string()]),
            ss: ctx.ss_total,
            df: df_total,
        },
    ];

    Ok(AnovaResult {
        design,
        dv: dv.to_string(),
        measure: measure.map(|m| m.to_string()),
        factor_names: ctx.factor_names,
        factor_levels,
        n_within: ctx.n_within,
        subjects: ctx.subjects,
        conditions: nd,
        alpha,
        transform,
        trim,
        imputed_cells,
        grand_mean,
        effects,
        aggregates,
    })
}

/// Between and mixed pivots impute every off-group cell by construction;
/// only cells beyond those structural ones indicate genuinely missing data.
fn warn_structural_imputation(ctx: &Context, imputed: usize) {
    let structural = ctx.subjects * ctx.pivot.ncols() - ctx.subjects * expected_cells(ctx);
    if imputed > structural {
        eprintln!(
            "fieldstat: {} empty design cell(s) imputed with the grand mean",
            imputed - structural
        );
    }
}

/// Cells each subject actually occupies: all within conditions.
fn expected_cells(ctx: &Context) -> usize {
    ctx.arities[..ctx.n_within].iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        subs: &[&str],
        factors: &[(&str, Vec<&str>)],
        values: Vec<f64>,
    ) -> DataFrame {
        let mut df = DataFrame::new();
        df.add_labels("sub", subs.iter().map(|s| s.to_string()).collect())
            .unwrap();
        for (name, levels) in factors {
            df.add_labels(*name, levels.iter().map(|s| s.to_string()).collect())
                .unwrap();
        }
        df.add_numeric("dv", values).unwrap();
        df
    }

    fn small_within() -> DataFrame {
        frame(
            &["s1", "s1", "s2", "s2", "s3", "s3"],
            &[("cond", vec!["a", "b", "a", "b", "a", "b"])],
            vec![1.0, 3.0, 2.0, 5.0, 1.5, 4.0],
        )
    }

    #[test]
    fn rejects_empty_factor_lists() {
        let df = small_within();
        let err = run(&df, "dv", &[], &[], "sub", None, Transform::None, 0.05).unwrap_err();
        assert!(matches!(err, AnovaError::Design { .. }));
    }

    #[test]
    fn rejects_overlapping_factor_lists() {
        let df = small_within();
        let err = run(
            &df,
            "dv",
            &["cond"],
            &["cond"],
            "sub",
            None,
            Transform::None,
            0.05,
        )
        .unwrap_err();
        assert!(matches!(err, AnovaError::Design { .. }));
    }

    #[test]
    fn rejects_single_subject() {
        let df = frame(
            &["s1", "s1"],
            &[("cond", vec!["a", "b"])],
            vec![1.0, 2.0],
        );
        let err = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 0.05).unwrap_err();
        assert!(matches!(err, AnovaError::Design { .. }));
    }

    #[test]
    fn rejects_bad_alpha() {
        let df = small_within();
        let err = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 1.5).unwrap_err();
        assert!(matches!(err, AnovaError::Design { .. }));
    }

    #[test]
    fn rejects_constant_dv() {
        let df = frame(
            &["s1", "s1", "s2", "s2"],
            &[("cond", vec!["a", "b", "a", "b"])],
            vec![3.0, 3.0, 3.0, 3.0],
        );
        let err = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 0.05).unwrap_err();
        assert!(matches!(err, AnovaError::Numeric { .. }));
    }

    #[test]
    fn within_smoke_test_produces_effect_and_aggregates() {
        let df = small_within();
        let result = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 0.05).unwrap();
        assert_eq!(result.design, DesignKind::Within);
        let cond = result.effect(&["cond"]).unwrap();
        assert_eq!(cond.df, 1.0);
        assert_eq!(cond.dfe, 2.0);
        assert!(cond.f > 0.0);
        assert!(cond.sphericity.is_some());
        assert!(result.aggregate("TOTAL").is_some());
        assert!(result.aggregate("SUBJECT").is_some());
    }

    #[test]
    fn effect_lookup_is_order_insensitive() {
        let df = frame(
            &["s1", "s1", "s1", "s1", "s2", "s2", "s2", "s2"],
            &[
                ("a", vec!["x", "x", "y", "y", "x", "x", "y", "y"]),
                ("b", vec!["p", "q", "p", "q", "p", "q", "p", "q"]),
            ],
            vec![1.0, 2.0, 3.0, 4.5, 2.0, 3.0, 4.0, 6.5],
        );
        let result = run(&df, "dv", &["a", "b"], &[], "sub", None, Transform::None, 0.05).unwrap();
        let k1 = result.effect(&["a", "b"]).unwrap();
        let k2 = result.effect(&["b", "a"]).unwrap();
        assert_eq!(k1.ss, k2.ss);
    }

    #[test]
    fn subset_index_round_trip() {
        let arities = [2usize, 3, 2];
        // cond 9 = levels [1, 1, 1]
        assert_eq!(factor_levels(9, &arities), vec![1, 1, 1]);
        assert_eq!(subset_index(9, &arities, &[1]), 1);
        assert_eq!(subset_index(9, &arities, &[0, 2]), 3);
    }
}
