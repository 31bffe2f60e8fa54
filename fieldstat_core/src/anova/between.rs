//! Between-subjects procedure.
//!
//! The pivot has one row per subject; each subject occupies exactly one
//! condition column and the remaining cells hold the grand mean. With that
//! imputation the contrast projections reproduce the classical group sums
//! of squares exactly, and the error pool is whatever the effects leave of
//! the total.

use ndarray::Axis;

use fieldstat_shared::rank;

use super::contrast;
use super::effects::{self, generalized_eta};
use super::error::{AnalysisResult, AnovaError};
use super::{Context, EffectStats, Procedure};

const RANK_TOL: f64 = 1e-10;

struct Partial {
    subset: Vec<usize>,
    ss: f64,
    df: f64,
    y2: Vec<f64>,
}

pub(crate) fn run(ctx: &Context) -> AnalysisResult<Procedure> {
    let nf = ctx.arities.len();
    let n = ctx.subjects as f64;

    let mut partials = Vec::new();
    for subset in contrast::enumerate_effects(nf) {
        let codes = contrast::codes_for(&subset, nf);
        let (c, _) = contrast::effect_matrices(&codes, &ctx.arities);
        let nc = c.ncols() as f64;

        let y = ctx.pivot.dot(&c);
        let b = y.mean_axis(Axis(0)).expect("at least two subjects");
        let colsum = y.sum_axis(Axis(0));
        let syb: f64 = colsum.iter().zip(b.iter()).map(|(s, bj)| s * bj).sum();

        let ss = syb * nc;
        let df = rank(&c, RANK_TOL) as f64;
        let y2 = ctx.marginal_means(&subset);
        partials.push(Partial { subset, ss, df, y2 });
    }

    let ss_sum: f64 = partials.iter().map(|p| p.ss).sum();
    let df_sum: f64 = partials.iter().map(|p| p.df).sum();
    let sse = ctx.ss_total - ss_sum;
    let dfe = n - 1.0 - ctx.trim as f64 - df_sum;
    if dfe <= 0.0 {
        return Err(AnovaError::design(format!(
            "no error degrees of freedom left ({} subjects, {} effect df, trim {})",
            ctx.subjects, df_sum, ctx.trim
        )));
    }
    if sse <= 0.0 {
        return Err(AnovaError::numeric("between-subjects error sum of squares"));
    }

    let mut rows = Vec::with_capacity(partials.len());
    for partial in partials {
        let obs = ctx.obs_of(&partial.subset);
        let derived = effects::derive(
            partial.ss,
            partial.df,
            sse,
            dfe,
            obs,
            &partial.y2,
            ctx.grand_mean,
            ctx.grand_var,
            ctx.alpha,
        )?;
        let stats = EffectStats {
            df: partial.df,
            dfe,
            ss: partial.ss,
            sse,
            mss: derived.mss,
            mse: derived.mse,
            f: derived.f,
            p: derived.p,
            eta: generalized_eta(partial.ss, sse),
            obs,
            se: derived.se,
            ci: derived.ci,
            crit_t: derived.crit_t,
            lambda: derived.lambda,
            power: derived.power,
            y2: partial.y2,
            sphericity: None,
        };
        rows.push((partial.subset, stats));
    }

    Ok(Procedure {
        effects: rows,
        ss_subject: ctx.ss_total,
        df_subject: n - 1.0 - ctx.trim as f64,
    })
}

#[cfg(test)]
mod tests {
    use crate::anova::{run, DesignKind, Transform};
    use fieldstat_shared::DataFrame;

    fn two_group_frame() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_labels(
            "sub",
            (1..=6).map(|i| format!("s{}", i)).collect(),
        )
        .unwrap();
        df.add_labels(
            "group",
            ["a", "a", "a", "b", "b", "b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        df.add_numeric("dv", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        df
    }

    #[test]
    fn one_way_matches_hand_computation() {
        let df = two_group_frame();
        let result = run(&df, "dv", &[], &["group"], "sub", None, Transform::None, 0.05).unwrap();
        assert_eq!(result.design, DesignKind::Between);
        let g = result.effect(&["group"]).unwrap();
        // group means 2 and 5 about 3.5: ssb = 3*1.5^2*2 = 13.5, ssw = 4
        assert_eq!(g.df, 1.0);
        assert_eq!(g.dfe, 4.0);
        assert!((g.ss - 13.5).abs() < 1e-10);
        assert!((g.sse - 4.0).abs() < 1e-10);
        assert!((g.f - 13.5).abs() < 1e-10);
        assert!(g.sphericity.is_none());
    }

    #[test]
    fn marginal_means_are_group_means() {
        let df = two_group_frame();
        let result = run(&df, "dv", &[], &["group"], "sub", None, Transform::None, 0.05).unwrap();
        let g = result.effect(&["group"]).unwrap();
        assert!((g.y2[0] - 2.0).abs() < 1e-12);
        assert!((g.y2[1] - 5.0).abs() < 1e-12);
        assert!((g.obs - 3.0).abs() < 1e-12);
    }

    #[test]
    fn subject_aggregate_carries_total_for_between() {
        let df = two_group_frame();
        let result = run(&df, "dv", &[], &["group"], "sub", None, Transform::None, 0.05).unwrap();
        let total = result.aggregate("TOTAL").unwrap();
        let subject = result.aggregate("SUBJECT").unwrap();
        assert!((total.ss - 17.5).abs() < 1e-10);
        assert_eq!(total.df, 5.0);
        assert!((subject.ss - total.ss).abs() < 1e-12);
        let within = result.aggregate("WITHIN").unwrap();
        assert!(within.ss.abs() < 1e-12);
    }
}
