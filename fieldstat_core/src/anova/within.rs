//! Within-subjects procedure.
//!
//! Every subject is observed at every condition, so the pivot is dense and
//! each effect carries its own error term: the subject-by-effect
//! interaction left over after the effect's own contrast. Sphericity
//! epsilons are estimated per effect from the projected scores, and trim
//! from Winsorizing is spread over the error degrees of freedom in
//! proportion to their size.

use ndarray::{Array2, Axis};

use super::contrast;
use super::effects::{self, generalized_eta};
use super::error::{AnalysisResult, AnovaError};
use super::sphericity::{eps_gg, eps_hf, eps_lb};
use super::{Context, EffectStats, Procedure, Sphericity};

struct Partial {
    subset: Vec<usize>,
    ss: f64,
    sse: f64,
    df: f64,
    dfe_raw: f64,
    y2: Vec<f64>,
    eps: (f64, f64, f64),
}

pub(crate) fn run(ctx: &Context) -> AnalysisResult<Procedure> {
    let nf = ctx.arities.len();
    let nr = ctx.subjects as f64;
    let nd: usize = ctx.arities.iter().product();

    let mut partials = Vec::new();
    for subset in contrast::enumerate_effects(nf) {
        let codes = contrast::codes_for(&subset, nf);
        let (c, avg) = contrast::effect_matrices(&codes, &ctx.arities);
        let nc = c.ncols() as f64;
        let no = nd as f64 / nc;

        let y = ctx.pivot.dot(&c);
        let b = y.mean_axis(Axis(0)).expect("at least two subjects");
        let colsum = y.sum_axis(Axis(0));
        let syb: f64 = colsum.iter().zip(b.iter()).map(|(s, bj)| s * bj).sum();
        let sy2: f64 = y.iter().map(|v| v * v).sum();

        let ss = syb / no;
        let sse = (sy2 - syb) / no;
        let df_int: usize = subset.iter().map(|&i| ctx.arities[i] - 1).product();
        let df = df_int as f64;
        let dfe_raw = df * (nr - 1.0);

        let y2 = ctx
            .pivot
            .dot(&avg)
            .mean_axis(Axis(0))
            .expect("at least two subjects")
            .to_vec();
        let eps = effect_epsilons(&y, df_int)?;
        partials.push(Partial {
            subset,
            ss,
            sse,
            df,
            dfe_raw,
            y2,
            eps,
        });
    }

    let dfe_total: f64 = partials.iter().map(|p| p.dfe_raw).sum();
    if dfe_total <= ctx.trim as f64 {
        return Err(AnovaError::design(format!(
            "trim {} exhausts the {} error degrees of freedom",
            ctx.trim, dfe_total
        )));
    }
    let scale = 1.0 - ctx.trim as f64 / dfe_total;

    let smeans = ctx.subject_means();
    let ss_subject: f64 = nd as f64
        * smeans
            .iter()
            .map(|s| (s - ctx.grand_mean) * (s - ctx.grand_mean))
            .sum::<f64>();
    let pooled_error: f64 = ss_subject + partials.iter().map(|p| p.sse).sum::<f64>();

    let mut rows = Vec::with_capacity(partials.len());
    for partial in partials {
        let dfe = partial.dfe_raw * scale;
        let obs = ctx.obs_of(&partial.subset);
        let derived = effects::derive(
            partial.ss,
            partial.df,
            partial.sse,
            dfe,
            obs,
            &partial.y2,
            ctx.grand_mean,
            ctx.grand_var,
            ctx.alpha,
        )?;
        let (gg, hf, lb) = partial.eps;
        let sphericity = Sphericity {
            eps_gg: gg,
            eps_hf: hf,
            eps_lb: lb,
            gg: effects::correct(
                partial.ss, partial.sse, partial.df, dfe, gg, derived.mse, obs,
                derived.lambda, ctx.alpha,
            )?,
            hf: effects::correct(
                partial.ss, partial.sse, partial.df, dfe, hf, derived.mse, obs,
                derived.lambda, ctx.alpha,
            )?,
            lb: effects::correct(
                partial.ss, partial.sse, partial.df, dfe, lb, derived.mse, obs,
                derived.lambda, ctx.alpha,
            )?,
        };
        let stats = EffectStats {
            df: partial.df,
            dfe,
            ss: partial.ss,
            sse: partial.sse,
            mss: derived.mss,
            mse: derived.mse,
            f: derived.f,
            p: derived.p,
            eta: generalized_eta(partial.ss, pooled_error),
            obs,
            se: derived.se,
            ci: derived.ci,
            crit_t: derived.crit_t,
            lambda: derived.lambda,
            power: derived.power,
            y2: partial.y2,
            sphericity: Some(sphericity),
        };
        rows.push((partial.subset, stats));
    }

    Ok(Procedure {
        effects: rows,
        ss_subject,
        df_subject: nr - 1.0,
    })
}

/// The sphericity triple of one projection; all three are 1 at df = 1.
pub(crate) fn effect_epsilons(
    y: &Array2<f64>,
    df: usize,
) -> AnalysisResult<(f64, f64, f64)> {
    Ok((eps_gg(y, df)?, eps_hf(y, df)?, eps_lb(y, df)))
}

#[cfg(test)]
mod tests {
    use crate::anova::{run, Transform};
    use fieldstat_shared::DataFrame;

    // 3 subjects x 2 conditions with a constant within-subject shift
    fn paired_frame() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_labels(
            "sub",
            ["s1", "s1", "s2", "s2", "s3", "s3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        df.add_labels(
            "cond",
            ["a", "b", "a", "b", "a", "b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        df.add_numeric("dv", vec![10.0, 12.0, 14.0, 16.0, 9.0, 11.0])
            .unwrap();
        df
    }

    #[test]
    fn constant_shift_has_zero_error() {
        // difference is exactly 2 for every subject: sse = 0, F undefined
        let df = paired_frame();
        let err = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 0.05);
        // zero within error makes F non-finite; the engine refuses
        assert!(err.is_err());
    }

    #[test]
    fn paired_design_with_noise_matches_classical_ss() {
        let mut df = DataFrame::new();
        df.add_labels(
            "sub",
            ["s1", "s1", "s2", "s2", "s3", "s3", "s4", "s4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        df.add_labels(
            "cond",
            ["a", "b", "a", "b", "a", "b", "a", "b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        df.add_numeric("dv", vec![3.0, 5.0, 4.0, 7.0, 6.0, 9.0, 5.0, 6.0])
            .unwrap();
        let result = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 0.05).unwrap();
        let cond = result.effect(&["cond"]).unwrap();
        // diffs: 2, 3, 3, 1 -> mean 2.25; ss = Nr * sum (colmean - grand)^2
        assert_eq!(cond.df, 1.0);
        assert_eq!(cond.dfe, 3.0);
        assert!((cond.ss - 2.0 * (2.25f64 / 2.0).powi(2) * 4.0).abs() < 1e-9);
        // single-df effect: all epsilons are exactly 1
        let sph = cond.sphericity.as_ref().unwrap();
        assert_eq!(sph.eps_gg, 1.0);
        assert_eq!(sph.eps_hf, 1.0);
        assert_eq!(sph.eps_lb, 1.0);
        assert!((sph.gg.f - cond.f).abs() < 1e-12);
    }

    #[test]
    fn marginal_means_are_condition_means() {
        let mut df = DataFrame::new();
        df.add_labels(
            "sub",
            ["s1", "s1", "s2", "s2"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        df.add_labels(
            "cond",
            ["a", "b", "a", "b"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        df.add_numeric("dv", vec![1.0, 4.0, 3.0, 5.0]).unwrap();
        let result = run(&df, "dv", &["cond"], &[], "sub", None, Transform::None, 0.05).unwrap();
        let cond = result.effect(&["cond"]).unwrap();
        assert!((cond.y2[0] - 2.0).abs() < 1e-12);
        assert!((cond.y2[1] - 4.5).abs() < 1e-12);
    }
}
