//! Mixed-design procedure.
//!
//! Between-only effects live on the subject means, within-only effects on
//! the full pivot, and mixed interactions are carved out of their cell
//! means by subtracting every sub-effect already accounted for. The pooled
//! within error of each within-part absorbs the group-by-effect variation,
//! so the interaction sums of squares and degrees of freedom are removed
//! from it before any F is formed; that keeps the full decomposition equal
//! to the total sum of squares.

use std::collections::HashMap;

use ndarray::{Array2, Axis};

use fieldstat_shared::rank;

use super::contrast;
use super::effects::{self, generalized_eta};
use super::error::{AnalysisResult, AnovaError};
use super::within::effect_epsilons;
use super::{subset_index, Context, EffectStats, Procedure, Sphericity};

const RANK_TOL: f64 = 1e-10;

enum Kind {
    Between,
    Within {
        eps: (f64, f64, f64),
    },
    Mixed,
}

struct Partial {
    subset: Vec<usize>,
    kind: Kind,
    ss: f64,
    df: f64,
    y2: Vec<f64>,
}

struct ErrorTerm {
    sse: f64,
    dfe_raw: f64,
    dfe: f64,
    eps: (f64, f64, f64),
}

pub(crate) fn run(ctx: &Context) -> AnalysisResult<Procedure> {
    let nf = ctx.arities.len();
    let nw = ctx.n_within;
    let nr = ctx.subjects as f64;
    let nd: usize = ctx.arities.iter().product();
    let b_indices: Vec<usize> = (nw..nf).collect();
    let b_arities: Vec<usize> = b_indices.iter().map(|&i| ctx.arities[i]).collect();
    let nb: usize = b_arities.iter().product();
    let w_cells: usize = ctx.arities[..nw].iter().product();

    // between combination per subject; it must not vary within a subject
    let mut groups: Vec<Option<usize>> = vec![None; ctx.subjects];
    for &(s, cond, _) in &ctx.observations {
        let g = subset_index(cond, &ctx.arities, &b_indices);
        match groups[s] {
            None => groups[s] = Some(g),
            Some(existing) if existing != g => {
                return Err(AnovaError::design(
                    "a between-subject factor varies within a subject",
                ))
            }
            _ => {}
        }
    }

    let smeans = ctx.subject_means();
    let ss_bsub: f64 = w_cells as f64
        * smeans
            .iter()
            .map(|s| (s - ctx.grand_mean) * (s - ctx.grand_mean))
            .sum::<f64>();

    // subject-mean pivot over the between conditions
    let mut bp = Array2::from_elem((ctx.subjects, nb), ctx.grand_mean);
    for (i, group) in groups.iter().enumerate() {
        if let Some(g) = group {
            bp[[i, *g]] = smeans[i];
        }
    }

    let mut ss_map: HashMap<Vec<usize>, f64> = HashMap::new();
    let mut werr: HashMap<Vec<usize>, ErrorTerm> = HashMap::new();
    let mut partials = Vec::new();

    for subset in contrast::enumerate_effects(nf) {
        let has_w = subset.iter().any(|&i| i < nw);
        let has_b = subset.iter().any(|&i| i >= nw);
        let y2 = ctx.marginal_means(&subset);

        let (kind, ss, df) = if has_b && !has_w {
            let local: Vec<usize> = subset.iter().map(|&i| i - nw).collect();
            let codes = contrast::codes_for(&local, nf - nw);
            let (c, _) = contrast::effect_matrices(&codes, &b_arities);
            let nc = c.ncols() as f64;
            let y = bp.dot(&c);
            let b = y.mean_axis(Axis(0)).expect("at least two subjects");
            let colsum = y.sum_axis(Axis(0));
            let syb: f64 = colsum.iter().zip(b.iter()).map(|(s, bj)| s * bj).sum();
            let ss = syb * nc * w_cells as f64;
            let df = rank(&c, RANK_TOL) as f64;
            (Kind::Between, ss, df)
        } else if has_w && !has_b {
            let codes = contrast::codes_for(&subset, nf);
            let (c, _) = contrast::effect_matrices(&codes, &ctx.arities);
            let nc = c.ncols() as f64;
            let no = nd as f64 / nc;
            let y = ctx.pivot.dot(&c);
            let b = y.mean_axis(Axis(0)).expect("at least two subjects");
            let colsum = y.sum_axis(Axis(0));
            let syb: f64 = colsum.iter().zip(b.iter()).map(|(s, bj)| s * bj).sum();
            let sy2: f64 = y.iter().map(|v| v * v).sum();
            let ss = syb / no * nb as f64;
            let sse_pooled = (sy2 - syb) / no * nb as f64;
            let df_int: usize = subset.iter().map(|&i| ctx.arities[i] - 1).product();
            let df = df_int as f64;
            let eps = effect_epsilons(&y, df_int)?;
            werr.insert(
                subset.clone(),
                ErrorTerm {
                    sse: sse_pooled,
                    dfe_raw: df * (nr - 1.0),
                    dfe: 0.0,
                    eps,
                },
            );
            (Kind::Within { eps }, ss, df)
        } else {
            // cell-mean SS of the full subset, minus everything inside it
            let cnt = ctx.obs_of(&subset);
            let ss_cells: f64 = cnt
                * y2.iter()
                    .map(|m| (m - ctx.grand_mean) * (m - ctx.grand_mean))
                    .sum::<f64>();
            let absorbed: f64 = contrast::proper_subsets(&subset)
                .iter()
                .map(|t| ss_map[t])
                .sum();
            let ss = ss_cells - absorbed;
            (Kind::Mixed, ss, ctx.df_of(&subset))
        };

        ss_map.insert(subset.clone(), ss);
        partials.push(Partial {
            subset,
            kind,
            ss,
            df,
            y2,
        });
    }

    // the pooled within errors absorbed the mixed interactions; remove them
    for partial in &partials {
        if matches!(partial.kind, Kind::Mixed) {
            let wpart: Vec<usize> = partial
                .subset
                .iter()
                .copied()
                .filter(|&i| i < nw)
                .collect();
            let term = werr
                .get_mut(&wpart)
                .expect("within-only effects precede mixed ones");
            term.sse -= partial.ss;
            term.dfe_raw -= partial.df;
        }
    }

    let ss_between: f64 = partials
        .iter()
        .filter(|p| matches!(p.kind, Kind::Between))
        .map(|p| p.ss)
        .sum();
    let sse_b = ss_bsub - ss_between;
    let dfe_b_raw = nr - nb as f64;
    if dfe_b_raw <= 0.0 {
        return Err(AnovaError::design(
            "no between-subjects error degrees of freedom",
        ));
    }
    if sse_b <= 0.0 {
        return Err(AnovaError::numeric("between-subjects error sum of squares"));
    }

    // distribute the Winsorizing trim over all error terms proportionally
    let dfe_total: f64 = dfe_b_raw + werr.values().map(|t| t.dfe_raw).sum::<f64>();
    if dfe_total <= ctx.trim as f64 {
        return Err(AnovaError::design(format!(
            "trim {} exhausts the {} error degrees of freedom",
            ctx.trim, dfe_total
        )));
    }
    let scale = 1.0 - ctx.trim as f64 / dfe_total;
    let dfe_b = dfe_b_raw * scale;
    for term in werr.values_mut() {
        term.dfe = term.dfe_raw * scale;
        if term.sse <= 0.0 {
            return Err(AnovaError::numeric("within-subjects error sum of squares"));
        }
    }

    let pooled_error: f64 = sse_b + werr.values().map(|t| t.sse).sum::<f64>();

    let mut rows = Vec::with_capacity(partials.len());
    for partial in partials {
        let obs = ctx.obs_of(&partial.subset);
        let (sse, dfe, eps) = match &partial.kind {
            Kind::Between => (sse_b, dfe_b, None),
            Kind::Within { eps } => {
                let term = &werr[&partial.subset];
                (term.sse, term.dfe, Some(*eps))
            }
            Kind::Mixed => {
                let wpart: Vec<usize> = partial
                    .subset
                    .iter()
                    .copied()
                    .filter(|&i| i < nw)
                    .collect();
                let term = &werr[&wpart];
                (term.sse, term.dfe, Some(term.eps))
            }
        };

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
        let sphericity = match eps {
            None => None,
            Some((gg, hf, lb)) => Some(Sphericity {
                eps_gg: gg,
                eps_hf: hf,
                eps_lb: lb,
                gg: effects::correct(
                    partial.ss, sse, partial.df, dfe, gg, derived.mse, obs,
                    derived.lambda, ctx.alpha,
                )?,
                hf: effects::correct(
                    partial.ss, sse, partial.df, dfe, hf, derived.mse, obs,
                    derived.lambda, ctx.alpha,
                )?,
                lb: effects::correct(
                    partial.ss, sse, partial.df, dfe, lb, derived.mse, obs,
                    derived.lambda, ctx.alpha,
                )?,
            }),
        };
        let stats = EffectStats {
            df: partial.df,
            dfe,
            ss: partial.ss,
            sse,
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
            sphericity,
        };
        rows.push((partial.subset, stats));
    }

    Ok(Procedure {
        effects: rows,
        ss_subject: ss_bsub,
        df_subject: nr - 1.0,
    })
}

#[cfg(test)]
mod tests {
    use crate::anova::{run, DesignKind, Transform};
    use fieldstat_shared::DataFrame;

    // two groups of two subjects, each measured at two conditions
    fn small_mixed() -> DataFrame {
        let mut df = DataFrame::new();
        let mut subs = Vec::new();
        let mut group = Vec::new();
        let mut cond = Vec::new();
        let values = vec![1.0, 2.0, 2.0, 4.0, 5.0, 7.0, 6.0, 9.0];
        for (i, g) in [("s1", "g1"), ("s2", "g1"), ("s3", "g2"), ("s4", "g2")] {
            for c in ["a", "b"] {
                subs.push(i.to_string());
                group.push(g.to_string());
                cond.push(c.to_string());
            }
        }
        df.add_labels("sub", subs).unwrap();
        df.add_labels("group", group).unwrap();
        df.add_labels("cond", cond).unwrap();
        df.add_numeric("dv", values).unwrap();
        df
    }

    #[test]
    fn mixed_dispatches_and_keys_all_effects() {
        let df = small_mixed();
        let result = run(
            &df,
            "dv",
            &["cond"],
            &["group"],
            "sub",
            None,
            Transform::None,
            0.05,
        )
        .unwrap();
        assert_eq!(result.design, DesignKind::Mixed);
        assert!(result.effect(&["cond"]).is_some());
        assert!(result.effect(&["group"]).is_some());
        assert!(result.effect(&["cond", "group"]).is_some());
    }

    #[test]
    fn subject_ss_decomposes_into_between_parts() {
        let df = small_mixed();
        let result = run(
            &df,
            "dv",
            &["cond"],
            &["group"],
            "sub",
            None,
            Transform::None,
            0.05,
        )
        .unwrap();
        let group = result.effect(&["group"]).unwrap();
        let subject = result.aggregate("SUBJECT").unwrap();
        // ss_subject = ss(group) + sse_b, exactly
        assert!((subject.ss - (group.ss + group.sse)).abs() < 1e-9);
        assert_eq!(subject.df, 3.0);
        assert_eq!(group.dfe, 2.0);
    }

    #[test]
    fn full_decomposition_matches_total() {
        let df = small_mixed();
        let result = run(
            &df,
            "dv",
            &["cond"],
            &["group"],
            "sub",
            None,
            Transform::None,
            0.05,
        )
        .unwrap();
        let total = result.aggregate("TOTAL").unwrap();
        let group = result.effect(&["group"]).unwrap();
        let cond = result.effect(&["cond"]).unwrap();
        let inter = result.effect(&["cond", "group"]).unwrap();
        let decomposed = group.ss + cond.ss + inter.ss + group.sse + cond.sse;
        assert!(
            (decomposed - total.ss).abs() < 1e-8 * total.ss.max(1.0),
            "decomposed {} vs total {}",
            decomposed,
            total.ss
        );
        // interaction shares the within-part error term
        assert_eq!(inter.sse, cond.sse);
        assert_eq!(inter.dfe, cond.dfe);
    }

    #[test]
    fn between_factor_must_be_constant_per_subject() {
        let mut df = DataFrame::new();
        df.add_labels(
            "sub",
            ["s1", "s1", "s2", "s2"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        df.add_labels(
            "group",
            ["g1", "g2", "g1", "g1"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        df.add_labels(
            "cond",
            ["a", "b", "a", "b"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        df.add_numeric("dv", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let err = run(
            &df,
            "dv",
            &["cond"],
            &["group"],
            "sub",
            None,
            Transform::None,
            0.05,
        );
        assert!(err.is_err());
    }
}
