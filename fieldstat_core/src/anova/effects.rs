//! Effect size, confidence intervals, noncentrality, and observed power.
//!
//! Pure functions shared by the three design procedures. The noncentrality
//! parameter deliberately uses the population-style variance of the full
//! dependent variable rather than the residual variance; this matches the
//! reference outputs and is kept for parity.

use serde::Serialize;

use fieldstat_shared::{f_quantile, f_sf, noncentral_f_cdf, t_quantile};

use super::error::{AnalysisResult, AnovaError};

/// Statistics corrected by one sphericity epsilon.
#[derive(Debug, Clone, Serialize)]
pub struct Corrected {
    pub df: f64,
    pub dfe: f64,
    pub mss: f64,
    pub mse: f64,
    pub f: f64,
    pub p: f64,
    pub se: f64,
    pub ci: f64,
    pub crit_t: f64,
    pub lambda: f64,
    pub power: f64,
}

/// Derived statistics shared by every effect row.
#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub mss: f64,
    pub mse: f64,
    pub f: f64,
    pub p: f64,
    pub se: f64,
    pub ci: f64,
    pub crit_t: f64,
    pub lambda: f64,
    pub power: f64,
}

/// Generalized eta squared: effect SS against the pooled error mass.
///
/// The pooled term carries every subject-related error source of the
/// design, so values stay inside `[0, 1]` and disjoint effects sum below 1.
pub fn generalized_eta(ss: f64, pooled_error: f64) -> f64 {
    if ss <= 0.0 {
        return 0.0;
    }
    (ss / (ss + pooled_error)).clamp(0.0, 1.0)
}

/// Loftus-Masson standard error and half-width confidence interval.
pub fn loftus_masson(mse: f64, obs: f64, crit_t: f64) -> (f64, f64) {
    let base = (mse / obs).sqrt();
    (base * crit_t / 1.96, base * crit_t)
}

/// Noncentrality from the marginal means, grand mean, and grand variance.
pub fn noncentrality(
    y2: &[f64],
    obs: f64,
    grand_mean: f64,
    grand_var: f64,
) -> AnalysisResult<f64> {
    if grand_var <= 0.0 {
        return Err(AnovaError::numeric("zero grand variance"));
    }
    let shift: f64 = y2
        .iter()
        .map(|m| obs * (m - grand_mean) * (m - grand_mean))
        .sum();
    Ok(shift / grand_var)
}

/// Observed power: noncentral-F mass beyond the central critical value.
pub fn observed_power(df: f64, dfe: f64, lambda: f64, alpha: f64) -> AnalysisResult<f64> {
    let crit = f_quantile(1.0 - alpha, df, dfe)?;
    Ok(1.0 - noncentral_f_cdf(crit, df, dfe, lambda)?)
}

/// Assemble the derived block for one effect.
pub(crate) fn derive(
    ss: f64,
    df: f64,
    sse: f64,
    dfe: f64,
    obs: f64,
    y2: &[f64],
    grand_mean: f64,
    grand_var: f64,
    alpha: f64,
) -> AnalysisResult<Derived> {
    if df <= 0.0 || dfe <= 0.0 {
        return Err(AnovaError::design(format!(
            "non-positive degrees of freedom (df = {}, dfe = {})",
            df, dfe
        )));
    }
    let mss = ss / df;
    let mse = sse / dfe;
    let f = mss / mse;
    if !f.is_finite() {
        return Err(AnovaError::numeric("F statistic"));
    }
    let p = f_sf(f, df, dfe)?;
    let crit_t = t_quantile(alpha / 2.0, dfe)?.abs();
    let (se, ci) = loftus_masson(mse, obs, crit_t);
    let lambda = noncentrality(y2, obs, grand_mean, grand_var)?;
    let power = observed_power(df, dfe, lambda, alpha)?;
    Ok(Derived {
        mss,
        mse,
        f,
        p,
        se,
        ci,
        crit_t,
        lambda,
        power,
    })
}

/// Assemble one epsilon-corrected block.
///
/// F is unchanged by construction (both df scale by the same epsilon);
/// p, the critical t, and power are re-evaluated at the corrected df.
/// The Loftus-Masson terms keep the uncorrected mean-square error.
pub(crate) fn correct(
    ss: f64,
    sse: f64,
    df: f64,
    dfe: f64,
    eps: f64,
    mse_plain: f64,
    obs: f64,
    lambda: f64,
    alpha: f64,
) -> AnalysisResult<Corrected> {
    let df_x = df * eps;
    let dfe_x = dfe * eps;
    if df_x <= 0.0 || dfe_x <= 0.0 {
        return Err(AnovaError::numeric("corrected degrees of freedom"));
    }
    let mss = ss / df_x;
    let mse = sse / dfe_x;
    let f = mss / mse;
    let p = f_sf(f, df_x, dfe_x)?;
    let crit_t = t_quantile(alpha / 2.0, dfe_x)?.abs();
    let (se, ci) = loftus_masson(mse_plain, obs, crit_t);
    let power = observed_power(df_x, dfe_x, lambda, alpha)?;
    Ok(Corrected {
        df: df_x,
        dfe: dfe_x,
        mss,
        mse,
        f,
        p,
        se,
        ci,
        crit_t,
        lambda,
        power,
    })
}
