//! Probability distribution functions for the analysis engine.
//!
//! Central F and Student t come from `statrs`; the noncentral F CDF is a
//! Poisson-weighted series over the regularized incomplete beta function,
//! which converges quickly for the noncentrality values the power
//! calculation produces.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use statrs::function::beta::beta_reg;

use super::{NumericError, NumericResult};

/// Maximum number of series terms for the noncentral F CDF.
const NCF_MAX_TERMS: usize = 1_000;

/// Series truncation threshold once past the Poisson mode.
const NCF_EPS: f64 = 1e-14;

/// CDF of the central F distribution.
pub fn f_cdf(x: f64, df1: f64, df2: f64) -> NumericResult<f64> {
    if x <= 0.0 {
        return Ok(0.0);
    }
    let dist = fisher(df1, df2)?;
    Ok(dist.cdf(x))
}

/// Survival function of the central F distribution, clamped to `[0, 1]`.
pub fn f_sf(x: f64, df1: f64, df2: f64) -> NumericResult<f64> {
    Ok((1.0 - f_cdf(x, df1, df2)?).clamp(0.0, 1.0))
}

/// Quantile of the central F distribution.
pub fn f_quantile(p: f64, df1: f64, df2: f64) -> NumericResult<f64> {
    if !(0.0..1.0).contains(&p) {
        return Err(NumericError::invalid_argument("p", p));
    }
    let dist = fisher(df1, df2)?;
    let q = dist.inverse_cdf(p);
    if !q.is_finite() {
        return Err(NumericError::non_finite("F quantile"));
    }
    Ok(q)
}

/// Quantile of the Student t distribution.
pub fn t_quantile(p: f64, df: f64) -> NumericResult<f64> {
    if !(0.0..1.0).contains(&p) {
        return Err(NumericError::invalid_argument("p", p));
    }
    if !(df.is_finite() && df > 0.0) {
        return Err(NumericError::invalid_argument("df", df));
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|_| NumericError::invalid_argument("df", df))?;
    let q = dist.inverse_cdf(p);
    if !q.is_finite() {
        return Err(NumericError::non_finite("t quantile"));
    }
    Ok(q)
}

/// CDF of the noncentral F distribution with noncentrality `lambda`.
///
/// Evaluated as `sum_k Poisson(lambda/2)[k] * I_x(df1/2 + k, df2/2)` with
/// `x = df1*x / (df1*x + df2)`. `lambda = 0` reduces to the central CDF.
pub fn noncentral_f_cdf(x: f64, df1: f64, df2: f64, lambda: f64) -> NumericResult<f64> {
    if !(df1.is_finite() && df1 > 0.0) {
        return Err(NumericError::invalid_argument("df1", df1));
    }
    if !(df2.is_finite() && df2 > 0.0) {
        return Err(NumericError::invalid_argument("df2", df2));
    }
    if !(lambda.is_finite() && lambda >= 0.0) {
        return Err(NumericError::invalid_argument("lambda", lambda));
    }
    if x <= 0.0 {
        return Ok(0.0);
    }
    if lambda == 0.0 {
        return f_cdf(x, df1, df2);
    }

    let half = lambda / 2.0;
    let beta_x = df1 * x / (df1 * x + df2);
    let mut weight = (-half).exp();
    let mut acc = 0.0;
    for k in 0..NCF_MAX_TERMS {
        let term = weight * beta_reg(df1 / 2.0 + k as f64, df2 / 2.0, beta_x);
        acc += term;
        weight *= half / (k as f64 + 1.0);
        // stop once past the Poisson mode and the tail is negligible
        if k as f64 > half && term < NCF_EPS {
            break;
        }
    }
    if !acc.is_finite() {
        return Err(NumericError::non_finite("noncentral F CDF"));
    }
    Ok(acc.clamp(0.0, 1.0))
}

fn fisher(df1: f64, df2: f64) -> NumericResult<FisherSnedecor> {
    if !(df1.is_finite() && df1 > 0.0) {
        return Err(NumericError::invalid_argument("df1", df1));
    }
    if !(df2.is_finite() && df2 > 0.0) {
        return Err(NumericError::invalid_argument("df2", df2));
    }
    FisherSnedecor::new(df1, df2).map_err(|_| NumericError::invalid_argument("df", df1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f_cdf_is_a_distribution() {
        assert_eq!(f_cdf(0.0, 2.0, 10.0).unwrap(), 0.0);
        assert!(f_cdf(1e6, 2.0, 10.0).unwrap() > 0.999999);
        let lo = f_cdf(1.0, 2.0, 10.0).unwrap();
        let hi = f_cdf(2.0, 2.0, 10.0).unwrap();
        assert!(lo < hi);
    }

    #[test]
    fn f_quantile_round_trips_through_cdf() {
        for &p in &[0.05, 0.5, 0.95, 0.99] {
            let q = f_quantile(p, 3.0, 20.0).unwrap();
            let back = f_cdf(q, 3.0, 20.0).unwrap();
            assert!((back - p).abs() < 1e-6, "p={} back={}", p, back);
        }
    }

    #[test]
    fn t_quantile_is_symmetric() {
        let hi = t_quantile(0.975, 27.0).unwrap();
        let lo = t_quantile(0.025, 27.0).unwrap();
        assert!((hi + lo).abs() < 1e-8);
        // textbook two-sided 5% critical value at 27 df
        assert!((hi - 2.0518305).abs() < 1e-5);
    }

    #[test]
    fn noncentral_reduces_to_central_at_zero_lambda() {
        let a = noncentral_f_cdf(2.5, 2.0, 18.0, 0.0).unwrap();
        let b = f_cdf(2.5, 2.0, 18.0).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn noncentral_shifts_mass_right() {
        let central = noncentral_f_cdf(3.0, 2.0, 18.0, 0.0).unwrap();
        let shifted = noncentral_f_cdf(3.0, 2.0, 18.0, 10.0).unwrap();
        assert!(shifted < central);
    }

    #[test]
    fn noncentral_power_matches_reference_value() {
        // one-way between, df=(2,27), lambda=27.519: power ~ 0.9959
        let crit = f_quantile(0.95, 2.0, 27.0).unwrap();
        let power = 1.0 - noncentral_f_cdf(crit, 2.0, 27.0, 27.518980716229).unwrap();
        assert!((power - 0.995914897).abs() < 1e-5);
    }

    #[test]
    fn rejects_bad_degrees_of_freedom() {
        assert!(f_cdf(1.0, 0.0, 5.0).is_err());
        assert!(t_quantile(0.5, -1.0).is_err());
        assert!(noncentral_f_cdf(1.0, 2.0, 5.0, -3.0).is_err());
    }
}
