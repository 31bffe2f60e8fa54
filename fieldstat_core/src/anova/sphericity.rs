//! Sphericity estimators for within-subject effects.
//!
//! All three take the effect's projected data `y` (subjects x projected
//! conditions) and the effect's degrees of freedom, and return 1 exactly
//! when `df = 1`. The covariance is taken across subjects, so it is
//! `Nc x Nc` - the projected-condition orientation the trace formulas
//! assume.

use ndarray::Array2;

use fieldstat_shared::{covariance, trace};

use super::error::{AnalysisResult, AnovaError};

/// Relative tolerance for declaring the projected covariance singular.
const PSD_TOL: f64 = 1e-12;

/// Greenhouse-Geisser epsilon: `trace(V)^2 / (df * trace(V V))`.
pub fn eps_gg(y: &Array2<f64>, df: usize) -> AnalysisResult<f64> {
    if df <= 1 {
        return Ok(1.0);
    }
    let v = covariance(y)?;
    if v.diag().iter().any(|&d| d < -1e-9) {
        return Err(AnovaError::numeric(
            "projected covariance has negative variance",
        ));
    }
    let t = trace(&v);
    let tt = trace(&v.dot(&v));
    if tt <= PSD_TOL * (1.0f64).max(t * t) {
        return Err(AnovaError::numeric("projected covariance is singular"));
    }
    Ok(t * t / (df as f64 * tt))
}

/// Huynh-Feldt epsilon, clamped into `[eps_gg, 1]` after the
/// Satterthwaite-style formula.
pub fn eps_hf(y: &Array2<f64>, df: usize) -> AnalysisResult<f64> {
    if df <= 1 {
        return Ok(1.0);
    }
    let gg = eps_gg(y, df)?;
    let n = y.nrows() as f64;
    let k = df as f64;
    let denom = k * ((n - 1.0) - k * gg);
    if denom.abs() < PSD_TOL {
        return Ok(1.0);
    }
    let hf = (n * k * gg - 2.0) / denom;
    Ok(hf.clamp(gg, 1.0))
}

/// Box lower-bound epsilon, `1/df`.
pub fn eps_lb(_y: &Array2<f64>, df: usize) -> f64 {
    if df <= 1 {
        1.0
    } else {
        1.0 / df as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // Two orthogonal columns with sample variances 3 and 1 give
    // eps_gg = (3+1)^2 / (2 * (9+1)) = 0.8 for df = 2.
    fn anisotropic_scores() -> Array2<f64> {
        let a = (1.5f64).sqrt();
        let b = 0.5f64.sqrt();
        array![[a, b], [-a, -b], [a, -b], [-a, b]]
    }

    #[test]
    fn gg_matches_manual_eigenvalue_ratio() {
        let y = anisotropic_scores();
        let gg = eps_gg(&y, 2).unwrap();
        assert!((gg - 0.8).abs() < 1e-10, "gg = {}", gg);
    }

    #[test]
    fn all_three_are_one_at_single_df() {
        let y = array![[1.0], [2.0], [3.0]];
        assert_eq!(eps_gg(&y, 1).unwrap(), 1.0);
        assert_eq!(eps_hf(&y, 1).unwrap(), 1.0);
        assert_eq!(eps_lb(&y, 1), 1.0);
    }

    #[test]
    fn ordering_lb_gg_hf_one() {
        let y = anisotropic_scores();
        let lb = eps_lb(&y, 2);
        let gg = eps_gg(&y, 2).unwrap();
        let hf = eps_hf(&y, 2).unwrap();
        assert!(lb <= gg + 1e-12);
        assert!(gg <= hf + 1e-12);
        assert!(hf <= 1.0 + 1e-12);
    }

    #[test]
    fn lower_bound_is_reciprocal_df() {
        let y = Array2::<f64>::zeros((5, 3));
        assert!((eps_lb(&y, 3) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn spherical_scores_give_unit_epsilon() {
        // equal variances, zero covariance: eps_gg = k^2/(k*k) ... = 1
        let y = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]];
        let gg = eps_gg(&y, 2).unwrap();
        assert!((gg - 1.0).abs() < 1e-10);
        let hf = eps_hf(&y, 2).unwrap();
        assert!((hf - 1.0).abs() < 1e-10);
    }

    #[test]
    fn constant_scores_are_singular() {
        let y = Array2::<f64>::from_elem((6, 3), 2.5);
        assert!(matches!(eps_gg(&y, 2), Err(AnovaError::Numeric { .. })));
    }
}
