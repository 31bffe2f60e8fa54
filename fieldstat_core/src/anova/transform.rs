//! Dependent-variable transformations.
//!
//! A [`Transform`] is applied to the raw value vector before any statistic
//! is computed. Winsorizing additionally reports how many observations it
//! replaced; that count is subtracted from the error degrees of freedom by
//! the procedures.

use std::str::FromStr;

use serde::Serialize;

use super::error::{AnalysisResult, AnovaError};

/// Transformation applied to the dependent variable ahead of the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    None,
    Log10,
    Reciprocal,
    SquareRoot,
    Arcsine,
    /// Winsorize 1% per tail
    Winsor01,
    /// Winsorize 5% per tail
    Winsor05,
    /// Winsorize 10% per tail
    Winsor10,
}

impl Transform {
    /// Apply the transform, returning the new vector and the number of
    /// observations replaced by Winsorizing (zero otherwise).
    pub fn apply(&self, values: &[f64]) -> AnalysisResult<(Vec<f64>, usize)> {
        let out = match self {
            Transform::None => (values.to_vec(), 0),
            Transform::Log10 => (values.iter().map(|v| v.log10()).collect(), 0),
            Transform::Reciprocal => (values.iter().map(|v| 1.0 / v).collect(), 0),
            Transform::SquareRoot => (values.iter().map(|v| v.sqrt()).collect(), 0),
            Transform::Arcsine => (values.iter().map(|v| v.sqrt().asin()).collect(), 0),
            Transform::Winsor01 => winsorize(values, 0.01),
            Transform::Winsor05 => winsorize(values, 0.05),
            Transform::Winsor10 => winsorize(values, 0.10),
        };
        if out.0.iter().any(|v| !v.is_finite()) {
            return Err(AnovaError::numeric(format!(
                "transform {:?} produced non-finite values",
                self
            )));
        }
        Ok(out)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::Log10 => "log10",
            Transform::Reciprocal => "reciprocal",
            Transform::SquareRoot => "square-root",
            Transform::Arcsine => "arcsine",
            Transform::Winsor01 => "winsor01",
            Transform::Winsor05 => "winsor05",
            Transform::Winsor10 => "winsor10",
        }
    }
}

impl FromStr for Transform {
    type Err = AnovaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Transform::None),
            "log10" | "log" => Ok(Transform::Log10),
            "reciprocal" => Ok(Transform::Reciprocal),
            "square-root" | "sqrt" => Ok(Transform::SquareRoot),
            "arcsine" => Ok(Transform::Arcsine),
            "winsor01" => Ok(Transform::Winsor01),
            "winsor05" => Ok(Transform::Winsor05),
            "winsor10" => Ok(Transform::Winsor10),
            other => Err(AnovaError::transform(other)),
        }
    }
}

/// Replace the `floor(n * percent)` most extreme values in each tail with
/// the nearest retained value.
///
/// Returns the winsorized vector (original order preserved) and the number
/// of replaced observations, `2 * floor(n * percent)`.
pub fn winsorize(values: &[f64], percent: f64) -> (Vec<f64>, usize) {
    let n = values.len();
    let g = (n as f64 * percent).floor() as usize;
    if g == 0 || n < 2 * g + 1 {
        return (values.to_vec(), 0);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let low = values[order[g]];
    let high = values[order[n - g - 1]];
    let mut out = values.to_vec();
    for i in 0..g {
        out[order[i]] = low;
        out[order[n - 1 - i]] = high;
    }
    (out, 2 * g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winsorize_ten_percent_reference_vector() {
        let v = [
            3.0, 7.0, 12.0, 15.0, 17.0, 17.0, 18.0, 19.0, 19.0, 19.0, 20.0, 22.0, 24.0, 26.0,
            30.0, 32.0, 32.0, 33.0, 36.0, 50.0,
        ];
        let (w, trim) = winsorize(&v, 0.10);
        let expected = [
            12.0, 12.0, 12.0, 15.0, 17.0, 17.0, 18.0, 19.0, 19.0, 19.0, 20.0, 22.0, 24.0, 26.0,
            30.0, 32.0, 32.0, 33.0, 33.0, 33.0,
        ];
        assert_eq!(w, expected);
        assert_eq!(trim, 4);
    }

    #[test]
    fn winsorize_zero_percent_is_identity() {
        let v = [5.0, 1.0, 9.0];
        let (w, trim) = winsorize(&v, 0.0);
        assert_eq!(w, v);
        assert_eq!(trim, 0);
    }

    #[test]
    fn winsorize_is_idempotent_at_same_percent() {
        let v: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let (once, trim) = winsorize(&v, 0.10);
        let (twice, trim2) = winsorize(&once, 0.10);
        assert_eq!(once, twice);
        assert_eq!(trim, trim2);
    }

    #[test]
    fn winsorize_preserves_input_order() {
        let v = [50.0, 1.0, 10.0, 20.0, 30.0, 2.0, 40.0, 3.0, 25.0, 15.0];
        let (w, trim) = winsorize(&v, 0.10);
        assert_eq!(trim, 2);
        // min (index 1) clipped up, max (index 0) clipped down
        assert_eq!(w[1], 2.0);
        assert_eq!(w[0], 40.0);
        assert_eq!(w[2], 10.0);
    }

    #[test]
    fn transform_parses_and_rejects() {
        assert_eq!(Transform::from_str("log10").unwrap(), Transform::Log10);
        assert_eq!(Transform::from_str("none").unwrap(), Transform::None);
        assert_eq!(
            Transform::from_str("winsor05").unwrap(),
            Transform::Winsor05
        );
        assert!(Transform::from_str("boxcox").is_err());
    }

    #[test]
    fn log_of_nonpositive_is_a_numeric_error() {
        let err = Transform::Log10.apply(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, AnovaError::Numeric { .. }));
    }

    #[test]
    fn arcsine_handles_proportions() {
        let (out, trim) = Transform::Arcsine.apply(&[0.0, 0.25, 1.0]).unwrap();
        assert_eq!(trim, 0);
        assert!((out[1] - 0.25f64.sqrt().asin()).abs() < 1e-12);
        assert!((out[2] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
