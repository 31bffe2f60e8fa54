//! Contrast and averaging matrix construction.
//!
//! Each factor contributes one of two component pairs, and an effect's full
//! matrices are Kronecker products of the per-factor components in factor
//! order, so they line up with the pivot's column ordering (first factor
//! slowest).

use ndarray::Array2;

use fieldstat_shared::kron;

/// Per-factor role inside one effect's projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Collapse this factor: ones column for the contrast, `1/D` column for
    /// the averaging matrix
    Mean,
    /// Contrast this factor: column-centered identity, raw identity for the
    /// averaging matrix
    Deviation,
}

/// Ones column and its `1/D` averaging pair.
pub fn mean_component(arity: usize) -> (Array2<f64>, Array2<f64>) {
    let ones = Array2::from_elem((arity, 1), 1.0);
    let avg = Array2::from_elem((arity, 1), 1.0 / arity as f64);
    (ones, avg)
}

/// Column-centered identity and its raw-identity averaging pair.
pub fn deviation_component(arity: usize) -> (Array2<f64>, Array2<f64>) {
    let mut centered = Array2::<f64>::eye(arity);
    centered -= 1.0 / arity as f64;
    (centered, Array2::<f64>::eye(arity))
}

/// Assemble the contrast and averaging matrices for one effect.
///
/// `codes[i]` says whether factor `i` (arity `arities[i]`) is collapsed or
/// contrasted. The result has `prod(arities)` rows.
pub fn effect_matrices(codes: &[Code], arities: &[usize]) -> (Array2<f64>, Array2<f64>) {
    debug_assert_eq!(codes.len(), arities.len());
    let mut contrast = Array2::from_elem((1, 1), 1.0);
    let mut averaging = Array2::from_elem((1, 1), 1.0);
    for (&code, &arity) in codes.iter().zip(arities) {
        let (c, a) = match code {
            Code::Mean => mean_component(arity),
            Code::Deviation => deviation_component(arity),
        };
        contrast = kron(&contrast, &c);
        averaging = kron(&averaging, &a);
    }
    (contrast, averaging)
}

/// Codes for an effect given the set of contrasted factor indices.
pub fn codes_for(effect: &[usize], nf: usize) -> Vec<Code> {
    (0..nf)
        .map(|i| {
            if effect.contains(&i) {
                Code::Deviation
            } else {
                Code::Mean
            }
        })
        .collect()
}

/// All non-empty factor subsets, ordered by size then factor order.
///
/// This enumerates the `2^nf - 1` effects: main effects first, then
/// two-way interactions, and so on.
pub fn enumerate_effects(nf: usize) -> Vec<Vec<usize>> {
    let mut subsets: Vec<Vec<usize>> = Vec::with_capacity((1usize << nf) - 1);
    for mask in 1u32..(1u32 << nf) {
        let subset: Vec<usize> = (0..nf).filter(|i| mask & (1 << i) != 0).collect();
        subsets.push(subset);
    }
    subsets.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    subsets
}

/// All non-empty proper subsets of an effect.
pub fn proper_subsets(effect: &[usize]) -> Vec<Vec<usize>> {
    let n = effect.len();
    let mut out = Vec::new();
    if n < 2 {
        return out;
    }
    for mask in 1u32..((1u32 << n) - 1) {
        out.push(
            (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| effect[i])
                .collect(),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_component_sums_and_averages() {
        let (ones, avg) = mean_component(4);
        assert_eq!(ones.dim(), (4, 1));
        assert!(ones.iter().all(|&v| v == 1.0));
        assert!(avg.iter().all(|&v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn deviation_component_columns_sum_to_zero() {
        let (centered, raw) = deviation_component(3);
        for col in centered.columns() {
            assert!(col.sum().abs() < 1e-12);
        }
        assert_eq!(raw, Array2::<f64>::eye(3));
    }

    #[test]
    fn effect_matrices_have_kronecker_shape() {
        let codes = [Code::Deviation, Code::Mean, Code::Deviation];
        let (c, a) = effect_matrices(&codes, &[3, 2, 4]);
        assert_eq!(c.dim(), (24, 12));
        assert_eq!(a.dim(), (24, 12));
    }

    #[test]
    fn collapsed_factor_sums_in_contrast_averages_in_averaging() {
        let codes = [Code::Deviation, Code::Mean];
        let (c, a) = effect_matrices(&codes, &[2, 2]);
        // contrast column 0: centered on factor 1, summed over factor 2
        assert!((c[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((c[[1, 0]] - 0.5).abs() < 1e-12);
        assert!((c[[2, 0]] + 0.5).abs() < 1e-12);
        // averaging column 0: selects level 0 of factor 1, averages factor 2
        assert!((a[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((a[[2, 0]] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn enumerate_effects_counts_and_orders() {
        let effects = enumerate_effects(3);
        assert_eq!(effects.len(), 7);
        assert_eq!(effects[0], vec![0]);
        assert_eq!(effects[2], vec![2]);
        assert_eq!(effects[3], vec![0, 1]);
        assert_eq!(effects[6], vec![0, 1, 2]);
    }

    #[test]
    fn proper_subsets_of_three_way() {
        let subs = proper_subsets(&[0, 2, 3]);
        assert_eq!(subs.len(), 6);
        assert!(subs.contains(&vec![0]));
        assert!(subs.contains(&vec![0, 3]));
        assert!(!subs.contains(&vec![0, 2, 3]));
    }
}
