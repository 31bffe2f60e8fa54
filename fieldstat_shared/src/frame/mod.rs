//! Long-format observation table and its pivot/project operations.
//!
//! A [`DataFrame`] holds named columns of equal length: numeric columns for
//! measured values and label columns for subject identifiers and factor
//! levels. The engine consumes it through two operations:
//!
//! - [`DataFrame::pivot`] - a dense subjects x conditions matrix whose
//!   column order enumerates the Cartesian product of factor levels with
//!   the first factor varying slowest (Kronecker order)
//! - [`DataFrame::project`] - value lists grouped by level tuples, used by
//!   summary tables and export views
//!
//! Row order is deterministic: subjects are sorted by identifier and factor
//! levels by label, so the same table always produces the same pivot.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array2;
use serde::Serialize;

/// Result type alias for frame operations
pub type FrameResult<T> = Result<T, FrameError>;

/// Error type for data-frame construction and reshaping
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A named column does not exist
    MissingColumn { name: String },

    /// A column exists but holds the wrong kind of data
    TypeMismatch { column: String, expected: String },

    /// A column's length does not match the frame's row count
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    /// The pivot's column count does not match the level-count product
    Shape { expected: usize, got: usize },

    /// An operation requires data that is not there
    Empty { what: String },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MissingColumn { name } => write!(f, "No column named '{}'", name),
            FrameError::TypeMismatch { column, expected } => {
                write!(f, "Column '{}' is not {}", column, expected)
            }
            FrameError::LengthMismatch {
                column,
                expected,
                got,
            } => write!(
                f,
                "Column '{}' has {} rows, frame has {}",
                column, got, expected
            ),
            FrameError::Shape { expected, got } => write!(
                f,
                "Pivot width mismatch: level products give {}, matrix has {}",
                expected, got
            ),
            FrameError::Empty { what } => write!(f, "Empty {}", what),
        }
    }
}

impl std::error::Error for FrameError {}

impl FrameError {
    pub fn missing_column(name: impl Into<String>) -> Self {
        FrameError::MissingColumn { name: name.into() }
    }

    pub fn type_mismatch(column: impl Into<String>, expected: impl Into<String>) -> Self {
        FrameError::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
        }
    }

    pub fn shape(expected: usize, got: usize) -> Self {
        FrameError::Shape { expected, got }
    }

    pub fn empty(what: impl Into<String>) -> Self {
        FrameError::Empty { what: what.into() }
    }
}

#[derive(Debug, Clone)]
enum Column {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Labels(v) => v.len(),
        }
    }
}

/// Long-format table with named columns of equal length.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
}

/// Dense pivot of a value column over subject rows and condition columns.
#[derive(Debug, Clone)]
pub struct Pivot {
    /// `Nr x Nd` matrix, subjects sorted by identifier
    pub matrix: Array2<f64>,
    /// Sorted subject identifiers, one per row
    pub row_ids: Vec<String>,
    /// Level tuple for each column, in Kronecker order
    pub col_levels: Vec<Vec<String>>,
    /// Observation count behind each cell (zero marks an imputed cell)
    pub counts: Array2<usize>,
    /// Number of cells imputed with the grand mean
    pub imputed: usize,
    /// Grand mean of the value column used for imputation
    pub grand_mean: f64,
}

/// Per-cell summary row produced by [`DataFrame::describe`].
#[derive(Debug, Clone, Serialize)]
pub struct CellSummary {
    pub levels: Vec<String>,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two observations
    pub sd: Option<f64>,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows; zero for a frame with no columns.
    pub fn rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Add a numeric column. The first column fixes the row count.
    pub fn add_numeric(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> FrameResult<&mut Self> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.names.push(name);
        self.columns.push(Column::Numeric(values));
        Ok(self)
    }

    /// Add a label column (subject identifiers or factor levels).
    pub fn add_labels(
        &mut self,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> FrameResult<&mut Self> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.names.push(name);
        self.columns.push(Column::Labels(values));
        Ok(self)
    }

    fn check_len(&self, column: &str, got: usize) -> FrameResult<()> {
        if !self.columns.is_empty() && got != self.rows() {
            return Err(FrameError::LengthMismatch {
                column: column.to_string(),
                expected: self.rows(),
                got,
            });
        }
        Ok(())
    }

    fn column(&self, name: &str) -> FrameResult<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| FrameError::missing_column(name))
    }

    /// Borrow a numeric column.
    pub fn numeric(&self, name: &str) -> FrameResult<&[f64]> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(v),
            Column::Labels(_) => Err(FrameError::type_mismatch(name, "numeric")),
        }
    }

    /// Borrow a label column.
    pub fn labels(&self, name: &str) -> FrameResult<&[String]> {
        match self.column(name)? {
            Column::Labels(v) => Ok(v),
            Column::Numeric(_) => Err(FrameError::type_mismatch(name, "labels")),
        }
    }

    /// Distinct levels of a label column, sorted by label.
    pub fn levels(&self, name: &str) -> FrameResult<Vec<String>> {
        let labels = self.labels(name)?;
        let mut distinct: Vec<String> = labels.to_vec();
        distinct.sort();
        distinct.dedup();
        if distinct.is_empty() {
            return Err(FrameError::empty(format!("level set of '{}'", name)));
        }
        Ok(distinct)
    }

    /// Pivot a value column into the dense subjects x conditions matrix.
    ///
    /// Cells with several observations aggregate by mean; cells with none
    /// are imputed with the grand mean of the value column and counted in
    /// [`Pivot::imputed`].
    pub fn pivot(&self, value: &str, rows: &str, cols: &[&str]) -> FrameResult<Pivot> {
        let values = self.numeric(value)?;
        self.pivot_with(values, rows, cols)
    }

    /// Pivot an explicit value vector (one entry per frame row).
    ///
    /// Used when the dependent variable has been transformed ahead of the
    /// pivot; the frame still supplies subjects and factor levels.
    pub fn pivot_with(&self, values: &[f64], rows: &str, cols: &[&str]) -> FrameResult<Pivot> {
        if cols.is_empty() {
            return Err(FrameError::empty("factor list"));
        }
        if values.len() != self.rows() {
            return Err(FrameError::LengthMismatch {
                column: "<values>".to_string(),
                expected: self.rows(),
                got: values.len(),
            });
        }
        if values.is_empty() {
            return Err(FrameError::empty("observation table"));
        }

        let subjects = self.labels(rows)?;
        let mut row_ids: Vec<String> = subjects.to_vec();
        row_ids.sort();
        row_ids.dedup();

        let level_sets: Vec<Vec<String>> = cols
            .iter()
            .map(|c| self.levels(c))
            .collect::<FrameResult<_>>()?;
        let width = level_sets.iter().fold(Some(1usize), |acc, set| {
            acc.and_then(|w| w.checked_mul(set.len()))
        });
        let width = width.ok_or_else(|| FrameError::shape(usize::MAX, 0))?;
        if width == 0 {
            return Err(FrameError::empty("condition set"));
        }

        let row_index: BTreeMap<&str, usize> = row_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let factor_labels: Vec<&[String]> = cols
            .iter()
            .map(|c| self.labels(c))
            .collect::<FrameResult<_>>()?;

        // accumulate sums and counts per (subject, condition) cell
        let mut sums = Array2::<f64>::zeros((row_ids.len(), width));
        let mut counts = Array2::<usize>::zeros((row_ids.len(), width));
        for r in 0..self.rows() {
            let subject = row_index[subjects[r].as_str()];
            let mut cell = 0usize;
            for (labels, set) in factor_labels.iter().zip(&level_sets) {
                let level = set
                    .binary_search(&labels[r])
                    .expect("level sets are built from these labels");
                cell = cell * set.len() + level;
            }
            sums[[subject, cell]] += values[r];
            counts[[subject, cell]] += 1;
        }

        let grand_mean = values.iter().sum::<f64>() / values.len() as f64;
        let mut matrix = Array2::<f64>::zeros((row_ids.len(), width));
        let mut imputed = 0usize;
        for s in 0..row_ids.len() {
            for c in 0..width {
                matrix[[s, c]] = if counts[[s, c]] > 0 {
                    sums[[s, c]] / counts[[s, c]] as f64
                } else {
                    imputed += 1;
                    grand_mean
                };
            }
        }

        if matrix.ncols() != width {
            return Err(FrameError::shape(width, matrix.ncols()));
        }

        let col_levels = cartesian(&level_sets);
        Ok(Pivot {
            matrix,
            row_ids,
            col_levels,
            counts,
            imputed,
            grand_mean,
        })
    }

    /// Group a value column by level tuples, in Kronecker cell order.
    ///
    /// Every cell of the Cartesian product appears, empty cells with an
    /// empty value list.
    pub fn project(
        &self,
        value: &str,
        group_cols: &[&str],
    ) -> FrameResult<Vec<(Vec<String>, Vec<f64>)>> {
        let values = self.numeric(value)?;
        if group_cols.is_empty() {
            return Err(FrameError::empty("group column list"));
        }

        let level_sets: Vec<Vec<String>> = group_cols
            .iter()
            .map(|c| self.levels(c))
            .collect::<FrameResult<_>>()?;
        let factor_labels: Vec<&[String]> = group_cols
            .iter()
            .map(|c| self.labels(c))
            .collect::<FrameResult<_>>()?;
        let width: usize = level_sets.iter().map(Vec::len).product();

        let mut cells: Vec<Vec<f64>> = vec![Vec::new(); width];
        for r in 0..self.rows() {
            let mut cell = 0usize;
            for (labels, set) in factor_labels.iter().zip(&level_sets) {
                let level = set
                    .binary_search(&labels[r])
                    .expect("level sets are built from these labels");
                cell = cell * set.len() + level;
            }
            cells[cell].push(values[r]);
        }

        Ok(cartesian(&level_sets).into_iter().zip(cells).collect())
    }

    /// Per-cell N / mean / standard deviation over the grouped value column.
    pub fn describe(&self, value: &str, group_cols: &[&str]) -> FrameResult<Vec<CellSummary>> {
        let groups = self.project(value, group_cols)?;
        Ok(groups
            .into_iter()
            .map(|(levels, values)| {
                let n = values.len();
                let mean = if n == 0 {
                    0.0
                } else {
                    values.iter().sum::<f64>() / n as f64
                };
                let sd = if n >= 2 {
                    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
                    Some((ss / (n as f64 - 1.0)).sqrt())
                } else {
                    None
                };
                CellSummary {
                    levels,
                    n,
                    mean,
                    sd,
                }
            })
            .collect())
    }
}

/// Cartesian product of level sets in Kronecker order (first set slowest).
fn cartesian(level_sets: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = vec![Vec::new()];
    for set in level_sets {
        let mut next = Vec::with_capacity(out.len() * set.len());
        for prefix in &out {
            for level in set {
                let mut tuple = prefix.clone();
                tuple.push(level.clone());
                next.push(tuple);
            }
        }
        out = next;
    }
    out
}
