//! Fieldstat Shared Library
//!
//! Shared building blocks for the Fieldstat analysis engine.
//!
//! This library provides:
//! - A long-format data frame with the pivot/project operations the
//!   analysis engine is built on
//! - Dense matrix primitives (Kronecker products, rank, covariance)
//! - Probability distribution functions (central and noncentral F,
//!   Student t quantiles)

pub mod frame;
pub mod numeric;

// Re-export commonly used types
pub use frame::{CellSummary, DataFrame, FrameError, Pivot};
pub use numeric::dist::{f_cdf, f_quantile, f_sf, noncentral_f_cdf, t_quantile};
pub use numeric::{covariance, kron, rank, trace, NumericError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
