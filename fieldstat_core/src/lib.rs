//! # Fieldstat Core
//!
//! A deterministic analysis engine for humanitarian program data. Two
//! independent cores share one workspace:
//!
//! - [`anova`] - factorial analysis of variance over long-format
//!   observation tables: between-, within-, and mixed-subject designs with
//!   sphericity corrections, generalized effect sizes, Loftus-Masson
//!   intervals, and observed power
//! - [`supply`] - a read-only projection unifying stock, incoming, and
//!   planned item records into one queryable virtual entity with derived
//!   attributes and filter/export semantics
//!
//! ## Quick Start
//!
//! ```no_run
//! use fieldstat_core::anova::{run, Transform};
//! use fieldstat_core::render::{report, ReportOptions};
//! use fieldstat_shared::DataFrame;
//!
//! # fn demo(table: &DataFrame) -> Result<(), fieldstat_core::anova::AnovaError> {
//! let result = run(
//!     table,
//!     "rt",
//!     &["angle", "noise"],
//!     &[],
//!     "subject",
//!     Some("ms"),
//!     Transform::None,
//!     0.05,
//! )?;
//! println!("{}", report(&result, &ReportOptions::default()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - engine configuration via TOML
//! - [`anova`] - the analysis engine and its renderer
//! - [`supply`] - the supply item-entity projection
//! - [`logging`] - JSON line-delimited run logging

pub mod anova;
pub mod config;
pub mod logging;
pub mod supply;

pub use anova::render;
pub use anova::render::{report, ReportOptions};
pub use anova::{
    eps_gg, eps_hf, eps_lb, generalized_eta, run, winsorize, AnovaError, AnovaResult, Corrected,
    DesignKind, EffectEntry, EffectKey, EffectStats, Sphericity, Transform,
};
pub use config::{AnalysisConfig, ConfigError};
pub use supply::{
    EntityFilter, EntityRow, InstanceType, Item, ItemCategory, ItemEntity, ItemInstance, Office,
    Organisation, Region, Site, SupplyCatalog,
};
