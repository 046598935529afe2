#![doc = "County-level turnout forecasting: boundary reconciliation, indicator imputation, feature tables, a boosted-tree turnout model and choropleth output"]
mod common;
mod io;

pub mod config;
pub mod diagnostics;
pub mod features;
pub mod forecast;
pub mod impute;
pub mod indicators;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod types;

#[doc(inline)]
pub use config::PipelineConfig;

#[doc(inline)]
pub use diagnostics::{Diagnostic, Diagnostics};

#[doc(inline)]
pub use pipeline::Pipeline;

#[doc(inline)]
pub use types::{County, CountyId, CountySet, ElectionResult, Indicator, Round};
