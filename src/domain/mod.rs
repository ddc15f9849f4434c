//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - period keys and series (`Period`, `Series`, `GroupData`, `Panel`)
//! - the half-open `Window`
//! - requested statistics and per-group outcomes (`CalibratedRecord`, `SkipReason`)

pub mod types;

pub use types::*;
