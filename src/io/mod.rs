//! Input/output helpers.
//!
//! - CSV ingest + validation of panels and lookups (`ingest`)
//! - record, manifest, panel and filter exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
