//! `econ-calib` library crate.
//!
//! The binary (`calib`) is a thin wrapper around this library so that:
//!
//! - the window and calibration logic is testable without spawning processes
//! - the pipeline can be driven from other front-ends with in-memory panels

pub mod align;
pub mod app;
pub mod calibrate;
pub mod cli;
pub mod config;
pub mod cross_section;
pub mod cycle;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod stats;
pub mod transform;
pub mod window;
