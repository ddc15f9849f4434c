//! Input data that does not come from files: seeded synthetic panels.

pub mod sample;

pub use sample::*;
