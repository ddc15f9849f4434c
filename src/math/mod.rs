//! Numeric building blocks: the HP filter and capital-stock accounting.

pub mod capital;
pub mod hp;

pub use capital::*;
pub use hp::*;
