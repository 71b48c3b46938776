//! Domain models for the Field Monitoring Platform

pub mod crop;
pub mod field;
pub mod ndvi;

pub use crop::*;
pub use field::*;
pub use ndvi::*;
