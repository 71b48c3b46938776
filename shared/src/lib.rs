//! Shared types and models for the Field Monitoring Platform
//!
//! This crate contains the domain types and the pure geometry/statistics
//! logic shared between the backend server and supporting tools. Nothing
//! in here touches the network or the database.

pub mod geometry;
pub mod models;

pub use geometry::*;
pub use models::*;
