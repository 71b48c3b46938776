//! HTTP request handlers

pub mod admin;
pub mod config;
pub mod crop;
pub mod field;
pub mod health;
pub mod ndvi;
