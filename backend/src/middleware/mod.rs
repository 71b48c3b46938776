//! Request middleware

pub mod admin;

pub use admin::admin_auth;
