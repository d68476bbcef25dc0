//! Infrastructure dashboard HTTP server

pub mod api;
pub mod config;
