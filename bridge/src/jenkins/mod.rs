//! Remote job server integration

pub mod client;
pub mod diagnose;
pub mod health;
pub mod models;
pub mod url;
