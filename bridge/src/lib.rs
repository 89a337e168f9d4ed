//! Job Bridge Library
//!
//! Turns authenticated CI triggers into builds on a remote Jenkins server and
//! tracks them to completion.

pub mod analytics;
pub mod app;
pub mod errors;
pub mod jenkins;
pub mod jobs;
pub mod logs;
pub mod poll;
pub mod sanitize;
pub mod server;
pub mod utils;
