//! Job orchestration: validation, dispatch, polling and result mapping

pub mod outcome;
pub mod request;
pub mod service;
