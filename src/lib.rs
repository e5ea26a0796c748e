//! Batch descriptive statistics over files of newline-separated numbers.
//!
//! The pipeline is [`data::loader`] → [`processing::statistics`] →
//! [`processing::report`], driven by [`app::run`].

pub mod app;
pub mod cli;
pub mod data;
pub mod processing;
pub mod state;
