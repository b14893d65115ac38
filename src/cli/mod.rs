//! Command-line argument definitions and report formatting

pub mod args;
pub mod output;
