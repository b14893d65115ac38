//! File input/output: configuration loading and store manifests

pub mod config;
pub mod manifest;
