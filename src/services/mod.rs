//! Core services: sources, target store, entry factory, policies, and the
//! concurrent import engine

pub mod engine;
pub mod factory;
pub mod filters;
pub mod metrics;
pub mod policy;
pub mod source;
pub mod store;
