//! driftwatch: scheduled data-drift monitoring.
//!
//! A monitoring run fetches a dataset, splits it into a static reference set
//! and a rotating window of current rows, computes a drift report and a
//! drift test suite, and attaches both to a named project in a workspace.
//! A scheduler fires the run (and a heartbeat) on fixed intervals.

pub mod analysis;
pub mod api;
pub mod builder;
pub mod client;
pub mod config;
pub mod dataset;
pub mod db;
pub mod jobs;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod workspace;
