//! Domain models for driftwatch.
//!
//! # Core Concepts
//!
//! - [`Project`]: A named monitoring stream inside a workspace, carrying the
//!   [`Dashboard`] that plots its results. Names are not unique.
//! - [`Snapshot`]: An immutable report or test suite attached to a project.
//!   Every attach appends; there is no replace.
//! - [`DashboardPanel`]: Counter or plot widget reading metric fields out of
//!   report snapshots through a [`PanelValue`].

mod dashboard;
mod project;
mod snapshot;

pub use dashboard::*;
pub use project::*;
pub use snapshot::*;
