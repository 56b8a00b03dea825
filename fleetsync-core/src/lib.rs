//! Core of fleetsync: resolving, creating, converging and waiting on
//! objects managed by a remote bare-metal fleet service.
//!
//! The crate owns no transport. Callers inject a client implementing
//! [`api::FleetApi`] and drive it through a [`Fleet`] handle.

pub mod api;
pub mod compose;
pub mod converge;
pub mod create;
pub mod error;
pub mod model;
pub mod resolve;
pub mod resource;
pub mod wait;

#[cfg(test)]
mod testing;

pub use api::FleetApi;
pub use compose::{Fleet, WaitTimings};
pub use create::{Ensured, find_declared, get_or_create};
pub use error::{ApiError, FleetError, Result, StepContext};
pub use resolve::{find_match, resolve};
pub use resource::{Matcher, Resource};
pub use wait::{WaitSpec, wait_for_state};

pub use tokio_util::sync::CancellationToken;
