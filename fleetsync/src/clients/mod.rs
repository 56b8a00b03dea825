//! Clients for the remote fleet service.
//!
//! - maas: authenticated HTTP transport (forms in, JSON out)
//! - rest: per-kind paths and forms, and the `FleetApi` impl built on them

pub mod maas;
pub mod rest;

pub use maas::{Form, MaasClient};
pub use rest::RestResource;
