//! fleetsync: converge a bare-metal fleet managed by MAAS to a declared
//! manifest.
//!
//! The convergence logic lives in `fleetsync_core`; this crate supplies the
//! REST client, its configuration and the manifest format.

pub mod clients;
pub mod config;
pub mod manifest;

pub use clients::MaasClient;
pub use config::{ApiKey, ClientConfig, ConfigError};
pub use manifest::{Manifest, ManifestError};
