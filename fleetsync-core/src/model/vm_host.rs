//! VM hosts (pods) and machine composition.

use serde::Deserialize;

use super::{NamedRef, null_default};
use crate::resource::{Matcher, Resource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Capacity {
    #[serde(default, deserialize_with = "null_default")]
    pub cores: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub memory: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub local_storage: u64,
}

/// A VM host able to compose new machines from its capacity.
#[derive(Debug, Clone, Deserialize)]
pub struct VmHost {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub host_type: String,
    #[serde(default)]
    pub zone: Option<NamedRef>,
    #[serde(default)]
    pub pool: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub cpu_over_commit_ratio: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub memory_over_commit_ratio: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub default_macvlan_mode: String,
    #[serde(default)]
    pub total: Capacity,
    #[serde(default)]
    pub used: Capacity,
    #[serde(default)]
    pub available: Capacity,
}

impl Resource for VmHost {
    type Id = i64;
    type Scope = ();
    type Params = VmHostParams;
    type Update = VmHostParams;

    const KIND: &'static str = "vm host";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("name", |h, ident| h.name == ident),
        ]
    }

    fn declared_identifier(params: &VmHostParams) -> Option<&str> {
        Some(params.name.as_str())
    }
}

/// Declared VM host registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmHostParams {
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: String,
    pub power_address: String,
    #[serde(default)]
    pub power_user: Option<String>,
    #[serde(default)]
    pub power_pass: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cpu_over_commit_ratio: Option<f64>,
    #[serde(default)]
    pub memory_over_commit_ratio: Option<f64>,
    #[serde(default)]
    pub default_macvlan_mode: Option<String>,
}

/// Resources requested for a machine composed on a VM host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComposeParams {
    pub cores: Option<u32>,
    /// Memory in MiB.
    pub memory: Option<u64>,
    /// Storage constraint, e.g. `root:20(default)`.
    pub storage: Option<String>,
    pub interfaces: Option<String>,
    pub hostname: Option<String>,
    pub domain: Option<String>,
    pub zone: Option<String>,
    pub pool: Option<String>,
}

/// Response of a compose call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComposedMachine {
    pub system_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub resource_uri: String,
}
