//! Machines, their lifecycle states and the parameters of machine actions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use super::{NamedRef, null_default};
use crate::resource::{Matcher, Resource, mac_eq};

/// Lifecycle state of a machine, as labelled by the fleet service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MachineStatus {
    New,
    Commissioning,
    FailedCommissioning,
    Missing,
    Ready,
    Reserved,
    Allocated,
    Deploying,
    Deployed,
    Retired,
    Broken,
    FailedDeployment,
    Releasing,
    FailedReleasing,
    DiskErasing,
    FailedDiskErasing,
    RescueMode,
    EnteringRescueMode,
    FailedEnteringRescueMode,
    ExitingRescueMode,
    FailedExitingRescueMode,
    Testing,
    FailedTesting,
}

impl MachineStatus {
    pub const ALL: [MachineStatus; 23] = [
        MachineStatus::New,
        MachineStatus::Commissioning,
        MachineStatus::FailedCommissioning,
        MachineStatus::Missing,
        MachineStatus::Ready,
        MachineStatus::Reserved,
        MachineStatus::Allocated,
        MachineStatus::Deploying,
        MachineStatus::Deployed,
        MachineStatus::Retired,
        MachineStatus::Broken,
        MachineStatus::FailedDeployment,
        MachineStatus::Releasing,
        MachineStatus::FailedReleasing,
        MachineStatus::DiskErasing,
        MachineStatus::FailedDiskErasing,
        MachineStatus::RescueMode,
        MachineStatus::EnteringRescueMode,
        MachineStatus::FailedEnteringRescueMode,
        MachineStatus::ExitingRescueMode,
        MachineStatus::FailedExitingRescueMode,
        MachineStatus::Testing,
        MachineStatus::FailedTesting,
    ];

    /// The service's `status_name` label.
    pub fn label(self) -> &'static str {
        match self {
            MachineStatus::New => "New",
            MachineStatus::Commissioning => "Commissioning",
            MachineStatus::FailedCommissioning => "Failed commissioning",
            MachineStatus::Missing => "Missing",
            MachineStatus::Ready => "Ready",
            MachineStatus::Reserved => "Reserved",
            MachineStatus::Allocated => "Allocated",
            MachineStatus::Deploying => "Deploying",
            MachineStatus::Deployed => "Deployed",
            MachineStatus::Retired => "Retired",
            MachineStatus::Broken => "Broken",
            MachineStatus::FailedDeployment => "Failed deployment",
            MachineStatus::Releasing => "Releasing",
            MachineStatus::FailedReleasing => "Releasing failed",
            MachineStatus::DiskErasing => "Disk erasing",
            MachineStatus::FailedDiskErasing => "Failed disk erasing",
            MachineStatus::RescueMode => "Rescue mode",
            MachineStatus::EnteringRescueMode => "Entering rescue mode",
            MachineStatus::FailedEnteringRescueMode => "Failed to enter rescue mode",
            MachineStatus::ExitingRescueMode => "Exiting rescue mode",
            MachineStatus::FailedExitingRescueMode => "Failed to exit rescue mode",
            MachineStatus::Testing => "Testing",
            MachineStatus::FailedTesting => "Failed testing",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A status label outside the known set.
#[derive(Debug, Clone, Error)]
#[error("unknown machine status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MachineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineStatus::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for MachineStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BootInterface {
    #[serde(default, deserialize_with = "null_default")]
    pub mac_address: String,
}

/// A machine as returned by the fleet service.
#[derive(Debug, Clone, Deserialize)]
pub struct Machine {
    pub system_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub hostname: String,
    #[serde(default, deserialize_with = "null_default")]
    pub fqdn: String,
    pub status_name: MachineStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub zone: Option<NamedRef>,
    #[serde(default)]
    pub pool: Option<NamedRef>,
    #[serde(default)]
    pub domain: Option<NamedRef>,
    #[serde(default)]
    pub boot_interface: Option<BootInterface>,
    #[serde(default, deserialize_with = "null_default")]
    pub power_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub power_state: String,
    #[serde(default, deserialize_with = "null_default")]
    pub architecture: String,
    #[serde(default, deserialize_with = "null_default")]
    pub cpu_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub memory: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub ip_addresses: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub osystem: String,
    #[serde(default, deserialize_with = "null_default")]
    pub distro_series: String,
}

impl Machine {
    pub fn status(&self) -> MachineStatus {
        self.status_name
    }

    pub fn boot_mac(&self) -> Option<&str> {
        self.boot_interface
            .as_ref()
            .map(|iface| iface.mac_address.as_str())
            .filter(|mac| !mac.is_empty())
    }
}

impl Resource for Machine {
    type Id = String;
    type Scope = ();
    type Params = MachineParams;
    type Update = MachineUpdate;

    const KIND: &'static str = "machine";

    fn id(&self) -> String {
        self.system_id.clone()
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("hostname", |m, ident| m.hostname == ident),
            Matcher::new("fqdn", |m, ident| m.fqdn == ident),
            Matcher::new("mac_address", |m, ident| {
                m.boot_mac().is_some_and(|mac| mac_eq(mac, ident))
            }),
        ]
    }

    fn declared_identifier(params: &MachineParams) -> Option<&str> {
        Some(params.pxe_mac_address.as_str())
    }
}

/// Declared bare machine, enlisted by power parameters and PXE MAC.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineParams {
    pub power_type: String,
    #[serde(default)]
    pub power_parameters: BTreeMap<String, String>,
    pub pxe_mac_address: String,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub min_hwe_kernel: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Fields applied to an existing machine. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MachineUpdate {
    pub hostname: Option<String>,
    pub domain: Option<String>,
    pub zone: Option<String>,
    pub pool: Option<String>,
    pub architecture: Option<String>,
    pub min_hwe_kernel: Option<String>,
    pub power_type: Option<String>,
    pub power_parameters: Option<BTreeMap<String, String>>,
}

impl MachineUpdate {
    pub fn is_empty(&self) -> bool {
        *self == MachineUpdate::default()
    }
}

impl From<&MachineParams> for MachineUpdate {
    fn from(params: &MachineParams) -> Self {
        Self {
            hostname: params.hostname.clone(),
            domain: params.domain.clone(),
            zone: params.zone.clone(),
            pool: params.pool.clone(),
            architecture: params.architecture.clone(),
            min_hwe_kernel: params.min_hwe_kernel.clone(),
            power_type: Some(params.power_type.clone()),
            power_parameters: Some(params.power_parameters.clone()),
        }
    }
}

/// Constraints for allocating a machine to an instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AllocateParams {
    pub system_id: Option<String>,
    pub hostname: Option<String>,
    pub min_cpu_count: Option<u32>,
    pub min_memory: Option<u64>,
    pub tags: Vec<String>,
    pub not_tags: Vec<String>,
    pub zone: Option<String>,
    pub pool: Option<String>,
    pub arch: Option<String>,
}

impl AllocateParams {
    /// Identifier of the specific machine requested, if any.
    pub fn target(&self) -> Option<&str> {
        self.system_id.as_deref().or(self.hostname.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeployParams {
    pub distro_series: Option<String>,
    pub hwe_kernel: Option<String>,
    pub user_data: Option<String>,
    pub register_vmhost: bool,
    pub enable_hw_sync: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseParams {
    pub erase: bool,
    pub secure_erase: bool,
    pub quick_erase: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommissionParams {
    pub enable_ssh: bool,
    pub skip_networking: bool,
    pub skip_storage: bool,
    pub commissioning_scripts: Vec<String>,
    pub testing_scripts: Vec<String>,
}

/// Declared deployed instance: which machine to allocate and how to deploy it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstanceParams {
    pub allocate: AllocateParams,
    pub deploy: DeployParams,
    pub release: ReleaseParams,
}
