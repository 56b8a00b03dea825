//! Typed remote and declared representations of fleet objects.
//!
//! Remote types deserialize from the fleet service's JSON; declared
//! (`*Params`) types deserialize from the manifest and are never mutated by
//! the core.

mod dns;
mod machine;
mod network;
mod pool;
mod storage;
mod tag;
mod vm_host;

pub use dns::{DnsRecord, DnsRecordParams, DnsResource, DnsResourceParams, IpAddressRef};
pub use machine::{
    AllocateParams, BootInterface, CommissionParams, DeployParams, InstanceParams, Machine,
    MachineParams, MachineStatus, MachineUpdate, ReleaseParams, UnknownStatus,
};
pub use network::{
    InterfaceParams, InterfaceVariant, IpRange, IpRangeParams, IpRangeScope, IpRangeType, Link,
    LinkMode, LinkParams, LinkRequest, NetworkInterface, Subnet, SubnetParams, SubnetRef,
    VlanRef,
};
pub use pool::{ResourcePool, ResourcePoolParams};
pub use storage::{
    BlockDevice, BlockDeviceParams, BlockDeviceRef, Filesystem, GIGABYTE, Partition,
    PartitionParams,
};
pub use tag::{Tag, TagParams};
pub use vm_host::{Capacity, ComposeParams, ComposedMachine, VmHost, VmHostParams};

use serde::{Deserialize, Deserializer};

/// Reference to a named object embedded in another object's JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
