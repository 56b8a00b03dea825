//! Collaborator traits implemented by fleet service clients.
//!
//! The core never talks to the network itself. Every operation receives a
//! client implementing these traits, which keeps transport, encoding and
//! authentication outside the core.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{
    AllocateParams, BlockDevice, BlockDeviceRef, CommissionParams, ComposeParams,
    ComposedMachine, DeployParams, DnsRecord, DnsResource, IpRange, LinkRequest, Machine,
    NetworkInterface, Partition, ReleaseParams, ResourcePool, Subnet, Tag, VmHost,
};
use crate::resource::Resource;

/// CRUD access to one resource kind.
#[async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync {
    /// Fetch the whole collection within `scope`, in service order.
    async fn list(&self, scope: &R::Scope) -> Result<Vec<R>, ApiError>;

    async fn get(&self, scope: &R::Scope, id: &R::Id) -> Result<R, ApiError>;

    async fn create(&self, scope: &R::Scope, params: &R::Params) -> Result<R, ApiError>;

    async fn update(
        &self,
        scope: &R::Scope,
        id: &R::Id,
        update: &R::Update,
    ) -> Result<R, ApiError>;

    async fn delete(&self, scope: &R::Scope, id: &R::Id) -> Result<(), ApiError>;
}

/// Lifecycle transitions of machines.
#[async_trait]
pub trait MachineActions: Send + Sync {
    /// Acquire a machine matching the constraints.
    async fn allocate(&self, params: &AllocateParams) -> Result<Machine, ApiError>;

    async fn deploy(&self, system_id: &str, params: &DeployParams) -> Result<Machine, ApiError>;

    async fn release(&self, system_id: &str, params: &ReleaseParams) -> Result<Machine, ApiError>;

    async fn commission(
        &self,
        system_id: &str,
        params: &CommissionParams,
    ) -> Result<Machine, ApiError>;
}

#[async_trait]
pub trait VmHostActions: Send + Sync {
    /// Allocate a new machine from the host's capacity.
    async fn compose(
        &self,
        vm_host_id: i64,
        params: &ComposeParams,
    ) -> Result<ComposedMachine, ApiError>;
}

#[async_trait]
pub trait TagActions: Send + Sync {
    /// Add and remove machines (by system ID) from a tag.
    async fn update_nodes(&self, tag: &str, add: &[String], remove: &[String])
    -> Result<(), ApiError>;
}

#[async_trait]
pub trait InterfaceActions: Send + Sync {
    async fn link_subnet(
        &self,
        system_id: &str,
        interface_id: i64,
        link: &LinkRequest,
    ) -> Result<NetworkInterface, ApiError>;

    async fn unlink_subnet(
        &self,
        system_id: &str,
        interface_id: i64,
        link_id: i64,
    ) -> Result<NetworkInterface, ApiError>;
}

#[async_trait]
pub trait StorageActions: Send + Sync {
    async fn add_tag(&self, device: &BlockDeviceRef, tag: &str) -> Result<(), ApiError>;

    async fn remove_tag(&self, device: &BlockDeviceRef, tag: &str) -> Result<(), ApiError>;

    async fn set_boot_disk(&self, device: &BlockDeviceRef) -> Result<(), ApiError>;

    async fn format_partition(
        &self,
        device: &BlockDeviceRef,
        partition_id: i64,
        fstype: &str,
        label: Option<&str>,
    ) -> Result<Partition, ApiError>;

    async fn mount_partition(
        &self,
        device: &BlockDeviceRef,
        partition_id: i64,
        mount_point: &str,
        mount_options: Option<&str>,
    ) -> Result<Partition, ApiError>;
}

/// Everything the composition layer needs from a fleet client.
pub trait FleetApi:
    ResourceApi<Machine>
    + ResourceApi<VmHost>
    + ResourceApi<BlockDevice>
    + ResourceApi<Partition>
    + ResourceApi<NetworkInterface>
    + ResourceApi<Subnet>
    + ResourceApi<IpRange>
    + ResourceApi<DnsResource>
    + ResourceApi<DnsRecord>
    + ResourceApi<Tag>
    + ResourceApi<ResourcePool>
    + MachineActions
    + VmHostActions
    + TagActions
    + InterfaceActions
    + StorageActions
{
}

impl<T> FleetApi for T where
    T: ResourceApi<Machine>
        + ResourceApi<VmHost>
        + ResourceApi<BlockDevice>
        + ResourceApi<Partition>
        + ResourceApi<NetworkInterface>
        + ResourceApi<Subnet>
        + ResourceApi<IpRange>
        + ResourceApi<DnsResource>
        + ResourceApi<DnsRecord>
        + ResourceApi<Tag>
        + ResourceApi<ResourcePool>
        + MachineActions
        + VmHostActions
        + TagActions
        + InterfaceActions
        + StorageActions
{
}
