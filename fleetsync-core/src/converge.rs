//! Child collection convergence.
//!
//! Two strategies:
//! - targeted: remove what is no longer declared, then add what is missing;
//!   untouched elements receive no call (tags, tag membership, links)
//! - replace: delete every existing child, then create every declared child
//!   in declaration order (partitions, IP ranges)
//!
//! Both stop at the first failed call. Calls already made are not undone.

use std::collections::HashSet;
use std::hash::Hash;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::{InterfaceActions, ResourceApi, StorageActions, TagActions};
use crate::create::get_or_create;
use crate::error::Result;
use crate::model::{
    BlockDeviceRef, IpRange, IpRangeParams, IpRangeScope, Link, LinkMode, LinkRequest, Partition,
    PartitionParams, Tag, TagParams,
};

/// Number of calls a convergence made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    pub removed: usize,
    pub added: usize,
}

impl ConvergeReport {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.added == 0
    }
}

/// Calls planned by a targeted convergence.
#[derive(Debug, PartialEq, Eq)]
pub struct TargetedPlan<'a, E, D> {
    pub remove: Vec<&'a E>,
    pub add: Vec<&'a D>,
}

/// Compute `existing - desired` and `desired - existing` by key.
///
/// Removals keep existing order; additions keep declaration order with
/// repeated keys collapsed.
pub fn plan_targeted<'a, E, D, K>(
    existing: &'a [E],
    desired: &'a [D],
    existing_key: impl Fn(&E) -> K,
    desired_key: impl Fn(&D) -> K,
) -> TargetedPlan<'a, E, D>
where
    K: Eq + Hash,
{
    let desired_keys: HashSet<K> = desired.iter().map(&desired_key).collect();
    let existing_keys: HashSet<K> = existing.iter().map(&existing_key).collect();

    let remove = existing
        .iter()
        .filter(|item| !desired_keys.contains(&existing_key(item)))
        .collect();

    let mut seen = HashSet::new();
    let add = desired
        .iter()
        .filter(|item| {
            let key = desired_key(item);
            !existing_keys.contains(&key) && seen.insert(key)
        })
        .collect();

    TargetedPlan { remove, add }
}

/// Calls planned by a full replace.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplacePlan<'a, E, D> {
    pub delete: Vec<&'a E>,
    pub create: Vec<&'a D>,
}

/// Every existing child is deleted and every desired child created,
/// whether or not it changed.
pub fn plan_replace<'a, E, D>(existing: &'a [E], desired: &'a [D]) -> ReplacePlan<'a, E, D> {
    ReplacePlan {
        delete: existing.iter().collect(),
        create: desired.iter().collect(),
    }
}

/// A child collection converged by targeted add/remove.
#[async_trait]
pub trait TargetedCollection: Send + Sync {
    type Existing: Send + Sync;
    type Desired: Send + Sync;
    type Key: Eq + Hash;

    /// Label used in logs.
    const NAME: &'static str;

    fn existing_key(item: &Self::Existing) -> Self::Key;

    fn desired_key(item: &Self::Desired) -> Self::Key;

    async fn remove(&self, item: &Self::Existing) -> Result<()>;

    async fn add(&self, item: &Self::Desired) -> Result<()>;
}

/// Remove-then-add so that the collection ends up equal to `desired`.
pub async fn converge_targeted<C>(
    collection: &C,
    existing: &[C::Existing],
    desired: &[C::Desired],
) -> Result<ConvergeReport>
where
    C: TargetedCollection,
{
    let plan = plan_targeted(existing, desired, C::existing_key, C::desired_key);
    let mut report = ConvergeReport::default();

    for item in plan.remove {
        collection.remove(item).await?;
        report.removed += 1;
    }
    for item in plan.add {
        collection.add(item).await?;
        report.added += 1;
    }

    if !report.is_noop() {
        info!(
            collection = C::NAME,
            removed = report.removed,
            added = report.added,
            "Converged"
        );
    }
    Ok(report)
}

/// A child collection converged by deleting and recreating everything.
#[async_trait]
pub trait ReplaceCollection: Send + Sync {
    type Existing: Send + Sync;
    type Desired: Send + Sync;

    /// Label used in logs.
    const NAME: &'static str;

    async fn delete(&self, item: &Self::Existing) -> Result<()>;

    async fn create(&self, item: &Self::Desired) -> Result<()>;
}

/// Delete every existing child, then create every desired one in order.
///
/// Unchanged children are recreated too.
pub async fn converge_replace<C>(
    collection: &C,
    existing: &[C::Existing],
    desired: &[C::Desired],
) -> Result<ConvergeReport>
where
    C: ReplaceCollection,
{
    let plan = plan_replace(existing, desired);
    let mut report = ConvergeReport::default();

    for item in plan.delete {
        collection.delete(item).await?;
        report.removed += 1;
    }
    for item in plan.create {
        collection.create(item).await?;
        report.added += 1;
    }

    debug!(
        collection = C::NAME,
        removed = report.removed,
        added = report.added,
        "Replaced"
    );
    Ok(report)
}

// =============================================================================
// Tags
// =============================================================================

/// The tags carried by one machine.
pub struct MachineTags<'a, A: ?Sized> {
    pub api: &'a A,
    pub system_id: &'a str,
}

#[async_trait]
impl<A> TargetedCollection for MachineTags<'_, A>
where
    A: TagActions + ResourceApi<Tag> + ?Sized,
{
    type Existing = String;
    type Desired = String;
    type Key = String;

    const NAME: &'static str = "machine tags";

    fn existing_key(item: &String) -> String {
        item.clone()
    }

    fn desired_key(item: &String) -> String {
        item.clone()
    }

    async fn remove(&self, tag: &String) -> Result<()> {
        self.api
            .update_nodes(tag, &[], &[self.system_id.to_string()])
            .await?;
        Ok(())
    }

    async fn add(&self, tag: &String) -> Result<()> {
        get_or_create::<Tag, A>(self.api, &(), &TagParams::named(tag.as_str())).await?;
        self.api
            .update_nodes(tag, &[self.system_id.to_string()], &[])
            .await?;
        Ok(())
    }
}

/// The machines (by system ID) carrying one tag.
pub struct TagMembers<'a, A: ?Sized> {
    pub api: &'a A,
    pub tag: &'a str,
}

#[async_trait]
impl<A> TargetedCollection for TagMembers<'_, A>
where
    A: TagActions + ?Sized,
{
    type Existing = String;
    type Desired = String;
    type Key = String;

    const NAME: &'static str = "tag members";

    fn existing_key(item: &String) -> String {
        item.clone()
    }

    fn desired_key(item: &String) -> String {
        item.clone()
    }

    async fn remove(&self, system_id: &String) -> Result<()> {
        self.api
            .update_nodes(self.tag, &[], &[system_id.clone()])
            .await?;
        Ok(())
    }

    async fn add(&self, system_id: &String) -> Result<()> {
        self.api
            .update_nodes(self.tag, &[system_id.clone()], &[])
            .await?;
        Ok(())
    }
}

/// The tags carried by one block device.
pub struct BlockDeviceTags<'a, A: ?Sized> {
    pub api: &'a A,
    pub device: &'a BlockDeviceRef,
}

#[async_trait]
impl<A> TargetedCollection for BlockDeviceTags<'_, A>
where
    A: StorageActions + ?Sized,
{
    type Existing = String;
    type Desired = String;
    type Key = String;

    const NAME: &'static str = "block device tags";

    fn existing_key(item: &String) -> String {
        item.clone()
    }

    fn desired_key(item: &String) -> String {
        item.clone()
    }

    async fn remove(&self, tag: &String) -> Result<()> {
        self.api.remove_tag(self.device, tag).await?;
        Ok(())
    }

    async fn add(&self, tag: &String) -> Result<()> {
        self.api.add_tag(self.device, tag).await?;
        Ok(())
    }
}

// =============================================================================
// Links
// =============================================================================

/// Subnet links of one interface. Links are compared by subnet, mode and,
/// for static links only, address.
pub struct InterfaceLinks<'a, A: ?Sized> {
    pub api: &'a A,
    pub system_id: &'a str,
    pub interface_id: i64,
}

fn link_address(mode: LinkMode, ip_address: Option<&str>) -> Option<String> {
    match mode {
        LinkMode::Static => ip_address.map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl<A> TargetedCollection for InterfaceLinks<'_, A>
where
    A: InterfaceActions + ?Sized,
{
    type Existing = Link;
    type Desired = LinkRequest;
    type Key = (Option<i64>, LinkMode, Option<String>);

    const NAME: &'static str = "interface links";

    fn existing_key(link: &Link) -> Self::Key {
        (
            link.subnet.as_ref().map(|s| s.id),
            link.mode,
            link_address(link.mode, link.ip_address.as_deref()),
        )
    }

    fn desired_key(link: &LinkRequest) -> Self::Key {
        (
            Some(link.subnet_id),
            link.mode,
            link_address(link.mode, link.ip_address.as_deref()),
        )
    }

    async fn remove(&self, link: &Link) -> Result<()> {
        self.api
            .unlink_subnet(self.system_id, self.interface_id, link.id)
            .await?;
        Ok(())
    }

    async fn add(&self, link: &LinkRequest) -> Result<()> {
        self.api
            .link_subnet(self.system_id, self.interface_id, link)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Partitions
// =============================================================================

/// Partitions of one block device.
pub struct Partitions<'a, A: ?Sized> {
    pub api: &'a A,
    pub device: &'a BlockDeviceRef,
}

#[async_trait]
impl<A> ReplaceCollection for Partitions<'_, A>
where
    A: ResourceApi<Partition> + StorageActions + ?Sized,
{
    type Existing = Partition;
    type Desired = PartitionParams;

    const NAME: &'static str = "partitions";

    async fn delete(&self, partition: &Partition) -> Result<()> {
        ResourceApi::<Partition>::delete(self.api, self.device, &partition.id).await?;
        Ok(())
    }

    async fn create(&self, params: &PartitionParams) -> Result<()> {
        let partition = ResourceApi::<Partition>::create(self.api, self.device, params).await?;

        if let Some(fstype) = params.fs_type.as_deref() {
            self.api
                .format_partition(self.device, partition.id, fstype, params.label.as_deref())
                .await?;
            if let Some(mount_point) = params.mount_point.as_deref() {
                self.api
                    .mount_partition(
                        self.device,
                        partition.id,
                        mount_point,
                        params.mount_options.as_deref(),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// IP ranges
// =============================================================================

/// IP ranges of one subnet.
pub struct IpRanges<'a, A: ?Sized> {
    pub api: &'a A,
    pub scope: IpRangeScope,
}

#[async_trait]
impl<A> ReplaceCollection for IpRanges<'_, A>
where
    A: ResourceApi<IpRange> + ?Sized,
{
    type Existing = IpRange;
    type Desired = IpRangeParams;

    const NAME: &'static str = "ip ranges";

    async fn delete(&self, range: &IpRange) -> Result<()> {
        self.api.delete(&self.scope, &range.id).await?;
        Ok(())
    }

    async fn create(&self, params: &IpRangeParams) -> Result<()> {
        self.api.create(&self.scope, params).await?;
        Ok(())
    }
}
