//! In-memory fleet service for unit tests.
//!
//! Every call is recorded as a short string (`"list machine"`,
//! `"delete partition 3"`, `"deploy abc123"`) so tests can assert exactly
//! which remote operations an algorithm issued.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{
    InterfaceActions, MachineActions, ResourceApi, StorageActions, TagActions, VmHostActions,
};
use crate::error::ApiError;
use crate::model::*;
use crate::resolve::find_match;
use crate::resource::Resource;

struct Entry<R> {
    scope: String,
    item: R,
}

#[derive(Default)]
struct State {
    collections: HashMap<TypeId, Box<dyn Any + Send>>,
    calls: Vec<String>,
    failures: Vec<String>,
    scripts: HashMap<String, VecDeque<MachineStatus>>,
    last_id: i64,
}

impl State {
    fn entries<R: Fixture>(&mut self) -> &mut Vec<Entry<R>> {
        self.collections
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<Entry<R>>::new()))
            .downcast_mut::<Vec<Entry<R>>>()
            .expect("collection stored under its own type")
    }

    fn find<R: Fixture>(&mut self, scope: &str, id: &R::Id) -> Result<&mut R, ApiError> {
        self.entries::<R>()
            .iter_mut()
            .find(|e| e.scope == scope && e.item.id() == *id)
            .map(|e| &mut e.item)
            .ok_or_else(|| not_found(R::KIND, id))
    }

    fn machine(&mut self, system_id: &str) -> Result<&mut Machine, ApiError> {
        self.find::<Machine>("", &system_id.to_string())
    }

    /// Records the call, then fails it if a failure was injected for it.
    fn record(&mut self, call: String) -> Result<(), ApiError> {
        let fail = self.failures.iter().any(|f| call.starts_with(f.as_str()));
        self.calls.push(call);
        if fail {
            return Err(ApiError::Status {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

fn not_found(kind: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::Status {
        status: 404,
        body: format!("{kind} {id} does not exist"),
    }
}

/// A fleet service held in memory.
#[derive(Default)]
pub struct MemoryFleet {
    state: Mutex<State>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an unscoped object.
    pub fn insert<R: Fixture<Scope = ()>>(&self, item: R) {
        self.insert_in(&(), item);
    }

    /// Store an object within `scope`.
    pub fn insert_in<R: Fixture>(&self, scope: &R::Scope, item: R) {
        let mut state = self.state.lock().unwrap();
        let scope = R::scope_key(scope);
        state.entries::<R>().push(Entry { scope, item });
    }

    /// Every stored object of a kind, across scopes.
    pub fn items<R: Fixture>(&self) -> Vec<R> {
        let mut state = self.state.lock().unwrap();
        state.entries::<R>().iter().map(|e| e.item.clone()).collect()
    }

    /// Fail every call starting with `prefix` with a 500.
    pub fn fail_on(&self, prefix: &str) {
        self.state.lock().unwrap().failures.push(prefix.to_string());
    }

    /// Successive `get`s of the machine report these states in order; the
    /// last one sticks.
    pub fn script_status(&self, system_id: &str, states: Vec<MachineStatus>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(system_id.to_string(), states.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

/// How the in-memory service builds and mutates objects of a kind.
pub trait Fixture: Resource {
    fn scope_key(scope: &Self::Scope) -> String;

    fn build(id: i64, scope: &Self::Scope, params: &Self::Params) -> Self;

    fn apply(&mut self, update: &Self::Update);

    /// Hook for scripted machine states.
    fn set_status(&mut self, _status: MachineStatus) {}
}

#[async_trait]
impl<R: Fixture> ResourceApi<R> for MemoryFleet {
    async fn list(&self, scope: &R::Scope) -> Result<Vec<R>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("list {}", R::KIND))?;
        let key = R::scope_key(scope);
        Ok(state
            .entries::<R>()
            .iter()
            .filter(|e| e.scope == key)
            .map(|e| e.item.clone())
            .collect())
    }

    async fn get(&self, scope: &R::Scope, id: &R::Id) -> Result<R, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("get {} {}", R::KIND, id))?;
        let next = state.scripts.get_mut(&id.to_string()).and_then(|script| {
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().copied()
            }
        });
        let item = state.find::<R>(&R::scope_key(scope), id)?;
        if let Some(status) = next {
            item.set_status(status);
        }
        Ok(item.clone())
    }

    async fn create(&self, scope: &R::Scope, params: &R::Params) -> Result<R, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("create {}", R::KIND))?;
        let id = state.next_id();
        let item = R::build(id, scope, params);
        let scope = R::scope_key(scope);
        state.entries::<R>().push(Entry {
            scope,
            item: item.clone(),
        });
        Ok(item)
    }

    async fn update(
        &self,
        scope: &R::Scope,
        id: &R::Id,
        update: &R::Update,
    ) -> Result<R, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("update {} {}", R::KIND, id))?;
        let item = state.find::<R>(&R::scope_key(scope), id)?;
        item.apply(update);
        Ok(item.clone())
    }

    async fn delete(&self, scope: &R::Scope, id: &R::Id) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("delete {} {}", R::KIND, id))?;
        let key = R::scope_key(scope);
        state
            .entries::<R>()
            .retain(|e| !(e.scope == key && e.item.id() == *id));
        Ok(())
    }
}

#[async_trait]
impl MachineActions for MemoryFleet {
    async fn allocate(&self, params: &AllocateParams) -> Result<Machine, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record("allocate".to_string())?;
        let machines: Vec<Machine> = state.items_of::<Machine>();
        let candidate = match params.target() {
            Some(target) => find_match(&machines, target).map(|(m, _)| m),
            None => machines.iter().find(|m| {
                m.status() == MachineStatus::Ready
                    && params.tags.iter().all(|t| m.tag_names.contains(t))
            }),
        };
        let system_id = match candidate {
            Some(m) if m.status() == MachineStatus::Ready => m.system_id.clone(),
            _ => {
                return Err(ApiError::Status {
                    status: 409,
                    body: "No machine available matching constraints".to_string(),
                });
            }
        };
        let machine = state.machine(&system_id)?;
        machine.status_name = MachineStatus::Allocated;
        Ok(machine.clone())
    }

    async fn deploy(&self, system_id: &str, params: &DeployParams) -> Result<Machine, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("deploy {system_id}"))?;
        let machine = state.machine(system_id)?;
        machine.status_name = MachineStatus::Deploying;
        if let Some(series) = &params.distro_series {
            machine.distro_series = series.clone();
        }
        Ok(machine.clone())
    }

    async fn release(&self, system_id: &str, params: &ReleaseParams) -> Result<Machine, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("release {system_id}"))?;
        let machine = state.machine(system_id)?;
        machine.status_name = if params.erase {
            MachineStatus::DiskErasing
        } else {
            MachineStatus::Releasing
        };
        Ok(machine.clone())
    }

    async fn commission(
        &self,
        system_id: &str,
        _params: &CommissionParams,
    ) -> Result<Machine, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("commission {system_id}"))?;
        let machine = state.machine(system_id)?;
        machine.status_name = MachineStatus::Commissioning;
        Ok(machine.clone())
    }
}

#[async_trait]
impl VmHostActions for MemoryFleet {
    async fn compose(
        &self,
        vm_host_id: i64,
        params: &ComposeParams,
    ) -> Result<ComposedMachine, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("compose {vm_host_id}"))?;
        let id = state.next_id();
        let system_id = format!("m{id:04}");
        let hostname = params
            .hostname
            .clone()
            .unwrap_or_else(|| format!("composed-{id}"));
        let item = machine(&system_id, &hostname, "", MachineStatus::Commissioning);
        state.entries::<Machine>().push(Entry {
            scope: String::new(),
            item,
        });
        Ok(ComposedMachine {
            resource_uri: format!("/MAAS/api/2.0/machines/{system_id}/"),
            system_id,
        })
    }
}

#[async_trait]
impl TagActions for MemoryFleet {
    async fn update_nodes(
        &self,
        tag: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        let mut call = format!("update_nodes {tag}");
        if !add.is_empty() {
            call.push_str(&format!(" add={}", add.join(",")));
        }
        if !remove.is_empty() {
            call.push_str(&format!(" remove={}", remove.join(",")));
        }
        state.record(call)?;

        for entry in state.entries::<Machine>() {
            let m = &mut entry.item;
            if add.contains(&m.system_id) && !m.tag_names.iter().any(|t| t == tag) {
                m.tag_names.push(tag.to_string());
            }
            if remove.contains(&m.system_id) {
                m.tag_names.retain(|t| t != tag);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl InterfaceActions for MemoryFleet {
    async fn link_subnet(
        &self,
        system_id: &str,
        interface_id: i64,
        link: &LinkRequest,
    ) -> Result<NetworkInterface, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!(
            "link_subnet {interface_id} subnet={} mode={}",
            link.subnet_id, link.mode
        ))?;
        let id = state.next_id();
        let iface = state.find::<NetworkInterface>(system_id, &interface_id)?;
        iface.links.push(Link {
            id,
            mode: link.mode,
            subnet: Some(SubnetRef {
                id: link.subnet_id,
                ..Default::default()
            }),
            ip_address: link.ip_address.clone(),
        });
        Ok(iface.clone())
    }

    async fn unlink_subnet(
        &self,
        system_id: &str,
        interface_id: i64,
        link_id: i64,
    ) -> Result<NetworkInterface, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("unlink_subnet {interface_id} link={link_id}"))?;
        let iface = state.find::<NetworkInterface>(system_id, &interface_id)?;
        iface.links.retain(|l| l.id != link_id);
        Ok(iface.clone())
    }
}

#[async_trait]
impl StorageActions for MemoryFleet {
    async fn add_tag(&self, device: &BlockDeviceRef, tag: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("add_tag {} {tag}", device.block_device_id))?;
        if let Ok(d) = state.find::<BlockDevice>(&device.system_id, &device.block_device_id) {
            d.tags.push(tag.to_string());
        }
        Ok(())
    }

    async fn remove_tag(&self, device: &BlockDeviceRef, tag: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("remove_tag {} {tag}", device.block_device_id))?;
        if let Ok(d) = state.find::<BlockDevice>(&device.system_id, &device.block_device_id) {
            d.tags.retain(|t| t != tag);
        }
        Ok(())
    }

    async fn set_boot_disk(&self, device: &BlockDeviceRef) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("set_boot_disk {}", device.block_device_id))
    }

    async fn format_partition(
        &self,
        device: &BlockDeviceRef,
        partition_id: i64,
        fstype: &str,
        label: Option<&str>,
    ) -> Result<Partition, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("format_partition {partition_id} fstype={fstype}"))?;
        let partition = state.find::<Partition>(&Partition::scope_key(device), &partition_id)?;
        partition.filesystem = Some(Filesystem {
            fstype: fstype.to_string(),
            label: label.map(str::to_string),
            ..Default::default()
        });
        Ok(partition.clone())
    }

    async fn mount_partition(
        &self,
        device: &BlockDeviceRef,
        partition_id: i64,
        mount_point: &str,
        mount_options: Option<&str>,
    ) -> Result<Partition, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("mount_partition {partition_id} at={mount_point}"))?;
        let partition = state.find::<Partition>(&Partition::scope_key(device), &partition_id)?;
        let fs = partition.filesystem.get_or_insert_with(Filesystem::default);
        fs.mount_point = Some(mount_point.to_string());
        fs.mount_options = mount_options.map(str::to_string);
        Ok(partition.clone())
    }
}

impl State {
    fn items_of<R: Fixture>(&mut self) -> Vec<R> {
        self.entries::<R>().iter().map(|e| e.item.clone()).collect()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn named(name: &Option<String>) -> Option<NamedRef> {
    name.as_ref().map(|name| NamedRef {
        id: None,
        name: name.clone(),
    })
}

impl Fixture for Machine {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(id: i64, _: &(), params: &MachineParams) -> Self {
        let hostname = params
            .hostname
            .clone()
            .unwrap_or_else(|| format!("node-{id}"));
        let mut m = machine(
            &format!("m{id:04}"),
            &hostname,
            &params.pxe_mac_address,
            MachineStatus::Commissioning,
        );
        m.power_type = params.power_type.clone();
        m.architecture = params.architecture.clone().unwrap_or_default();
        m
    }

    fn apply(&mut self, update: &MachineUpdate) {
        if let Some(hostname) = &update.hostname {
            self.hostname = hostname.clone();
            self.fqdn = format!("{hostname}.maas");
        }
        if let Some(power_type) = &update.power_type {
            self.power_type = power_type.clone();
        }
        if update.zone.is_some() {
            self.zone = named(&update.zone);
        }
        if update.pool.is_some() {
            self.pool = named(&update.pool);
        }
        if update.domain.is_some() {
            self.domain = named(&update.domain);
        }
    }

    fn set_status(&mut self, status: MachineStatus) {
        self.status_name = status;
    }
}

impl Fixture for VmHost {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(id: i64, _: &(), params: &VmHostParams) -> Self {
        let mut host = VmHost {
            id,
            name: String::new(),
            host_type: params.host_type.clone(),
            zone: None,
            pool: None,
            tags: Vec::new(),
            cpu_over_commit_ratio: 1.0,
            memory_over_commit_ratio: 1.0,
            default_macvlan_mode: String::new(),
            total: Capacity::default(),
            used: Capacity::default(),
            available: Capacity::default(),
        };
        host.apply(params);
        host
    }

    fn apply(&mut self, params: &VmHostParams) {
        self.name = params.name.clone();
        self.tags = params.tags.clone();
        self.zone = named(&params.zone).or(self.zone.take());
        self.pool = named(&params.pool).or(self.pool.take());
        if let Some(ratio) = params.cpu_over_commit_ratio {
            self.cpu_over_commit_ratio = ratio;
        }
        if let Some(ratio) = params.memory_over_commit_ratio {
            self.memory_over_commit_ratio = ratio;
        }
    }
}

impl Fixture for BlockDevice {
    fn scope_key(system_id: &String) -> String {
        system_id.clone()
    }

    fn build(id: i64, system_id: &String, params: &BlockDeviceParams) -> Self {
        let mut device = block_device(id, system_id, &params.name);
        device.apply(params);
        device
    }

    fn apply(&mut self, params: &BlockDeviceParams) {
        self.name = params.name.clone();
        self.size = params.size_bytes();
        if let Some(block_size) = params.block_size {
            self.block_size = u64::from(block_size);
        }
        self.model = params.model.clone().or(self.model.take());
        self.serial = params.serial.clone().or(self.serial.take());
        self.id_path = params.id_path.clone().or(self.id_path.take());
    }
}

impl Fixture for Partition {
    fn scope_key(device: &BlockDeviceRef) -> String {
        format!("{}/{}", device.system_id, device.block_device_id)
    }

    fn build(id: i64, _: &BlockDeviceRef, params: &PartitionParams) -> Self {
        let mut p = partition(id, params.size_bytes());
        p.bootable = params.bootable;
        p
    }

    fn apply(&mut self, params: &PartitionParams) {
        self.size = params.size_bytes();
        self.bootable = params.bootable;
    }
}

impl Fixture for NetworkInterface {
    fn scope_key(system_id: &String) -> String {
        system_id.clone()
    }

    fn build(id: i64, _: &String, params: &InterfaceParams) -> Self {
        let variant = &params.variant;
        let name = params
            .name
            .clone()
            .unwrap_or_else(|| format!("{}{id}", variant.type_name()));
        let mut iface = interface(id, &name, variant.mac_address().unwrap_or_default());
        iface.interface_type = variant.type_name().to_string();
        iface.parents = variant.parents().into_iter().map(str::to_string).collect();
        iface.vlan = variant.vlan().map(|vlan| VlanRef {
            id: vlan,
            ..Default::default()
        });
        iface.apply(params);
        iface
    }

    fn apply(&mut self, params: &InterfaceParams) {
        if let Some(name) = &params.name {
            self.name = name.clone();
        }
        if let Some(mtu) = params.mtu {
            self.effective_mtu = mtu;
        }
        self.tags = params.tags.clone();
    }
}

impl Fixture for Subnet {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(id: i64, _: &(), params: &SubnetParams) -> Self {
        let mut s = subnet(id, &params.cidr, &params.cidr);
        s.apply(params);
        s
    }

    fn apply(&mut self, params: &SubnetParams) {
        self.cidr = params.cidr.clone();
        if let Some(name) = &params.name {
            self.name = name.clone();
        }
        self.gateway_ip = params.gateway_ip.clone().or(self.gateway_ip.take());
        self.dns_servers = params.dns_servers.clone();
        if let Some(managed) = params.managed {
            self.managed = managed;
        }
    }
}

impl Fixture for IpRange {
    fn scope_key(scope: &IpRangeScope) -> String {
        scope.subnet_id.to_string()
    }

    fn build(id: i64, scope: &IpRangeScope, params: &IpRangeParams) -> Self {
        let mut range = ip_range(id, scope.subnet_id, &params.start_ip, &params.end_ip);
        range.apply(params);
        range
    }

    fn apply(&mut self, params: &IpRangeParams) {
        self.range_type = params.range_type;
        self.start_ip = params.start_ip.clone();
        self.end_ip = params.end_ip.clone();
        self.comment = params.comment.clone().unwrap_or_default();
    }
}

impl Fixture for DnsResource {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(id: i64, _: &(), params: &DnsResourceParams) -> Self {
        let mut r = DnsResource {
            id,
            fqdn: String::new(),
            address_ttl: None,
            ip_addresses: Vec::new(),
        };
        r.apply(params);
        r
    }

    fn apply(&mut self, params: &DnsResourceParams) {
        self.fqdn = params.fqdn.clone();
        self.address_ttl = params.address_ttl;
        self.ip_addresses = params
            .ip_addresses
            .iter()
            .map(|ip| IpAddressRef { ip: ip.clone() })
            .collect();
    }
}

impl Fixture for DnsRecord {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(id: i64, _: &(), params: &DnsRecordParams) -> Self {
        DnsRecord {
            id,
            fqdn: params.fqdn.clone(),
            rrtype: params.rrtype.clone(),
            rrdata: params.rrdata.clone(),
            ttl: params.ttl,
        }
    }

    fn apply(&mut self, params: &DnsRecordParams) {
        self.rrtype = params.rrtype.clone();
        self.rrdata = params.rrdata.clone();
        self.ttl = params.ttl;
    }
}

impl Fixture for Tag {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(_: i64, _: &(), params: &TagParams) -> Self {
        let mut t = tag(&params.name);
        t.apply(params);
        t
    }

    fn apply(&mut self, params: &TagParams) {
        if let Some(comment) = &params.comment {
            self.comment = comment.clone();
        }
        if let Some(definition) = &params.definition {
            self.definition = definition.clone();
        }
        if let Some(kernel_opts) = &params.kernel_opts {
            self.kernel_opts = kernel_opts.clone();
        }
    }
}

impl Fixture for ResourcePool {
    fn scope_key(_: &()) -> String {
        String::new()
    }

    fn build(id: i64, _: &(), params: &ResourcePoolParams) -> Self {
        ResourcePool {
            id,
            name: params.name.clone(),
            description: params.description.clone().unwrap_or_default(),
        }
    }

    fn apply(&mut self, params: &ResourcePoolParams) {
        self.name = params.name.clone();
        if let Some(description) = &params.description {
            self.description = description.clone();
        }
    }
}

pub fn machine(system_id: &str, hostname: &str, mac: &str, status: MachineStatus) -> Machine {
    Machine {
        system_id: system_id.to_string(),
        hostname: hostname.to_string(),
        fqdn: format!("{hostname}.maas"),
        status_name: status,
        tag_names: Vec::new(),
        zone: None,
        pool: None,
        domain: None,
        boot_interface: Some(BootInterface {
            mac_address: mac.to_string(),
        }),
        power_type: "manual".to_string(),
        power_state: "off".to_string(),
        architecture: "amd64/generic".to_string(),
        cpu_count: 4,
        memory: 8192,
        ip_addresses: Vec::new(),
        osystem: String::new(),
        distro_series: String::new(),
    }
}

pub fn subnet(id: i64, cidr: &str, name: &str) -> Subnet {
    Subnet {
        id,
        name: name.to_string(),
        cidr: cidr.to_string(),
        vlan: None,
        gateway_ip: None,
        dns_servers: Vec::new(),
        rdns_mode: 2,
        allow_dns: true,
        allow_proxy: true,
        managed: true,
        active_discovery: false,
        space: None,
    }
}

pub fn ip_range(id: i64, subnet_id: i64, start_ip: &str, end_ip: &str) -> IpRange {
    IpRange {
        id,
        range_type: IpRangeType::Reserved,
        start_ip: start_ip.to_string(),
        end_ip: end_ip.to_string(),
        comment: String::new(),
        subnet: Some(SubnetRef {
            id: subnet_id,
            ..Default::default()
        }),
    }
}

pub fn block_device(id: i64, system_id: &str, name: &str) -> BlockDevice {
    BlockDevice {
        id,
        system_id: system_id.to_string(),
        name: name.to_string(),
        device_type: "physical".to_string(),
        path: format!("/dev/disk/by-dname/{name}"),
        id_path: None,
        model: None,
        serial: None,
        size: 0,
        block_size: 512,
        tags: Vec::new(),
        partitions: Vec::new(),
        filesystem: None,
    }
}

pub fn partition(id: i64, size: u64) -> Partition {
    Partition {
        id,
        uuid: None,
        path: format!("/dev/disk/by-dname/part{id}"),
        size,
        bootable: false,
        filesystem: None,
    }
}

pub fn interface(id: i64, name: &str, mac: &str) -> NetworkInterface {
    NetworkInterface {
        id,
        name: name.to_string(),
        interface_type: "physical".to_string(),
        mac_address: mac.to_string(),
        vlan: None,
        effective_mtu: 1500,
        tags: Vec::new(),
        links: Vec::new(),
        parents: Vec::new(),
        enabled: true,
    }
}

pub fn tag(name: &str) -> Tag {
    Tag {
        name: name.to_string(),
        comment: String::new(),
        definition: String::new(),
        kernel_opts: String::new(),
    }
}
