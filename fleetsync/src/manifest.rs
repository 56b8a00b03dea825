//! Declarative fleet manifest.
//!
//! A manifest is a JSON document listing the declared objects of each kind.
//! [`Manifest::validate`] rejects malformed declarations before any remote
//! call; [`Manifest::apply`] and [`Manifest::destroy`] walk the kinds in
//! dependency order.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use fleetsync_core::model::{
    BlockDevice, BlockDeviceParams, ComposeParams, DnsRecord, DnsRecordParams, DnsResource,
    DnsResourceParams, InstanceParams, InterfaceParams, InterfaceVariant, LinkMode, Machine,
    MachineParams, MachineUpdate, NetworkInterface, ResourcePool, ResourcePoolParams, Subnet,
    SubnetParams, Tag, TagParams, VmHost, VmHostParams,
};
use fleetsync_core::{Fleet, FleetApi, FleetError, Resource};
use ipnet::IpNet;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// DNS record types accepted by the service.
pub const RECORD_TYPES: [&str; 9] = ["A", "AAAA", "CNAME", "MX", "NS", "PTR", "SRV", "SSHFP", "TXT"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind} {identifier:?}: {reason}")]
    Invalid {
        kind: &'static str,
        identifier: String,
        reason: String,
    },

    #[error("{kind} {identifier:?}: {source}")]
    Apply {
        kind: &'static str,
        identifier: String,
        #[source]
        source: FleetError,
    },
}

/// A machine composed on a VM host.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposedMachineDecl {
    /// Name or ID of the VM host.
    pub vm_host: String,
    #[serde(flatten)]
    pub compose: ComposeParams,
    /// Applied once the composed machine is ready.
    #[serde(default)]
    pub update: MachineUpdate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDeviceDecl {
    /// Identifier of the owning machine.
    pub machine: String,
    #[serde(flatten)]
    pub device: BlockDeviceParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceDecl {
    /// Identifier of the owning machine.
    pub machine: String,
    #[serde(flatten)]
    pub interface: InterfaceParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub resource_pools: Vec<ResourcePoolParams>,
    pub tags: Vec<TagParams>,
    pub subnets: Vec<SubnetParams>,
    pub vm_hosts: Vec<VmHostParams>,
    pub machines: Vec<MachineParams>,
    pub composed_machines: Vec<ComposedMachineDecl>,
    pub instances: Vec<InstanceParams>,
    pub block_devices: Vec<BlockDeviceDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub dns_resources: Vec<DnsResourceParams>,
    pub dns_records: Vec<DnsRecordParams>,
}

fn invalid(kind: &'static str, identifier: &str, reason: impl Into<String>) -> ManifestError {
    ManifestError::Invalid {
        kind,
        identifier: identifier.to_string(),
        reason: reason.into(),
    }
}

fn failed(kind: &'static str, identifier: &str) -> impl FnOnce(FleetError) -> ManifestError {
    let identifier = identifier.to_string();
    move |source| ManifestError::Apply {
        kind,
        identifier,
        source,
    }
}

fn require(kind: &'static str, identifier: &str, field: &str, value: &str) -> Result<(), ManifestError> {
    if value.trim().is_empty() {
        return Err(invalid(kind, identifier, format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_ip(
    kind: &'static str,
    identifier: &str,
    field: &str,
    value: &str,
) -> Result<IpAddr, ManifestError> {
    value
        .parse()
        .map_err(|_| invalid(kind, identifier, format!("{field} {value:?} is not an IP address")))
}

/// Six hex octets separated by `:` or `-`.
pub fn is_mac_address(value: &str) -> bool {
    let octets: Vec<&str> = value.split([':', '-']).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|octet| octet.len() == 2 && octet.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_tag_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_subnet(subnet: &SubnetParams) -> Result<(), ManifestError> {
    let kind = Subnet::KIND;
    let id = subnet.cidr.as_str();
    let net: IpNet = subnet
        .cidr
        .parse()
        .map_err(|_| invalid(kind, id, "cidr is not a network in CIDR notation"))?;

    if let Some(gateway) = &subnet.gateway_ip {
        let gateway = parse_ip(kind, id, "gateway_ip", gateway)?;
        if !net.contains(&gateway) {
            return Err(invalid(kind, id, format!("gateway {gateway} is outside {net}")));
        }
    }
    for server in &subnet.dns_servers {
        parse_ip(kind, id, "dns_servers", server)?;
    }

    let mut bounds = Vec::with_capacity(subnet.ip_ranges.len());
    for range in &subnet.ip_ranges {
        let start = parse_ip(kind, id, "start_ip", &range.start_ip)?;
        let end = parse_ip(kind, id, "end_ip", &range.end_ip)?;
        if !net.contains(&start) || !net.contains(&end) {
            return Err(invalid(kind, id, format!("ip range {start}-{end} is outside {net}")));
        }
        if start > end {
            return Err(invalid(kind, id, format!("ip range {start}-{end} ends before it starts")));
        }
        bounds.push((start, end));
    }
    bounds.sort();
    for pair in bounds.windows(2) {
        let ((start_a, end_a), (start_b, end_b)) = (pair[0], pair[1]);
        if start_b <= end_a {
            return Err(invalid(
                kind,
                id,
                format!("ip ranges {start_a}-{end_a} and {start_b}-{end_b} overlap"),
            ));
        }
    }
    Ok(())
}

fn validate_block_device(decl: &BlockDeviceDecl) -> Result<(), ManifestError> {
    let kind = BlockDevice::KIND;
    let device = &decl.device;
    let id = device.name.as_str();
    require(kind, id, "machine", &decl.machine)?;
    require(kind, id, "name", &device.name)?;
    if device.size_gigabytes == 0 {
        return Err(invalid(kind, id, "size_gigabytes must be positive"));
    }

    let mut total = 0;
    for (index, partition) in device.partitions.iter().enumerate() {
        if partition.size_gigabytes == 0 {
            return Err(invalid(kind, id, format!("partition {index} has no size")));
        }
        if partition.mount_point.is_some() && partition.fs_type.is_none() {
            return Err(invalid(
                kind,
                id,
                format!("partition {index} has a mount point but no fs_type"),
            ));
        }
        total += partition.size_gigabytes;
    }
    if total > device.size_gigabytes {
        return Err(invalid(
            kind,
            id,
            format!(
                "partitions need {total} GB but the device has {} GB",
                device.size_gigabytes
            ),
        ));
    }
    Ok(())
}

fn validate_interface(decl: &InterfaceDecl) -> Result<(), ManifestError> {
    let kind = NetworkInterface::KIND;
    let iface = &decl.interface;
    let Some(id) = NetworkInterface::declared_identifier(iface) else {
        return Err(invalid(kind, &decl.machine, "interface needs a name or MAC address"));
    };
    require(kind, id, "machine", &decl.machine)?;

    if let Some(mac) = iface.variant.mac_address() {
        if !is_mac_address(mac) {
            return Err(invalid(kind, id, format!("{mac:?} is not a MAC address")));
        }
    }
    if let InterfaceVariant::Bond { parents, .. } = &iface.variant {
        if parents.is_empty() {
            return Err(invalid(kind, id, "a bond needs at least one parent"));
        }
    }

    for link in &iface.links {
        require(kind, id, "link subnet", &link.subnet)?;
        match (&link.mode, &link.ip_address) {
            (LinkMode::Static, Some(ip)) => {
                parse_ip(kind, id, "ip_address", ip)?;
            }
            (LinkMode::Static, None) => {
                return Err(invalid(kind, id, "static links need an ip_address"));
            }
            (mode, Some(_)) => {
                return Err(invalid(
                    kind,
                    id,
                    format!("ip_address only applies to STATIC links, not {mode}"),
                ));
            }
            (_, None) => {}
        }
    }
    Ok(())
}

impl Manifest {
    /// Read and parse a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of declared objects.
    pub fn len(&self) -> usize {
        self.resource_pools.len()
            + self.tags.len()
            + self.subnets.len()
            + self.vm_hosts.len()
            + self.machines.len()
            + self.composed_machines.len()
            + self.instances.len()
            + self.block_devices.len()
            + self.interfaces.len()
            + self.dns_resources.len()
            + self.dns_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every declaration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ManifestError> {
        for pool in &self.resource_pools {
            require(ResourcePool::KIND, &pool.name, "name", &pool.name)?;
        }

        for tag in &self.tags {
            if !is_tag_name(&tag.name) {
                return Err(invalid(
                    Tag::KIND,
                    &tag.name,
                    "names may only contain letters, digits, '-' and '_'",
                ));
            }
            for member in tag.machines.iter().flatten() {
                require(Tag::KIND, &tag.name, "machines", member)?;
            }
        }

        for subnet in &self.subnets {
            validate_subnet(subnet)?;
        }

        for host in &self.vm_hosts {
            require(VmHost::KIND, &host.name, "name", &host.name)?;
            require(VmHost::KIND, &host.name, "type", &host.host_type)?;
            require(VmHost::KIND, &host.name, "power_address", &host.power_address)?;
        }

        for machine in &self.machines {
            let id = machine.pxe_mac_address.as_str();
            require(Machine::KIND, id, "power_type", &machine.power_type)?;
            if !is_mac_address(id) {
                return Err(invalid(Machine::KIND, id, "pxe_mac_address is not a MAC address"));
            }
        }

        for composed in &self.composed_machines {
            let id = composed.compose.hostname.as_deref().unwrap_or_default();
            require("composed machine", id, "vm_host", &composed.vm_host)?;
        }

        for decl in &self.block_devices {
            validate_block_device(decl)?;
        }

        for decl in &self.interfaces {
            validate_interface(decl)?;
        }

        for resource in &self.dns_resources {
            require(DnsResource::KIND, &resource.fqdn, "fqdn", &resource.fqdn)?;
            if resource.ip_addresses.is_empty() {
                return Err(invalid(DnsResource::KIND, &resource.fqdn, "no ip_addresses"));
            }
            for ip in &resource.ip_addresses {
                parse_ip(DnsResource::KIND, &resource.fqdn, "ip_addresses", ip)?;
            }
        }

        let mut record_keys = HashSet::new();
        for record in &self.dns_records {
            require(DnsRecord::KIND, &record.fqdn, "fqdn", &record.fqdn)?;
            require(DnsRecord::KIND, &record.fqdn, "rrdata", &record.rrdata)?;
            if !RECORD_TYPES
                .iter()
                .any(|known| known.eq_ignore_ascii_case(&record.rrtype))
            {
                return Err(invalid(
                    DnsRecord::KIND,
                    &record.fqdn,
                    format!("unknown record type {}", record.rrtype),
                ));
            }
            // a name holds one record per type
            let rrtype = record.rrtype.to_ascii_uppercase();
            if !record_keys.insert((record.fqdn.to_ascii_lowercase(), rrtype.clone())) {
                return Err(invalid(
                    DnsRecord::KIND,
                    &record.fqdn,
                    format!("{rrtype} record declared twice"),
                ));
            }
        }

        Ok(())
    }

    /// Converge the fleet to the manifest. Returns the number of objects
    /// applied.
    ///
    /// Tags are created with the other records but their membership is
    /// converged once every machine exists.
    pub async fn apply<A: FleetApi>(&self, fleet: &Fleet<A>) -> Result<usize, ManifestError> {
        for pool in &self.resource_pools {
            let applied = fleet
                .apply_resource_pool(pool)
                .await
                .map_err(failed(ResourcePool::KIND, &pool.name))?;
            info!(id = applied.id, name = %applied.name, "Applied resource pool");
        }

        for tag in &self.tags {
            let record = TagParams {
                machines: None,
                ..tag.clone()
            };
            fleet
                .apply_tag(&record)
                .await
                .map_err(failed(Tag::KIND, &tag.name))?;
            info!(name = %tag.name, "Applied tag");
        }

        for subnet in &self.subnets {
            let applied = fleet
                .apply_subnet(subnet)
                .await
                .map_err(failed(Subnet::KIND, &subnet.cidr))?;
            info!(id = applied.id, cidr = %applied.cidr, ranges = subnet.ip_ranges.len(), "Applied subnet");
        }

        for host in &self.vm_hosts {
            let applied = fleet
                .apply_vm_host(host)
                .await
                .map_err(failed(VmHost::KIND, &host.name))?;
            info!(id = applied.id, name = %applied.name, "Applied VM host");
        }

        for machine in &self.machines {
            let applied = fleet
                .create_machine(machine)
                .await
                .map_err(failed(Machine::KIND, &machine.pxe_mac_address))?;
            info!(system_id = %applied.system_id, status = %applied.status(), "Applied machine");
        }

        for composed in &self.composed_machines {
            let id = composed.compose.hostname.as_deref().unwrap_or(&composed.vm_host);
            let applied = fleet
                .compose_machine(&composed.vm_host, &composed.compose, &composed.update)
                .await
                .map_err(failed("composed machine", id))?;
            info!(system_id = %applied.system_id, vm_host = %composed.vm_host, "Applied composed machine");
        }

        for instance in &self.instances {
            let id = instance.allocate.target().unwrap_or("any");
            let applied = fleet
                .create_instance(instance)
                .await
                .map_err(failed("instance", id))?;
            info!(system_id = %applied.system_id, hostname = %applied.hostname, "Deployed instance");
        }

        for tag in self.tags.iter().filter(|tag| tag.machines.is_some()) {
            fleet
                .apply_tag(tag)
                .await
                .map_err(failed(Tag::KIND, &tag.name))?;
            info!(name = %tag.name, "Converged tag membership");
        }

        for decl in &self.block_devices {
            let applied = fleet
                .apply_block_device(&decl.machine, &decl.device)
                .await
                .map_err(failed(BlockDevice::KIND, &decl.device.name))?;
            info!(machine = %decl.machine, id = applied.id, name = %applied.name, "Applied block device");
        }

        for decl in &self.interfaces {
            let id = NetworkInterface::declared_identifier(&decl.interface).unwrap_or_default();
            let applied = fleet
                .apply_interface(&decl.machine, &decl.interface)
                .await
                .map_err(failed(NetworkInterface::KIND, id))?;
            info!(machine = %decl.machine, id = applied.id, name = %applied.name, "Applied interface");
        }

        for resource in &self.dns_resources {
            fleet
                .apply_dns_resource(resource)
                .await
                .map_err(failed(DnsResource::KIND, &resource.fqdn))?;
            info!(fqdn = %resource.fqdn, "Applied DNS resource");
        }

        for record in &self.dns_records {
            fleet
                .apply_dns_record(record)
                .await
                .map_err(failed(DnsRecord::KIND, &record.fqdn))?;
            info!(fqdn = %record.fqdn, rrtype = %record.rrtype, "Applied DNS record");
        }

        Ok(self.len())
    }

    /// Remove everything the manifest declares, in reverse dependency
    /// order. Instances are released rather than deleted and physical
    /// interfaces are left in place. Objects already gone are skipped.
    ///
    /// Returns the number of declarations processed.
    pub async fn destroy<A: FleetApi>(&self, fleet: &Fleet<A>) -> Result<usize, ManifestError> {
        let mut processed = 0;

        for record in self.dns_records.iter().rev() {
            fleet
                .delete_declared::<DnsRecord>(&(), record)
                .await
                .map_err(failed(DnsRecord::KIND, &record.fqdn))?;
            processed += 1;
        }

        for resource in self.dns_resources.iter().rev() {
            fleet
                .delete::<DnsResource>(&(), &resource.fqdn)
                .await
                .map_err(failed(DnsResource::KIND, &resource.fqdn))?;
            processed += 1;
        }

        for decl in self.interfaces.iter().rev() {
            let Some(id) = NetworkInterface::declared_identifier(&decl.interface) else {
                warn!(machine = %decl.machine, "Skipping interface without identifier");
                continue;
            };
            if matches!(decl.interface.variant, InterfaceVariant::Physical { .. }) {
                debug!(machine = %decl.machine, interface = id, "Leaving physical interface");
                continue;
            }
            let Some(system_id) = machine_scope(fleet, &decl.machine)
                .await
                .map_err(failed(NetworkInterface::KIND, id))?
            else {
                continue;
            };
            fleet
                .delete::<NetworkInterface>(&system_id, id)
                .await
                .map_err(failed(NetworkInterface::KIND, id))?;
            processed += 1;
        }

        for decl in self.block_devices.iter().rev() {
            let id = decl.device.name.as_str();
            let Some(system_id) = machine_scope(fleet, &decl.machine)
                .await
                .map_err(failed(BlockDevice::KIND, id))?
            else {
                continue;
            };
            fleet
                .delete::<BlockDevice>(&system_id, id)
                .await
                .map_err(failed(BlockDevice::KIND, id))?;
            processed += 1;
        }

        for instance in self.instances.iter().rev() {
            let Some(target) = instance.allocate.target() else {
                warn!("Skipping instance without system_id or hostname");
                continue;
            };
            fleet
                .delete_instance(target, &instance.release)
                .await
                .map_err(failed("instance", target))?;
            info!(machine = target, "Released instance");
            processed += 1;
        }

        for composed in self.composed_machines.iter().rev() {
            let Some(hostname) = composed.compose.hostname.as_deref() else {
                warn!(vm_host = %composed.vm_host, "Skipping composed machine without hostname");
                continue;
            };
            fleet
                .delete::<Machine>(&(), hostname)
                .await
                .map_err(failed("composed machine", hostname))?;
            processed += 1;
        }

        for machine in self.machines.iter().rev() {
            let id = machine.pxe_mac_address.as_str();
            fleet
                .delete::<Machine>(&(), id)
                .await
                .map_err(failed(Machine::KIND, id))?;
            processed += 1;
        }

        for host in self.vm_hosts.iter().rev() {
            fleet
                .delete::<VmHost>(&(), &host.name)
                .await
                .map_err(failed(VmHost::KIND, &host.name))?;
            processed += 1;
        }

        for subnet in self.subnets.iter().rev() {
            fleet
                .delete::<Subnet>(&(), &subnet.cidr)
                .await
                .map_err(failed(Subnet::KIND, &subnet.cidr))?;
            processed += 1;
        }

        for tag in self.tags.iter().rev() {
            fleet
                .delete::<Tag>(&(), &tag.name)
                .await
                .map_err(failed(Tag::KIND, &tag.name))?;
            processed += 1;
        }

        for pool in self.resource_pools.iter().rev() {
            fleet
                .delete::<ResourcePool>(&(), &pool.name)
                .await
                .map_err(failed(ResourcePool::KIND, &pool.name))?;
            processed += 1;
        }

        info!(processed, "Destroyed manifest resources");
        Ok(processed)
    }
}

/// System ID of the owning machine, or `None` when it no longer exists.
async fn machine_scope<A: FleetApi>(
    fleet: &Fleet<A>,
    machine: &str,
) -> Result<Option<String>, FleetError> {
    match fleet.resolve::<Machine>(&(), machine).await {
        Ok(machine) => Ok(Some(machine.system_id)),
        Err(e) if e.is_not_found() => {
            debug!(machine, "Owning machine already gone");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
