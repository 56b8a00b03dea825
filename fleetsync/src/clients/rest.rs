//! Mapping of fleet resource kinds onto MAAS REST paths and forms.
//!
//! Every kind implements [`RestResource`]; the blanket
//! [`ResourceApi`] impl below turns that into CRUD calls. Lifecycle and
//! relationship actions are `POST <path>?op=<name>` requests.

use async_trait::async_trait;
use fleetsync_core::api::{
    InterfaceActions, MachineActions, ResourceApi, StorageActions, TagActions, VmHostActions,
};
use fleetsync_core::model::{
    AllocateParams, BlockDevice, BlockDeviceParams, BlockDeviceRef, CommissionParams,
    ComposeParams, ComposedMachine, DeployParams, DnsRecord, DnsRecordParams, DnsResource,
    DnsResourceParams, InterfaceParams, InterfaceVariant, IpRange, IpRangeParams, IpRangeScope,
    LinkRequest, Machine, MachineParams, MachineUpdate, NetworkInterface, Partition,
    PartitionParams, ReleaseParams, ResourcePool, ResourcePoolParams, Subnet, SubnetParams, Tag,
    TagParams, VmHost, VmHostParams,
};
use fleetsync_core::{ApiError, Resource};
use serde::de::DeserializeOwned;

use super::maas::{Form, MaasClient};

/// A resource kind addressable over the MAAS REST API.
pub trait RestResource: Resource + DeserializeOwned {
    fn collection_path(scope: &Self::Scope) -> String;

    fn item_path(scope: &Self::Scope, id: &Self::Id) -> String;

    /// Operation to invoke on the collection when creating.
    fn create_op(_params: &Self::Params) -> Option<&'static str> {
        None
    }

    fn create_form(scope: &Self::Scope, params: &Self::Params) -> Form;

    fn update_form(update: &Self::Update) -> Form;

    /// Collections the service cannot filter are narrowed client side.
    fn in_scope(&self, _scope: &Self::Scope) -> bool {
        true
    }
}

#[async_trait]
impl<R: RestResource> ResourceApi<R> for MaasClient {
    async fn list(&self, scope: &R::Scope) -> Result<Vec<R>, ApiError> {
        let items: Vec<R> = self.get_json(&R::collection_path(scope)).await?;
        Ok(items.into_iter().filter(|item| item.in_scope(scope)).collect())
    }

    async fn get(&self, scope: &R::Scope, id: &R::Id) -> Result<R, ApiError> {
        self.get_json(&R::item_path(scope, id)).await
    }

    async fn create(&self, scope: &R::Scope, params: &R::Params) -> Result<R, ApiError> {
        let form = R::create_form(scope, params);
        self.post_form(&R::collection_path(scope), R::create_op(params), &form)
            .await
    }

    async fn update(&self, scope: &R::Scope, id: &R::Id, update: &R::Update) -> Result<R, ApiError> {
        self.put_form(&R::item_path(scope, id), &R::update_form(update))
            .await
    }

    async fn delete(&self, scope: &R::Scope, id: &R::Id) -> Result<(), ApiError> {
        self.delete_path(&R::item_path(scope, id)).await
    }
}

fn machine_path(system_id: &str) -> String {
    format!("machines/{system_id}/")
}

fn block_device_path(device: &BlockDeviceRef) -> String {
    format!(
        "nodes/{}/blockdevices/{}/",
        device.system_id, device.block_device_id
    )
}

fn partition_path(device: &BlockDeviceRef, partition_id: i64) -> String {
    format!(
        "nodes/{}/blockdevices/{}/partition/{}/",
        device.system_id, device.block_device_id, partition_id
    )
}

fn interface_path(system_id: &str, interface_id: i64) -> String {
    format!("nodes/{system_id}/interfaces/{interface_id}/")
}

fn machine_update_form(update: &MachineUpdate) -> Form {
    let mut form = Form::new()
        .opt("hostname", update.hostname.as_deref())
        .opt("domain", update.domain.as_deref())
        .opt("zone", update.zone.as_deref())
        .opt("pool", update.pool.as_deref())
        .opt("architecture", update.architecture.as_deref())
        .opt("min_hwe_kernel", update.min_hwe_kernel.as_deref())
        .opt("power_type", update.power_type.as_deref());
    if let Some(power_parameters) = &update.power_parameters {
        for (key, value) in power_parameters {
            form = form.set(format!("power_parameters_{key}"), value);
        }
    }
    form
}

impl RestResource for Machine {
    fn collection_path(_scope: &()) -> String {
        "machines/".to_string()
    }

    fn item_path(_scope: &(), id: &String) -> String {
        machine_path(id)
    }

    fn create_form(_scope: &(), params: &MachineParams) -> Form {
        machine_update_form(&MachineUpdate::from(params)).set("mac_addresses", &params.pxe_mac_address)
    }

    fn update_form(update: &MachineUpdate) -> Form {
        machine_update_form(update)
    }
}

fn vm_host_form(params: &VmHostParams) -> Form {
    Form::new()
        .set("name", &params.name)
        .set("power_address", &params.power_address)
        .opt("power_user", params.power_user.as_deref())
        .opt("power_pass", params.power_pass.as_deref())
        .opt("zone", params.zone.as_deref())
        .opt("pool", params.pool.as_deref())
        .joined("tags", &params.tags, ",")
        .opt("cpu_over_commit_ratio", params.cpu_over_commit_ratio)
        .opt("memory_over_commit_ratio", params.memory_over_commit_ratio)
        .opt("default_macvlan_mode", params.default_macvlan_mode.as_deref())
}

impl RestResource for VmHost {
    fn collection_path(_scope: &()) -> String {
        "pods/".to_string()
    }

    fn item_path(_scope: &(), id: &i64) -> String {
        format!("pods/{id}/")
    }

    fn create_form(_scope: &(), params: &VmHostParams) -> Form {
        vm_host_form(params).set("type", &params.host_type)
    }

    // The host type cannot change after registration.
    fn update_form(update: &VmHostParams) -> Form {
        vm_host_form(update)
    }
}

fn block_device_form(params: &BlockDeviceParams) -> Form {
    Form::new()
        .set("name", &params.name)
        .set("size", params.size_bytes())
        .opt("block_size", params.block_size)
        .opt("model", params.model.as_deref())
        .opt("serial", params.serial.as_deref())
        .opt("id_path", params.id_path.as_deref())
}

impl RestResource for BlockDevice {
    fn collection_path(system_id: &String) -> String {
        format!("nodes/{system_id}/blockdevices/")
    }

    fn item_path(system_id: &String, id: &i64) -> String {
        format!("nodes/{system_id}/blockdevices/{id}/")
    }

    fn create_form(_scope: &String, params: &BlockDeviceParams) -> Form {
        block_device_form(params)
    }

    fn update_form(update: &BlockDeviceParams) -> Form {
        block_device_form(update)
    }
}

fn partition_form(params: &PartitionParams) -> Form {
    Form::new()
        .set("size", params.size_bytes())
        .opt("bootable", params.bootable.then_some(true))
}

impl RestResource for Partition {
    fn collection_path(device: &BlockDeviceRef) -> String {
        format!("{}partitions/", block_device_path(device))
    }

    fn item_path(device: &BlockDeviceRef, id: &i64) -> String {
        partition_path(device, *id)
    }

    fn create_form(_scope: &BlockDeviceRef, params: &PartitionParams) -> Form {
        partition_form(params)
    }

    fn update_form(update: &PartitionParams) -> Form {
        partition_form(update)
    }
}

fn interface_form(params: &InterfaceParams) -> Form {
    let form = Form::new()
        .opt("name", params.name.as_deref())
        .opt("mtu", params.mtu)
        .joined("tags", &params.tags, ",");

    match &params.variant {
        InterfaceVariant::Physical { mac_address, vlan } => {
            form.set("mac_address", mac_address).opt("vlan", *vlan)
        }
        InterfaceVariant::Bond {
            parents,
            mac_address,
            bond_mode,
            vlan,
        } => form
            .repeat("parents", parents)
            .opt("mac_address", mac_address.as_deref())
            .opt("bond_mode", bond_mode.as_deref())
            .opt("vlan", *vlan),
        InterfaceVariant::Bridge {
            parent,
            mac_address,
            bridge_stp,
            vlan,
        } => form
            .set("parents", parent)
            .opt("mac_address", mac_address.as_deref())
            .opt("bridge_stp", *bridge_stp)
            .opt("vlan", *vlan),
        InterfaceVariant::Vlan { parent, vlan } => form.set("parents", parent).set("vlan", vlan),
    }
}

impl RestResource for NetworkInterface {
    fn collection_path(system_id: &String) -> String {
        format!("nodes/{system_id}/interfaces/")
    }

    fn item_path(system_id: &String, id: &i64) -> String {
        interface_path(system_id, *id)
    }

    fn create_op(params: &InterfaceParams) -> Option<&'static str> {
        Some(match params.variant {
            InterfaceVariant::Physical { .. } => "create_physical",
            InterfaceVariant::Bond { .. } => "create_bond",
            InterfaceVariant::Bridge { .. } => "create_bridge",
            InterfaceVariant::Vlan { .. } => "create_vlan",
        })
    }

    fn create_form(_scope: &String, params: &InterfaceParams) -> Form {
        interface_form(params)
    }

    fn update_form(update: &InterfaceParams) -> Form {
        interface_form(update)
    }
}

fn subnet_form(params: &SubnetParams) -> Form {
    Form::new()
        .set("cidr", &params.cidr)
        .opt("name", params.name.as_deref())
        .opt("fabric", params.fabric.as_deref())
        .opt("vid", params.vid)
        .opt("gateway_ip", params.gateway_ip.as_deref())
        .joined("dns_servers", &params.dns_servers, " ")
        .opt("rdns_mode", params.rdns_mode)
        .opt("allow_dns", params.allow_dns)
        .opt("allow_proxy", params.allow_proxy)
        .opt("managed", params.managed)
        .opt("active_discovery", params.active_discovery)
}

impl RestResource for Subnet {
    fn collection_path(_scope: &()) -> String {
        "subnets/".to_string()
    }

    fn item_path(_scope: &(), id: &i64) -> String {
        format!("subnets/{id}/")
    }

    fn create_form(_scope: &(), params: &SubnetParams) -> Form {
        subnet_form(params)
    }

    fn update_form(update: &SubnetParams) -> Form {
        subnet_form(update)
    }
}

fn ip_range_form(params: &IpRangeParams) -> Form {
    Form::new()
        .set("type", params.range_type.as_str())
        .set("start_ip", &params.start_ip)
        .set("end_ip", &params.end_ip)
        .opt("comment", params.comment.as_deref())
}

impl RestResource for IpRange {
    fn collection_path(_scope: &IpRangeScope) -> String {
        "ipranges/".to_string()
    }

    fn item_path(_scope: &IpRangeScope, id: &i64) -> String {
        format!("ipranges/{id}/")
    }

    fn create_form(scope: &IpRangeScope, params: &IpRangeParams) -> Form {
        ip_range_form(params).set("subnet", scope.subnet_id)
    }

    fn update_form(update: &IpRangeParams) -> Form {
        ip_range_form(update)
    }

    // The service lists every range regardless of subnet.
    fn in_scope(&self, scope: &IpRangeScope) -> bool {
        self.subnet
            .as_ref()
            .is_some_and(|subnet| subnet.id == scope.subnet_id)
    }
}

fn dns_resource_form(params: &DnsResourceParams) -> Form {
    Form::new()
        .set("fqdn", &params.fqdn)
        .joined("ip_addresses", &params.ip_addresses, " ")
        .opt("address_ttl", params.address_ttl)
}

impl RestResource for DnsResource {
    fn collection_path(_scope: &()) -> String {
        "dnsresources/".to_string()
    }

    fn item_path(_scope: &(), id: &i64) -> String {
        format!("dnsresources/{id}/")
    }

    fn create_form(_scope: &(), params: &DnsResourceParams) -> Form {
        dns_resource_form(params)
    }

    fn update_form(update: &DnsResourceParams) -> Form {
        dns_resource_form(update)
    }
}

fn dns_record_form(params: &DnsRecordParams) -> Form {
    Form::new()
        .set("fqdn", &params.fqdn)
        .set("rrtype", &params.rrtype)
        .set("rrdata", &params.rrdata)
        .opt("ttl", params.ttl)
}

impl RestResource for DnsRecord {
    fn collection_path(_scope: &()) -> String {
        "dnsresourcerecords/".to_string()
    }

    fn item_path(_scope: &(), id: &i64) -> String {
        format!("dnsresourcerecords/{id}/")
    }

    fn create_form(_scope: &(), params: &DnsRecordParams) -> Form {
        dns_record_form(params)
    }

    fn update_form(update: &DnsRecordParams) -> Form {
        dns_record_form(update)
    }
}

fn tag_form(params: &TagParams) -> Form {
    Form::new()
        .set("name", &params.name)
        .opt("comment", params.comment.as_deref())
        .opt("definition", params.definition.as_deref())
        .opt("kernel_opts", params.kernel_opts.as_deref())
}

impl RestResource for Tag {
    fn collection_path(_scope: &()) -> String {
        "tags/".to_string()
    }

    fn item_path(_scope: &(), name: &String) -> String {
        format!("tags/{name}/")
    }

    fn create_form(_scope: &(), params: &TagParams) -> Form {
        tag_form(params)
    }

    fn update_form(update: &TagParams) -> Form {
        tag_form(update)
    }
}

fn resource_pool_form(params: &ResourcePoolParams) -> Form {
    Form::new()
        .set("name", &params.name)
        .opt("description", params.description.as_deref())
}

impl RestResource for ResourcePool {
    fn collection_path(_scope: &()) -> String {
        "resourcepools/".to_string()
    }

    fn item_path(_scope: &(), id: &i64) -> String {
        format!("resourcepool/{id}/")
    }

    fn create_form(_scope: &(), params: &ResourcePoolParams) -> Form {
        resource_pool_form(params)
    }

    fn update_form(update: &ResourcePoolParams) -> Form {
        resource_pool_form(update)
    }
}

#[async_trait]
impl MachineActions for MaasClient {
    async fn allocate(&self, params: &AllocateParams) -> Result<Machine, ApiError> {
        let form = Form::new()
            .opt("system_id", params.system_id.as_deref())
            .opt("name", params.hostname.as_deref())
            .opt("cpu_count", params.min_cpu_count)
            .opt("mem", params.min_memory)
            .joined("tags", &params.tags, ",")
            .repeat("not_tags", &params.not_tags)
            .opt("zone", params.zone.as_deref())
            .opt("pool", params.pool.as_deref())
            .opt("arch", params.arch.as_deref());
        self.post_form("machines/", Some("allocate"), &form).await
    }

    async fn deploy(&self, system_id: &str, params: &DeployParams) -> Result<Machine, ApiError> {
        // user_data is passed through as given; the service expects base64.
        let form = Form::new()
            .opt("distro_series", params.distro_series.as_deref())
            .opt("hwe_kernel", params.hwe_kernel.as_deref())
            .opt("user_data", params.user_data.as_deref())
            .opt("register_vmhost", params.register_vmhost.then_some(true))
            .opt("enable_hw_sync", params.enable_hw_sync.then_some(true));
        self.post_form(&machine_path(system_id), Some("deploy"), &form)
            .await
    }

    async fn release(&self, system_id: &str, params: &ReleaseParams) -> Result<Machine, ApiError> {
        let form = Form::new()
            .opt("erase", params.erase.then_some(true))
            .opt("secure_erase", params.secure_erase.then_some(true))
            .opt("quick_erase", params.quick_erase.then_some(true))
            .opt("comment", params.comment.as_deref());
        self.post_form(&machine_path(system_id), Some("release"), &form)
            .await
    }

    async fn commission(
        &self,
        system_id: &str,
        params: &CommissionParams,
    ) -> Result<Machine, ApiError> {
        let form = Form::new()
            .set("enable_ssh", u8::from(params.enable_ssh))
            .set("skip_networking", u8::from(params.skip_networking))
            .set("skip_storage", u8::from(params.skip_storage))
            .joined("commissioning_scripts", &params.commissioning_scripts, ",")
            .joined("testing_scripts", &params.testing_scripts, ",");
        self.post_form(&machine_path(system_id), Some("commission"), &form)
            .await
    }
}

#[async_trait]
impl VmHostActions for MaasClient {
    async fn compose(
        &self,
        vm_host_id: i64,
        params: &ComposeParams,
    ) -> Result<ComposedMachine, ApiError> {
        let form = Form::new()
            .opt("cores", params.cores)
            .opt("memory", params.memory)
            .opt("storage", params.storage.as_deref())
            .opt("interfaces", params.interfaces.as_deref())
            .opt("hostname", params.hostname.as_deref())
            .opt("domain", params.domain.as_deref())
            .opt("zone", params.zone.as_deref())
            .opt("pool", params.pool.as_deref());
        self.post_form(&format!("pods/{vm_host_id}/"), Some("compose"), &form)
            .await
    }
}

#[async_trait]
impl TagActions for MaasClient {
    async fn update_nodes(
        &self,
        tag: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), ApiError> {
        let form = Form::new().repeat("add", add).repeat("remove", remove);
        self.post_discard(&format!("tags/{tag}/"), "update_nodes", &form)
            .await
    }
}

#[async_trait]
impl InterfaceActions for MaasClient {
    async fn link_subnet(
        &self,
        system_id: &str,
        interface_id: i64,
        link: &LinkRequest,
    ) -> Result<NetworkInterface, ApiError> {
        let form = Form::new()
            .set("mode", link.mode)
            .set("subnet", link.subnet_id)
            .opt("ip_address", link.ip_address.as_deref())
            .opt("default_gateway", link.default_gateway.then_some(true));
        self.post_form(
            &interface_path(system_id, interface_id),
            Some("link_subnet"),
            &form,
        )
        .await
    }

    async fn unlink_subnet(
        &self,
        system_id: &str,
        interface_id: i64,
        link_id: i64,
    ) -> Result<NetworkInterface, ApiError> {
        let form = Form::new().set("id", link_id);
        self.post_form(
            &interface_path(system_id, interface_id),
            Some("unlink_subnet"),
            &form,
        )
        .await
    }
}

#[async_trait]
impl StorageActions for MaasClient {
    async fn add_tag(&self, device: &BlockDeviceRef, tag: &str) -> Result<(), ApiError> {
        let form = Form::new().set("tag", tag);
        self.post_discard(&block_device_path(device), "add_tag", &form)
            .await
    }

    async fn remove_tag(&self, device: &BlockDeviceRef, tag: &str) -> Result<(), ApiError> {
        let form = Form::new().set("tag", tag);
        self.post_discard(&block_device_path(device), "remove_tag", &form)
            .await
    }

    async fn set_boot_disk(&self, device: &BlockDeviceRef) -> Result<(), ApiError> {
        self.post_discard(&block_device_path(device), "set_boot_disk", &Form::new())
            .await
    }

    async fn format_partition(
        &self,
        device: &BlockDeviceRef,
        partition_id: i64,
        fstype: &str,
        label: Option<&str>,
    ) -> Result<Partition, ApiError> {
        let form = Form::new().set("fstype", fstype).opt("label", label);
        self.post_form(&partition_path(device, partition_id), Some("format"), &form)
            .await
    }

    async fn mount_partition(
        &self,
        device: &BlockDeviceRef,
        partition_id: i64,
        mount_point: &str,
        mount_options: Option<&str>,
    ) -> Result<Partition, ApiError> {
        let form = Form::new()
            .set("mount_point", mount_point)
            .opt("mount_options", mount_options);
        self.post_form(&partition_path(device, partition_id), Some("mount"), &form)
            .await
    }
}
