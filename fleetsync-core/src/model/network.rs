//! Network interfaces, their subnet links, subnets and IP ranges.

use std::fmt;

use serde::Deserialize;

use super::null_default;
use crate::resource::{Matcher, Resource, mac_eq};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VlanRef {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub vid: u16,
    #[serde(default, deserialize_with = "null_default")]
    pub fabric: String,
    #[serde(default)]
    pub fabric_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubnetRef {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub cidr: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
}

/// How an interface obtains its address on a linked subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    #[serde(alias = "AUTO")]
    Auto,
    #[serde(alias = "DHCP")]
    Dhcp,
    #[serde(alias = "STATIC")]
    Static,
    #[serde(alias = "LINK_UP")]
    LinkUp,
}

impl LinkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkMode::Auto => "AUTO",
            LinkMode::Dhcp => "DHCP",
            LinkMode::Static => "STATIC",
            LinkMode::LinkUp => "LINK_UP",
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An existing interface-to-subnet link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub id: i64,
    pub mode: LinkMode,
    #[serde(default)]
    pub subnet: Option<SubnetRef>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// A machine network interface.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInterface {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub interface_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub mac_address: String,
    #[serde(default)]
    pub vlan: Option<VlanRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub effective_mtu: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub links: Vec<Link>,
    #[serde(default, deserialize_with = "null_default")]
    pub parents: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub enabled: bool,
}

impl Resource for NetworkInterface {
    type Id = i64;
    /// Owning machine's system ID.
    type Scope = String;
    type Params = InterfaceParams;
    type Update = InterfaceParams;

    const KIND: &'static str = "network interface";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("name", |i, ident| i.name == ident),
            Matcher::new("mac_address", |i, ident| mac_eq(&i.mac_address, ident)),
        ]
    }

    fn declared_identifier(params: &InterfaceParams) -> Option<&str> {
        params
            .name
            .as_deref()
            .or_else(|| params.variant.mac_address())
    }
}

/// Declared interface. The variant decides how it is created.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkParams>,
    #[serde(flatten)]
    pub variant: InterfaceVariant,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterfaceVariant {
    Physical {
        mac_address: String,
        #[serde(default)]
        vlan: Option<i64>,
    },
    Bond {
        parents: Vec<String>,
        #[serde(default)]
        mac_address: Option<String>,
        #[serde(default)]
        bond_mode: Option<String>,
        #[serde(default)]
        vlan: Option<i64>,
    },
    Bridge {
        parent: String,
        #[serde(default)]
        mac_address: Option<String>,
        #[serde(default)]
        bridge_stp: Option<bool>,
        #[serde(default)]
        vlan: Option<i64>,
    },
    Vlan {
        parent: String,
        vlan: i64,
    },
}

impl InterfaceVariant {
    pub fn type_name(&self) -> &'static str {
        match self {
            InterfaceVariant::Physical { .. } => "physical",
            InterfaceVariant::Bond { .. } => "bond",
            InterfaceVariant::Bridge { .. } => "bridge",
            InterfaceVariant::Vlan { .. } => "vlan",
        }
    }

    pub fn mac_address(&self) -> Option<&str> {
        match self {
            InterfaceVariant::Physical { mac_address, .. } => Some(mac_address.as_str()),
            InterfaceVariant::Bond { mac_address, .. }
            | InterfaceVariant::Bridge { mac_address, .. } => mac_address.as_deref(),
            InterfaceVariant::Vlan { .. } => None,
        }
    }

    pub fn vlan(&self) -> Option<i64> {
        match self {
            InterfaceVariant::Physical { vlan, .. }
            | InterfaceVariant::Bond { vlan, .. }
            | InterfaceVariant::Bridge { vlan, .. } => *vlan,
            InterfaceVariant::Vlan { vlan, .. } => Some(*vlan),
        }
    }

    /// Parent interface identifiers as declared.
    pub fn parents(&self) -> Vec<&str> {
        match self {
            InterfaceVariant::Physical { .. } => Vec::new(),
            InterfaceVariant::Bond { parents, .. } => parents.iter().map(String::as_str).collect(),
            InterfaceVariant::Bridge { parent, .. } | InterfaceVariant::Vlan { parent, .. } => {
                vec![parent.as_str()]
            }
        }
    }

    /// Copy of this variant with parents replaced by resolved IDs, in order.
    pub fn with_parent_ids(&self, ids: &[i64]) -> Self {
        let mut variant = self.clone();
        match &mut variant {
            InterfaceVariant::Physical { .. } => {}
            InterfaceVariant::Bond { parents, .. } => {
                *parents = ids.iter().map(i64::to_string).collect();
            }
            InterfaceVariant::Bridge { parent, .. } | InterfaceVariant::Vlan { parent, .. } => {
                if let Some(id) = ids.first() {
                    *parent = id.to_string();
                }
            }
        }
        variant
    }
}

/// Declared link of an interface to a subnet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkParams {
    /// Subnet ID, CIDR or name.
    pub subnet: String,
    pub mode: LinkMode,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub default_gateway: bool,
}

/// A link request with its subnet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub subnet_id: i64,
    pub mode: LinkMode,
    pub ip_address: Option<String>,
    pub default_gateway: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subnet {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub vlan: Option<VlanRef>,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub dns_servers: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub rdns_mode: u8,
    #[serde(default, deserialize_with = "null_default")]
    pub allow_dns: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub allow_proxy: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub managed: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub active_discovery: bool,
    #[serde(default)]
    pub space: Option<String>,
}

impl Resource for Subnet {
    type Id = i64;
    type Scope = ();
    type Params = SubnetParams;
    type Update = SubnetParams;

    const KIND: &'static str = "subnet";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("cidr", |s, ident| s.cidr == ident),
            Matcher::new("name", |s, ident| s.name == ident),
        ]
    }

    fn declared_identifier(params: &SubnetParams) -> Option<&str> {
        Some(params.cidr.as_str())
    }
}

/// Declared subnet together with its IP ranges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubnetParams {
    pub cidr: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fabric: Option<String>,
    #[serde(default)]
    pub vid: Option<u16>,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    #[serde(default)]
    pub rdns_mode: Option<u8>,
    #[serde(default)]
    pub allow_dns: Option<bool>,
    #[serde(default)]
    pub allow_proxy: Option<bool>,
    #[serde(default)]
    pub managed: Option<bool>,
    #[serde(default)]
    pub active_discovery: Option<bool>,
    #[serde(default)]
    pub ip_ranges: Vec<IpRangeParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpRangeType {
    Dynamic,
    Reserved,
}

impl IpRangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            IpRangeType::Dynamic => "dynamic",
            IpRangeType::Reserved => "reserved",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpRange {
    pub id: i64,
    #[serde(rename = "type")]
    pub range_type: IpRangeType,
    pub start_ip: String,
    pub end_ip: String,
    #[serde(default, deserialize_with = "null_default")]
    pub comment: String,
    #[serde(default)]
    pub subnet: Option<SubnetRef>,
}

/// IP ranges are listed and created per owning subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRangeScope {
    pub subnet_id: i64,
}

impl Resource for IpRange {
    type Id = i64;
    type Scope = IpRangeScope;
    type Params = IpRangeParams;
    type Update = IpRangeParams;

    const KIND: &'static str = "ip range";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![Matcher::id()]
    }

    fn declared_identifier(_params: &IpRangeParams) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IpRangeParams {
    #[serde(rename = "type")]
    pub range_type: IpRangeType,
    pub start_ip: String,
    pub end_ip: String,
    #[serde(default)]
    pub comment: Option<String>,
}
