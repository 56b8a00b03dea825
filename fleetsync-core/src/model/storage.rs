//! Block devices and their partitions.

use serde::Deserialize;

use super::null_default;
use crate::resource::{Matcher, Resource};

/// Declared sizes are in gigabytes of this many bytes.
pub const GIGABYTE: u64 = 1_000_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Filesystem {
    pub fstype: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub mount_point: Option<String>,
    #[serde(default)]
    pub mount_options: Option<String>,
}

/// A machine's block device.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub system_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub device_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
    #[serde(default)]
    pub id_path: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub block_size: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub partitions: Vec<Partition>,
    #[serde(default)]
    pub filesystem: Option<Filesystem>,
}

impl Resource for BlockDevice {
    type Id = i64;
    /// Owning machine's system ID.
    type Scope = String;
    type Params = BlockDeviceParams;
    type Update = BlockDeviceParams;

    const KIND: &'static str = "block device";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("name", |d, ident| d.name == ident),
            Matcher::new("path", |d, ident| !d.path.is_empty() && d.path == ident),
            Matcher::new("id_path", |d, ident| d.id_path.as_deref() == Some(ident)),
        ]
    }

    fn declared_identifier(params: &BlockDeviceParams) -> Option<&str> {
        Some(params.name.as_str())
    }
}

/// Declared block device with its partition layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockDeviceParams {
    pub name: String,
    pub size_gigabytes: u64,
    #[serde(default)]
    pub block_size: Option<u32>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub id_path: Option<String>,
    #[serde(default)]
    pub is_boot_device: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub partitions: Vec<PartitionParams>,
}

impl BlockDeviceParams {
    pub fn size_bytes(&self) -> u64 {
        self.size_gigabytes * GIGABYTE
    }
}

/// Locates a block device on a machine; the scope of its partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDeviceRef {
    pub system_id: String,
    pub block_device_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Partition {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_default")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub bootable: bool,
    #[serde(default)]
    pub filesystem: Option<Filesystem>,
}

impl Resource for Partition {
    type Id = i64;
    type Scope = BlockDeviceRef;
    type Params = PartitionParams;
    type Update = PartitionParams;

    const KIND: &'static str = "partition";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("path", |p, ident| !p.path.is_empty() && p.path == ident),
        ]
    }

    fn declared_identifier(_params: &PartitionParams) -> Option<&str> {
        None
    }
}

/// Declared partition. Partitions have no durable key of their own and
/// are always recreated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartitionParams {
    pub size_gigabytes: u64,
    #[serde(default)]
    pub bootable: bool,
    #[serde(default)]
    pub fs_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub mount_point: Option<String>,
    #[serde(default)]
    pub mount_options: Option<String>,
}

impl PartitionParams {
    pub fn size_bytes(&self) -> u64 {
        self.size_gigabytes * GIGABYTE
    }
}
