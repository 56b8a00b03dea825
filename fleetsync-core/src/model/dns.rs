//! DNS entries: address resources and free-form records.

use serde::Deserialize;

use super::null_default;
use crate::resource::{Matcher, Resource};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IpAddressRef {
    pub ip: String,
}

/// An A/AAAA resource binding an FQDN to addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsResource {
    pub id: i64,
    pub fqdn: String,
    #[serde(default)]
    pub address_ttl: Option<u32>,
    #[serde(default, deserialize_with = "null_default")]
    pub ip_addresses: Vec<IpAddressRef>,
}

impl Resource for DnsResource {
    type Id = i64;
    type Scope = ();
    type Params = DnsResourceParams;
    type Update = DnsResourceParams;

    const KIND: &'static str = "dns resource";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("fqdn", |r, ident| r.fqdn == ident),
        ]
    }

    fn declared_identifier(params: &DnsResourceParams) -> Option<&str> {
        Some(params.fqdn.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DnsResourceParams {
    pub fqdn: String,
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub address_ttl: Option<u32>,
}

/// A record of any other type (CNAME, MX, TXT, SRV, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct DnsRecord {
    pub id: i64,
    pub fqdn: String,
    pub rrtype: String,
    #[serde(default, deserialize_with = "null_default")]
    pub rrdata: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl Resource for DnsRecord {
    type Id = i64;
    type Scope = ();
    type Params = DnsRecordParams;
    type Update = DnsRecordParams;

    const KIND: &'static str = "dns record";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("fqdn", |r, ident| r.fqdn == ident),
        ]
    }

    fn declared_identifier(params: &DnsRecordParams) -> Option<&str> {
        Some(params.fqdn.as_str())
    }

    // One name carries records of several types (MX next to TXT).
    fn is_declared_by(&self, params: &DnsRecordParams) -> bool {
        self.rrtype.eq_ignore_ascii_case(&params.rrtype)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DnsRecordParams {
    pub fqdn: String,
    pub rrtype: String,
    pub rrdata: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}
