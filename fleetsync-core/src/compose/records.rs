//! Flat records: tags, resource pools and DNS entries.

use super::Fleet;
use crate::api::{FleetApi, ResourceApi};
use crate::converge::{TagMembers, converge_targeted};
use crate::error::{FleetError, Result, StepContext};
use crate::model::{
    DnsRecord, DnsRecordParams, DnsResource, DnsResourceParams, Machine, ResourcePool,
    ResourcePoolParams, Tag, TagParams,
};
use crate::resolve::find_match;
use crate::resource::Resource;

impl<A: FleetApi> Fleet<A> {
    /// Create or update a tag and, when machines are declared, converge its
    /// membership to exactly those machines.
    pub async fn apply_tag(&self, params: &TagParams) -> Result<Tag> {
        let tag = self
            .ensure_updated::<Tag>(&(), params, params)
            .await?
            .into_inner();

        if let Some(declared) = &params.machines {
            let machines = self
                .guard(ResourceApi::<Machine>::list(&self.api, &()))
                .await
                .step("members")?;

            let desired = declared
                .iter()
                .map(|identifier| {
                    find_match(&machines, identifier)
                        .map(|(m, _)| m.system_id.clone())
                        .ok_or_else(|| FleetError::NotFound {
                            kind: Machine::KIND,
                            identifier: identifier.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()
                .step("members")?;
            let existing: Vec<String> = machines
                .iter()
                .filter(|m| m.tag_names.contains(&tag.name))
                .map(|m| m.system_id.clone())
                .collect();

            let members = TagMembers {
                api: &self.api,
                tag: &tag.name,
            };
            self.guard(converge_targeted(&members, &existing, &desired))
                .await
                .step("members")?;
        }

        self.read::<Tag>(&(), &tag.name).await
    }

    pub async fn apply_resource_pool(&self, params: &ResourcePoolParams) -> Result<ResourcePool> {
        let pool = self
            .ensure_updated::<ResourcePool>(&(), params, params)
            .await?
            .into_inner();
        self.read::<ResourcePool>(&(), &pool.id).await
    }

    pub async fn apply_dns_resource(&self, params: &DnsResourceParams) -> Result<DnsResource> {
        let resource = self
            .ensure_updated::<DnsResource>(&(), params, params)
            .await?
            .into_inner();
        self.read::<DnsResource>(&(), &resource.id).await
    }

    pub async fn apply_dns_record(&self, params: &DnsRecordParams) -> Result<DnsRecord> {
        let record = self
            .ensure_updated::<DnsRecord>(&(), params, params)
            .await?
            .into_inner();
        self.read::<DnsRecord>(&(), &record.id).await
    }
}
