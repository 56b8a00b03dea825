use tracing::debug;

use super::Fleet;
use crate::api::{FleetApi, ResourceApi};
use crate::converge::{InterfaceLinks, IpRanges, converge_replace, converge_targeted};
use crate::error::{FleetError, Result, StepContext};
use crate::model::{
    InterfaceParams, IpRange, IpRangeScope, Link, LinkRequest, Machine, NetworkInterface, Subnet,
    SubnetParams,
};
use crate::resolve::find_match;

impl<A: FleetApi> Fleet<A> {
    /// Create or update an interface of `machine` and converge its links.
    ///
    /// Parents of bonds, bridges and VLANs are resolved among the machine's
    /// interfaces and passed to the service by ID. Links whose subnet is
    /// unset are left alone.
    pub async fn apply_interface(
        &self,
        machine: &str,
        params: &InterfaceParams,
    ) -> Result<NetworkInterface> {
        let system_id = self
            .resolve::<Machine>(&(), machine)
            .await
            .step("resolve machine")?
            .system_id;

        let mut parent_ids = Vec::new();
        for parent in params.variant.parents() {
            let parent = self
                .resolve::<NetworkInterface>(&system_id, parent)
                .await
                .step("resolve parent")?;
            parent_ids.push(parent.id);
        }
        let params = InterfaceParams {
            variant: params.variant.with_parent_ids(&parent_ids),
            ..params.clone()
        };

        let iface = self
            .ensure_updated::<NetworkInterface>(&system_id, &params, &params)
            .await?
            .into_inner();

        let desired = self.link_requests(&params).await?;
        let existing: Vec<Link> = iface
            .links
            .iter()
            .filter(|link| link.subnet.is_some())
            .cloned()
            .collect();
        let links = InterfaceLinks {
            api: &self.api,
            system_id: &system_id,
            interface_id: iface.id,
        };
        self.guard(converge_targeted(&links, &existing, &desired))
            .await
            .step("links")?;

        self.read::<NetworkInterface>(&system_id, &iface.id).await
    }

    async fn link_requests(&self, params: &InterfaceParams) -> Result<Vec<LinkRequest>> {
        if params.links.is_empty() {
            return Ok(Vec::new());
        }
        let subnets = self
            .guard(ResourceApi::<Subnet>::list(&self.api, &()))
            .await
            .step("resolve subnet")?;

        params
            .links
            .iter()
            .map(|link| {
                let (subnet, key) = find_match(&subnets, &link.subnet)
                    .ok_or_else(|| FleetError::NotFound {
                        kind: "subnet",
                        identifier: link.subnet.clone(),
                    })
                    .step("resolve subnet")?;
                debug!(subnet = %link.subnet, key, id = subnet.id, "Resolved link subnet");
                Ok(LinkRequest {
                    subnet_id: subnet.id,
                    mode: link.mode,
                    ip_address: link.ip_address.clone(),
                    default_gateway: link.default_gateway,
                })
            })
            .collect()
    }

    /// Create or update a subnet, then recreate its IP ranges.
    pub async fn apply_subnet(&self, params: &SubnetParams) -> Result<Subnet> {
        let subnet = self
            .ensure_updated::<Subnet>(&(), params, params)
            .await?
            .into_inner();

        let scope = IpRangeScope {
            subnet_id: subnet.id,
        };
        let existing = self
            .guard(ResourceApi::<IpRange>::list(&self.api, &scope))
            .await
            .step("ip ranges")?;
        let ranges = IpRanges {
            api: &self.api,
            scope,
        };
        self.guard(converge_replace(&ranges, &existing, &params.ip_ranges))
            .await
            .step("ip ranges")?;

        self.read::<Subnet>(&(), &subnet.id).await
    }
}
