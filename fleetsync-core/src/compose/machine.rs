//! Machine lifecycle workflows: instances, enlistment, composition,
//! commissioning and VM hosts.

use tracing::{debug, info};

use super::{COMMISSIONING, Fleet};
use crate::api::{FleetApi, MachineActions, ResourceApi, VmHostActions};
use crate::converge::{MachineTags, converge_targeted};
use crate::error::{Result, StepContext};
use crate::model::{
    CommissionParams, ComposeParams, InstanceParams, Machine, MachineParams, MachineStatus,
    MachineUpdate, ReleaseParams, VmHost, VmHostParams,
};

impl<A: FleetApi> Fleet<A> {
    /// Allocate a machine, deploy it and wait until it is deployed.
    ///
    /// When the allocation names a specific machine that is already
    /// deployed it is returned untouched; one that is still deploying is
    /// only waited on.
    pub async fn create_instance(&self, params: &InstanceParams) -> Result<Machine> {
        if let Some(target) = params.allocate.target() {
            let current = self
                .resolve::<Machine>(&(), target)
                .await
                .step("allocate")?;
            match current.status() {
                MachineStatus::Deployed => {
                    debug!(system_id = %current.system_id, "Instance already deployed");
                    return Ok(current);
                }
                MachineStatus::Deploying => {
                    info!(system_id = %current.system_id, "Instance already deploying");
                    self.wait_deployed(&current.system_id).await?;
                    return self.read::<Machine>(&(), &current.system_id).await;
                }
                _ => {}
            }
        }

        let machine = self
            .guard(self.api.allocate(&params.allocate))
            .await
            .step("allocate")?;
        let system_id = machine.system_id;
        info!(%system_id, hostname = %machine.hostname, "Allocated machine");

        self.guard(self.api.deploy(&system_id, &params.deploy))
            .await
            .step("deploy")?;
        info!(%system_id, "Deploying machine");

        self.wait_deployed(&system_id).await?;
        self.read::<Machine>(&(), &system_id).await
    }

    /// Release the machine behind an instance and wait until it is ready.
    ///
    /// A machine that cannot be found, or that is already ready, needs no
    /// release; one that is still releasing is only waited on.
    pub async fn delete_instance(&self, identifier: &str, params: &ReleaseParams) -> Result<()> {
        let machine = match self.resolve::<Machine>(&(), identifier).await {
            Ok(machine) => machine,
            Err(e) if e.is_not_found() => {
                debug!(identifier, "Instance machine already gone");
                return Ok(());
            }
            Err(e) => return Err(e).step("release"),
        };
        let status = machine.status();
        if status == MachineStatus::Ready {
            debug!(system_id = %machine.system_id, "Machine already released");
            return Ok(());
        }

        let mut pending = vec![MachineStatus::Releasing];
        if params.erase || status == MachineStatus::DiskErasing {
            pending.push(MachineStatus::DiskErasing);
        }

        let system_id = machine.system_id;
        if pending.contains(&status) {
            info!(%system_id, %status, "Machine already releasing");
        } else {
            self.guard(self.api.release(&system_id, params))
                .await
                .step("release")?;
            info!(%system_id, erase = params.erase, "Releasing machine");
        }

        let spec = self
            .timings
            .spec(self.timings.release, pending, vec![MachineStatus::Ready]);
        self.wait_machine(&system_id, spec).await?;
        Ok(())
    }

    /// Enlist a machine by power parameters and PXE MAC, wait for
    /// commissioning, then apply its declared settings and tags.
    pub async fn create_machine(&self, params: &MachineParams) -> Result<Machine> {
        let ensured = self
            .get_or_create::<Machine>(&(), params)
            .await
            .step("create")?;
        let machine = ensured.resource;
        let system_id = machine.system_id.clone();

        if ensured.created || COMMISSIONING.contains(&machine.status()) {
            self.wait_commissioned(&system_id).await?;
        }

        let update = MachineUpdate::from(params);
        let machine = self
            .guard(ResourceApi::<Machine>::update(
                &self.api, &(), &system_id, &update,
            ))
            .await
            .step("update")?;

        let tags = MachineTags {
            api: &self.api,
            system_id: &system_id,
        };
        self.guard(converge_targeted(&tags, &machine.tag_names, &params.tags))
            .await
            .step("tags")?;

        self.read::<Machine>(&(), &system_id).await
    }

    /// Compose a machine on a VM host, wait for it to commission, then
    /// apply `update`.
    ///
    /// Composition is skipped when a machine with the requested hostname
    /// already exists.
    pub async fn compose_machine(
        &self,
        vm_host: &str,
        params: &ComposeParams,
        update: &MachineUpdate,
    ) -> Result<Machine> {
        let existing = match params.hostname.as_deref() {
            Some(hostname) => match self.resolve::<Machine>(&(), hostname).await {
                Ok(machine) => Some(machine),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e).step("compose"),
            },
            None => None,
        };

        let system_id = match existing {
            Some(machine) => {
                debug!(system_id = %machine.system_id, "Composed machine already exists");
                if COMMISSIONING.contains(&machine.status()) {
                    self.wait_commissioned(&machine.system_id).await?;
                }
                machine.system_id
            }
            None => {
                let host = self
                    .resolve::<VmHost>(&(), vm_host)
                    .await
                    .step("compose")?;
                let composed = self
                    .guard(self.api.compose(host.id, params))
                    .await
                    .step("compose")?;
                info!(system_id = %composed.system_id, vm_host = %host.name, "Composed machine");
                self.wait_commissioned(&composed.system_id).await?;
                composed.system_id
            }
        };

        if !update.is_empty() {
            self.guard(ResourceApi::<Machine>::update(
                &self.api, &(), &system_id, update,
            ))
            .await
            .step("update")?;
        }
        self.read::<Machine>(&(), &system_id).await
    }

    /// Recommission a machine and wait until it is ready again.
    pub async fn commission_machine(
        &self,
        identifier: &str,
        params: &CommissionParams,
    ) -> Result<Machine> {
        let machine = self
            .resolve::<Machine>(&(), identifier)
            .await
            .step("commission")?;
        self.guard(self.api.commission(&machine.system_id, params))
            .await
            .step("commission")?;
        info!(system_id = %machine.system_id, "Commissioning machine");
        self.wait_commissioned(&machine.system_id).await
    }

    /// Register or update a VM host.
    pub async fn apply_vm_host(&self, params: &VmHostParams) -> Result<VmHost> {
        let ensured = self.ensure_updated::<VmHost>(&(), params, params).await?;
        self.read::<VmHost>(&(), &ensured.resource.id).await
    }

    async fn wait_deployed(&self, system_id: &str) -> Result<Machine> {
        let spec = self.timings.spec(
            self.timings.deploy,
            vec![MachineStatus::Deploying],
            vec![MachineStatus::Deployed],
        );
        self.wait_machine(system_id, spec).await
    }
}
