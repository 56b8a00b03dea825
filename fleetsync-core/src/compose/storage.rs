use tracing::info;

use super::Fleet;
use crate::api::{FleetApi, ResourceApi, StorageActions};
use crate::converge::{BlockDeviceTags, Partitions, converge_replace, converge_targeted};
use crate::error::{Result, StepContext};
use crate::model::{BlockDevice, BlockDeviceParams, BlockDeviceRef, Machine, Partition};

impl<A: FleetApi> Fleet<A> {
    /// Create or update a block device of `machine`, then converge its tags
    /// and recreate its partition layout.
    ///
    /// Existing partitions are always deleted and the declared ones created
    /// afresh, formatted and mounted where a filesystem is declared.
    pub async fn apply_block_device(
        &self,
        machine: &str,
        params: &BlockDeviceParams,
    ) -> Result<BlockDevice> {
        let system_id = self
            .resolve::<Machine>(&(), machine)
            .await
            .step("resolve machine")?
            .system_id;

        let device = self
            .ensure_updated::<BlockDevice>(&system_id, params, params)
            .await?
            .into_inner();
        let device_ref = BlockDeviceRef {
            system_id: system_id.clone(),
            block_device_id: device.id,
        };

        let tags = BlockDeviceTags {
            api: &self.api,
            device: &device_ref,
        };
        self.guard(converge_targeted(&tags, &device.tags, &params.tags))
            .await
            .step("tags")?;

        let existing = self
            .guard(ResourceApi::<Partition>::list(&self.api, &device_ref))
            .await
            .step("partitions")?;
        let partitions = Partitions {
            api: &self.api,
            device: &device_ref,
        };
        let report = self
            .guard(converge_replace(&partitions, &existing, &params.partitions))
            .await
            .step("partitions")?;
        info!(
            %system_id,
            device = %device.name,
            removed = report.removed,
            created = report.added,
            "Replaced partitions"
        );

        if params.is_boot_device {
            self.guard(self.api.set_boot_disk(&device_ref))
                .await
                .step("boot disk")?;
        }

        self.read::<BlockDevice>(&system_id, &device.id).await
    }
}
