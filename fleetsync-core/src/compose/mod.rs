//! Multi-step workflows over the fleet service.
//!
//! Each workflow is a strict sequence: a step starts only after the previous
//! one succeeded, and the first failure aborts the chain wrapped in
//! [`FleetError::Step`]. Nothing is rolled back and nothing is retried.

mod machine;
mod network;
mod records;
mod storage;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{FleetApi, ResourceApi};
use crate::create::{Ensured, find_declared, get_or_create};
use crate::error::{FleetError, Result, StepContext};
use crate::model::{Machine, MachineStatus};
use crate::resolve::resolve;
use crate::resource::Resource;
use crate::wait::{WaitSpec, wait_for_state};

/// Deadlines and pacing of lifecycle waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimings {
    pub deploy: Duration,
    pub commission: Duration,
    pub release: Duration,
    /// Grace period before the first poll.
    pub delay: Duration,
    pub min_interval: Duration,
}

impl Default for WaitTimings {
    fn default() -> Self {
        Self {
            deploy: Duration::from_secs(20 * 60),
            commission: Duration::from_secs(20 * 60),
            release: Duration::from_secs(10 * 60),
            delay: Duration::from_secs(5),
            min_interval: Duration::from_secs(3),
        }
    }
}

impl WaitTimings {
    fn spec(
        &self,
        timeout: Duration,
        pending: Vec<MachineStatus>,
        target: Vec<MachineStatus>,
    ) -> WaitSpec<MachineStatus> {
        WaitSpec::new(pending, target)
            .timeout(timeout)
            .delay(self.delay)
            .min_interval(self.min_interval)
    }
}

/// States a machine passes through between enlistment and `Ready`.
const COMMISSIONING: [MachineStatus; 2] = [MachineStatus::Commissioning, MachineStatus::Testing];

/// Handle bundling a fleet client with cancellation and wait timings.
///
/// Every remote call issued through the handle races the cancellation
/// token, so cancelling aborts whichever step is in flight.
pub struct Fleet<A> {
    api: A,
    cancel: CancellationToken,
    timings: WaitTimings,
}

impl<A: FleetApi> Fleet<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            cancel: CancellationToken::new(),
            timings: WaitTimings::default(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timings(mut self, timings: WaitTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timings(&self) -> &WaitTimings {
        &self.timings
    }

    /// Run `fut` unless the handle is cancelled first.
    async fn guard<T, E, F>(&self, fut: F) -> Result<T>
    where
        E: Into<FleetError>,
        F: Future<Output = std::result::Result<T, E>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FleetError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }

    /// Resolve an identifier to an object of kind `R`.
    pub async fn resolve<R>(&self, scope: &R::Scope, identifier: &str) -> Result<R>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        self.guard(resolve::<R, A>(&self.api, scope, identifier))
            .await
    }

    /// Resolve the declared object, creating it when absent.
    pub async fn get_or_create<R>(&self, scope: &R::Scope, params: &R::Params) -> Result<Ensured<R>>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        self.guard(get_or_create::<R, A>(&self.api, scope, params))
            .await
    }

    /// Resolve then delete. An object that is already gone counts as deleted.
    pub async fn delete<R>(&self, scope: &R::Scope, identifier: &str) -> Result<()>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        let resource = match self.resolve::<R>(scope, identifier).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                debug!(kind = R::KIND, identifier, "Already absent");
                return Ok(());
            }
            Err(e) => return Err(e).step("resolve"),
        };
        self.remove(scope, resource).await
    }

    /// Delete the object standing for a declaration, located the way
    /// [`Fleet::get_or_create`] finds it. Absent counts as deleted.
    pub async fn delete_declared<R>(&self, scope: &R::Scope, params: &R::Params) -> Result<()>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        let found = self
            .guard(find_declared::<R, A>(&self.api, scope, params))
            .await
            .step("resolve")?;
        match found {
            Some(resource) => self.remove(scope, resource).await,
            None => {
                debug!(kind = R::KIND, "Declared object already absent");
                Ok(())
            }
        }
    }

    async fn remove<R>(&self, scope: &R::Scope, resource: R) -> Result<()>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        let id = resource.id();
        match self
            .guard(ResourceApi::<R>::delete(&self.api, scope, &id))
            .await
        {
            Ok(()) => {}
            Err(FleetError::Transport(e)) if e.is_missing() => {}
            Err(e) => return Err(e).step("delete"),
        }
        info!(kind = R::KIND, %id, "Deleted");
        Ok(())
    }

    /// Create-or-reuse, then push `update` onto a reused object.
    async fn ensure_updated<R>(
        &self,
        scope: &R::Scope,
        params: &R::Params,
        update: &R::Update,
    ) -> Result<Ensured<R>>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        let ensured = self.get_or_create::<R>(scope, params).await.step("create")?;
        if ensured.created {
            return Ok(ensured);
        }

        let id = ensured.resource.id();
        let resource = self
            .guard(ResourceApi::<R>::update(&self.api, scope, &id, update))
            .await
            .step("update")?;
        debug!(kind = R::KIND, %id, "Updated");
        Ok(Ensured {
            resource,
            created: false,
        })
    }

    /// Fetch the current representation by ID.
    async fn read<R>(&self, scope: &R::Scope, id: &R::Id) -> Result<R>
    where
        R: Resource,
        A: ResourceApi<R>,
    {
        self.guard(ResourceApi::<R>::get(&self.api, scope, id))
            .await
            .step("read")
    }

    /// Poll a machine until it reaches one of `spec.target`.
    async fn wait_machine(&self, system_id: &str, spec: WaitSpec<MachineStatus>) -> Result<Machine> {
        info!(system_id, target = ?spec.target, "Waiting for machine");
        let api = &self.api;
        let system_id = system_id.to_string();
        let machine = wait_for_state(&self.cancel, &spec, || {
            let system_id = system_id.clone();
            async move {
                ResourceApi::<Machine>::get(api, &(), &system_id)
                    .await
                    .map(|machine| {
                        let status = machine.status();
                        (machine, status)
                    })
            }
        })
        .await
        .step("wait")?;
        info!(system_id = %machine.system_id, status = %machine.status(), "Machine reached target state");
        Ok(machine)
    }

    /// Wait for a freshly enlisted, composed or recommissioned machine.
    async fn wait_commissioned(&self, system_id: &str) -> Result<Machine> {
        let spec = self.timings.spec(
            self.timings.commission,
            COMMISSIONING.to_vec(),
            vec![MachineStatus::Ready],
        );
        self.wait_machine(system_id, spec).await
    }
}
