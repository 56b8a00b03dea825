//! Reuse-if-found, create-if-absent.

use tracing::{debug, info};

use crate::api::ResourceApi;
use crate::error::Result;
use crate::resolve::find_match;
use crate::resource::Resource;

/// Outcome of [`get_or_create`].
#[derive(Debug, Clone)]
pub struct Ensured<R> {
    pub resource: R,
    /// Whether this call issued the create.
    pub created: bool,
}

impl<R> Ensured<R> {
    pub fn into_inner(self) -> R {
        self.resource
    }
}

/// Locate the existing object standing for `params`.
///
/// Candidates are narrowed by [`Resource::is_declared_by`] before the
/// declared identifier is matched. Declarations without an identifier
/// never match anything.
pub async fn find_declared<R, A>(api: &A, scope: &R::Scope, params: &R::Params) -> Result<Option<R>>
where
    R: Resource,
    A: ResourceApi<R> + ?Sized,
{
    let Some(identifier) = R::declared_identifier(params) else {
        return Ok(None);
    };
    let candidates: Vec<R> = api
        .list(scope)
        .await?
        .into_iter()
        .filter(|item| item.is_declared_by(params))
        .collect();
    Ok(find_match(&candidates, identifier).map(|(item, key)| {
        debug!(kind = R::KIND, identifier, key, id = %item.id(), "Resolved declaration");
        item.clone()
    }))
}

/// Resolve the declared object and create it only when absent.
///
/// Issues at most one create per call. An existing object is returned
/// unchanged; updating it is the caller's next step. Nothing closes the
/// window between the lookup and the create, so a concurrent creator can
/// still produce a duplicate.
pub async fn get_or_create<R, A>(
    api: &A,
    scope: &R::Scope,
    params: &R::Params,
) -> Result<Ensured<R>>
where
    R: Resource,
    A: ResourceApi<R> + ?Sized,
{
    if let Some(resource) = find_declared::<R, A>(api, scope, params).await? {
        debug!(kind = R::KIND, id = %resource.id(), "Reusing existing object");
        return Ok(Ensured {
            resource,
            created: false,
        });
    }

    let resource = api.create(scope, params).await?;
    info!(kind = R::KIND, id = %resource.id(), "Created");
    Ok(Ensured {
        resource,
        created: true,
    })
}
