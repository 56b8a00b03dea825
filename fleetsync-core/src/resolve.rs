//! Identifier resolution against fetched collections.

use tracing::debug;

use crate::api::ResourceApi;
use crate::error::{FleetError, Result};
use crate::resource::Resource;

/// Returns the first item, in collection order, that any of the kind's
/// matchers accepts, together with the key that matched.
///
/// Duplicates sharing a key are not reported; the earliest one wins.
pub fn find_match<'a, R: Resource>(
    items: &'a [R],
    identifier: &str,
) -> Option<(&'a R, &'static str)> {
    if identifier.is_empty() {
        return None;
    }
    let matchers = R::matchers();
    items.iter().find_map(|item| {
        matchers
            .iter()
            .find(|matcher| matcher.matches(item, identifier))
            .map(|matcher| (item, matcher.key()))
    })
}

/// Fetch the collection for `scope` and locate `identifier` in it.
///
/// Returns [`FleetError::NotFound`] when the fetch succeeds but nothing
/// matches, and [`FleetError::Transport`] when the fetch itself fails.
pub async fn resolve<R, A>(api: &A, scope: &R::Scope, identifier: &str) -> Result<R>
where
    R: Resource,
    A: ResourceApi<R> + ?Sized,
{
    let items = api.list(scope).await?;
    match find_match(&items, identifier) {
        Some((item, key)) => {
            debug!(kind = R::KIND, identifier, key, id = %item.id(), "Resolved identifier");
            Ok(item.clone())
        }
        None => Err(FleetError::NotFound {
            kind: R::KIND,
            identifier: identifier.to_string(),
        }),
    }
}
