//! The `Resource` trait and the identifier matchers each kind declares.

use std::fmt;
use std::str::FromStr;

/// A remote object kind as seen by the fleet service.
pub trait Resource: Clone + fmt::Debug + Send + Sync + 'static {
    /// Durable identifier assigned by the service.
    type Id: Clone + fmt::Display + fmt::Debug + FromStr + PartialEq + Send + Sync;
    /// What narrows the collection (owning machine, block device, subnet).
    type Scope: fmt::Debug + Send + Sync;
    /// Declared parameters used to create the object.
    type Params: fmt::Debug + Send + Sync;
    /// Parameters accepted when updating the object.
    type Update: fmt::Debug + Send + Sync;

    /// Human-readable kind name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    /// Key matchers in priority order.
    fn matchers() -> Vec<Matcher<Self>>;

    /// Identifier to resolve before creating from `params`.
    ///
    /// `None` means the declaration carries no durable key and every
    /// convergence creates a fresh object.
    fn declared_identifier(params: &Self::Params) -> Option<&str>;

    /// Whether this object can stand for the declaration `params`.
    ///
    /// Narrows the candidates before identifier matching for kinds whose
    /// identifier is shared by several distinct objects.
    fn is_declared_by(&self, _params: &Self::Params) -> bool {
        true
    }
}

/// A named predicate testing one key of a resource against an identifier.
pub struct Matcher<R> {
    key: &'static str,
    test: fn(&R, &str) -> bool,
}

impl<R> Matcher<R> {
    pub fn new(key: &'static str, test: fn(&R, &str) -> bool) -> Self {
        Self { key, test }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn matches(&self, resource: &R, identifier: &str) -> bool {
        (self.test)(resource, identifier)
    }
}

impl<R: Resource> Matcher<R> {
    /// Matches the durable ID. Identifiers that do not parse as the kind's
    /// ID type never match.
    pub fn id() -> Self {
        Self::new("id", |resource, identifier| {
            identifier
                .parse::<R::Id>()
                .is_ok_and(|id| resource.id() == id)
        })
    }
}

impl<R> fmt::Debug for Matcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher").field("key", &self.key).finish()
    }
}

/// Case-insensitive MAC address comparison.
pub(crate) fn mac_eq(a: &str, b: &str) -> bool {
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}
