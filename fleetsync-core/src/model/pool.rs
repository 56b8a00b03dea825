//! Resource pools.

use serde::Deserialize;

use super::null_default;
use crate::resource::{Matcher, Resource};

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcePool {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
}

impl Resource for ResourcePool {
    type Id = i64;
    type Scope = ();
    type Params = ResourcePoolParams;
    type Update = ResourcePoolParams;

    const KIND: &'static str = "resource pool";

    fn id(&self) -> i64 {
        self.id
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![
            Matcher::id(),
            Matcher::new("name", |p, ident| p.name == ident),
        ]
    }

    fn declared_identifier(params: &ResourcePoolParams) -> Option<&str> {
        Some(params.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcePoolParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
