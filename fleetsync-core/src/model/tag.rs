//! Tags and their machine membership.

use serde::Deserialize;

use super::null_default;
use crate::resource::{Matcher, Resource};

/// Tags are keyed by name; the service assigns no separate ID.
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub comment: String,
    #[serde(default, deserialize_with = "null_default")]
    pub definition: String,
    #[serde(default, deserialize_with = "null_default")]
    pub kernel_opts: String,
}

impl Resource for Tag {
    type Id = String;
    type Scope = ();
    type Params = TagParams;
    type Update = TagParams;

    const KIND: &'static str = "tag";

    fn id(&self) -> String {
        self.name.clone()
    }

    fn matchers() -> Vec<Matcher<Self>> {
        vec![Matcher::id()]
    }

    fn declared_identifier(params: &TagParams) -> Option<&str> {
        Some(params.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagParams {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub kernel_opts: Option<String>,
    /// Machine identifiers that should carry the tag. Membership is left
    /// alone when unset.
    #[serde(default)]
    pub machines: Option<Vec<String>>,
}

impl TagParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
