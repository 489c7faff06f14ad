use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::Error as _;

pub const POD_KIND: &str = "Pod";

/// The handful of fields the webhook reads from a submitted object.
///
/// Anything else in the object is ignored, so this works for any resource kind.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PodView {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: PodMeta,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PodMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// `None` when the object carries no labels map at all.
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

impl PodView {
    pub fn project(object: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if !object.is_object() {
            return Err(serde_json::Error::custom("object is not a JSON map"));
        }
        Self::deserialize(object)
    }

    pub fn is_pod(&self) -> bool {
        self.kind == POD_KIND
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.labels.as_ref()
    }
}
