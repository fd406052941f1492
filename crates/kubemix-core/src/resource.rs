//! Resource records with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::merge::{ListStrategy, deep_merge};

/// Path of the pod template inside workload kinds (Deployment, StatefulSet, ...)
pub const POD_TEMPLATE_PATH: &str = "spec.template";

/// Path of the container list inside workload kinds
pub const CONTAINERS_PATH: &str = "spec.template.spec.containers";

/// A Kubernetes object (or fragment) as a JSON tree
///
/// Resources are treated as immutable values: the `merged`/`mixed` forms return
/// a new record and leave the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(pub JsonValue);

impl Resource {
    /// Create an empty resource
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load a resource from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a resource from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Convert a typed object (e.g. a k8s-openapi struct) into a resource
    pub fn from_typed<T: Serialize>(object: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(object)?))
    }

    /// Deep merge an overlay into this resource, replacing lists
    pub fn merge(&mut self, overlay: &JsonValue) {
        deep_merge(&mut self.0, overlay, ListStrategy::Replace);
    }

    /// Deep merge an overlay into this resource, appending lists
    pub fn mixin(&mut self, overlay: &JsonValue) {
        deep_merge(&mut self.0, overlay, ListStrategy::Append);
    }

    /// Return a copy with `overlay` merged in (lists replaced)
    #[must_use]
    pub fn merged(&self, overlay: &JsonValue) -> Self {
        let mut result = self.clone();
        result.merge(overlay);
        result
    }

    /// Return a copy with `overlay` mixed in (lists appended)
    #[must_use]
    pub fn mixed(&self, overlay: &JsonValue) -> Self {
        let mut result = self.clone();
        result.mixin(overlay);
        result
    }

    /// Set a value by dotted path (e.g., "spec.replicas")
    pub fn set(&mut self, path: &str, value: JsonValue) {
        let parts: Vec<&str> = path.split('.').collect();
        set_nested(&mut self.0, &parts, value);
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get a mutable value by dotted path
    pub fn get_mut(&mut self, path: &str) -> Option<&mut JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested_mut(&mut self.0, &parts)
    }

    /// Get a string by dotted path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(JsonValue::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.get_str("kind")
    }

    pub fn api_version(&self) -> Option<&str> {
        self.get_str("apiVersion")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("metadata.name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get_str("metadata.namespace")
    }

    /// The metadata name, or an error naming the missing field
    pub fn require_name(&self) -> Result<&str> {
        self.name().ok_or_else(|| CoreError::missing("metadata.name"))
    }

    /// Short display form, `Kind/name`
    pub fn display_name(&self) -> String {
        format!(
            "{}/{}",
            self.kind().unwrap_or("Unknown"),
            self.name().unwrap_or("unnamed")
        )
    }

    /// The pod template of a workload resource
    pub fn pod_template(&self) -> Result<&JsonValue> {
        self.get(POD_TEMPLATE_PATH)
            .filter(|v| v.is_object())
            .ok_or_else(|| CoreError::missing(POD_TEMPLATE_PATH))
    }

    /// Mutable pod template of a workload resource
    pub fn pod_template_mut(&mut self) -> Result<&mut JsonValue> {
        self.get_mut(POD_TEMPLATE_PATH)
            .filter(|v| v.is_object())
            .ok_or_else(|| CoreError::missing(POD_TEMPLATE_PATH))
    }

    /// Containers of the pod template
    pub fn containers(&self) -> Result<&Vec<JsonValue>> {
        match self.get(CONTAINERS_PATH) {
            Some(JsonValue::Array(items)) => Ok(items),
            Some(_) => Err(CoreError::invalid(CONTAINERS_PATH, "a list of containers")),
            None => Err(CoreError::missing(CONTAINERS_PATH)),
        }
    }

    /// Mutable containers of the pod template
    pub fn containers_mut(&mut self) -> Result<&mut Vec<JsonValue>> {
        match self.get_mut(CONTAINERS_PATH) {
            Some(JsonValue::Array(items)) => Ok(items),
            Some(_) => Err(CoreError::invalid(CONTAINERS_PATH, "a list of containers")),
            None => Err(CoreError::missing(CONTAINERS_PATH)),
        }
    }

    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

impl From<JsonValue> for Resource {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

impl From<Resource> for JsonValue {
    fn from(resource: Resource) -> Self {
        resource.0
    }
}

fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        if remaining.is_empty() {
            map.insert((*key).to_string(), new_value);
        } else {
            let entry = map
                .entry((*key).to_string())
                .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
            set_nested(entry, remaining, new_value);
        }
    }
}

fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    match path.split_first() {
        None => Some(value),
        Some((key, remaining)) => value.get(*key).and_then(|v| get_nested(v, remaining)),
    }
}

fn get_nested_mut<'a>(value: &'a mut JsonValue, path: &[&str]) -> Option<&'a mut JsonValue> {
    match path.split_first() {
        None => Some(value),
        Some((key, remaining)) => value
            .get_mut(*key)
            .and_then(|v| get_nested_mut(v, remaining)),
    }
}
