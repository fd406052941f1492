//! Pod placement: anti-affinity and priority

use kubemix_core::{ListStrategy, Resource, Schema, deep_merge};
use serde_json::{Value as JsonValue, json};

use crate::assembler::Assembler;
use crate::error::{EngineError, Result};

/// Pod template label anti-affinity keys on
pub const NAME_LABEL: &str = "name";

const REQUIRED_TERMS_POINTER: &str =
    "/spec/affinity/podAntiAffinity/requiredDuringSchedulingIgnoredDuringExecution";

impl<S: Schema> Assembler<S> {
    /// Forbid two pods of this workload from sharing a node
    ///
    /// Works for Deployments and StatefulSets alike. The rule is a hard
    /// requirement keyed on the pod template label `name`, which must already be
    /// set. Applying it again leaves the workload unchanged; other required
    /// terms already on the pod template are kept.
    pub fn anti_affinity(&self, workload: &Resource) -> Result<Resource> {
        let label = workload
            .pod_template()?
            .pointer("/metadata/labels/name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| EngineError::missing_label(workload.display_name(), NAME_LABEL))?
            .to_string();

        let term = json!({
            "labelSelector": { "matchLabels": { "name": label } },
            "topologyKey": self.config().topology_key,
        });

        let mut result = workload.clone();
        let present = workload
            .pod_template()?
            .pointer(REQUIRED_TERMS_POINTER)
            .and_then(JsonValue::as_array)
            .is_some_and(|terms| terms.contains(&term));
        if present {
            return Ok(result);
        }

        deep_merge(
            result.pod_template_mut()?,
            &json!({
                "spec": {
                    "affinity": {
                        "podAntiAffinity": {
                            "requiredDuringSchedulingIgnoredDuringExecution": [term]
                        }
                    }
                }
            }),
            ListStrategy::Append,
        );

        tracing::debug!(resource = %workload.display_name(), label = %label, "added pod anti-affinity");
        Ok(result)
    }

    /// Assign a PriorityClass to the pod template
    pub fn pod_priority(&self, workload: &Resource, class_name: &str) -> Result<Resource> {
        let mut result = workload.clone();
        deep_merge(
            result.pod_template_mut()?,
            &json!({ "spec": { "priorityClassName": class_name } }),
            ListStrategy::Replace,
        );
        Ok(result)
    }
}
