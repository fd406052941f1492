//! Services derived from workloads

use std::collections::BTreeMap;

use kubemix_core::{CoreError, Resource, Schema};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Value as JsonValue, json};

use crate::assembler::Assembler;
use crate::config::ServiceOptions;
use crate::error::{EngineError, Result};

/// `%(key)s` placeholders in a port name format
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\((\w+)\)s").expect("valid regex"));

const CONTAINER_KEY: &str = "container";
const PORT_KEY: &str = "port";

/// Reject formats referencing anything but `container` and `port`
fn validate_name_format(format: &str) -> Result<()> {
    for caps in PLACEHOLDER.captures_iter(format) {
        let key = &caps[1];
        if key != CONTAINER_KEY && key != PORT_KEY {
            return Err(EngineError::InvalidNameFormat {
                format: format.to_string(),
                placeholder: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Substitute container and port names into a validated format
fn port_name(format: &str, container: &str, port: &str) -> String {
    PLACEHOLDER
        .replace_all(format, |caps: &Captures| match &caps[1] {
            CONTAINER_KEY => container.to_string(),
            PORT_KEY => port.to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// Pod template labels minus the ignored keys
fn selector_labels(template: &JsonValue, ignored: &[String]) -> BTreeMap<String, String> {
    let Some(labels) = template.pointer("/metadata/labels").and_then(JsonValue::as_object) else {
        return BTreeMap::new();
    };

    labels
        .iter()
        .filter(|(key, _)| !ignored.contains(*key))
        .map(|(key, value)| {
            let value = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

impl<S: Schema> Assembler<S> {
    /// Derive a Service exposing every named port of a workload
    ///
    /// - the selector is the pod template labels minus `ignored_labels`
    /// - one port per container port, in container then port order, named by
    ///   `name_format`; `port` and `targetPort` are the container port
    /// - `protocol` is only set when the container port declares one
    /// - the Service carries the label `name=<workload name>`
    ///
    /// `options` falls back to the assembler defaults.
    pub fn service_for(
        &self,
        workload: &Resource,
        options: Option<&ServiceOptions>,
    ) -> Result<Resource> {
        let defaults;
        let options = match options {
            Some(options) => options,
            None => {
                defaults = self.config().service_options();
                &defaults
            }
        };
        validate_name_format(&options.name_format)?;

        let name = workload.require_name()?;
        let selector = selector_labels(workload.pod_template()?, &options.ignored_labels);

        let mut ports = Vec::new();
        for (index, container) in workload.containers()?.iter().enumerate() {
            let container_name = container
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    CoreError::missing(format!("spec.template.spec.containers[{}].name", index))
                })?;

            let declared = match container.get("ports") {
                None | Some(JsonValue::Null) => continue,
                Some(JsonValue::Array(declared)) => declared,
                Some(_) => {
                    return Err(EngineError::InvalidPort {
                        resource: workload.display_name(),
                        container: container_name.to_string(),
                        message: "ports must be a list".to_string(),
                    });
                }
            };

            for port in declared {
                let number = port
                    .get("containerPort")
                    .and_then(JsonValue::as_i64)
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(|| EngineError::InvalidPort {
                        resource: workload.display_name(),
                        container: container_name.to_string(),
                        message: "containerPort must be an integer".to_string(),
                    })?;
                let port_label = port.get("name").and_then(JsonValue::as_str).unwrap_or_default();
                let protocol = port.get("protocol").and_then(JsonValue::as_str);

                let rendered = port_name(&options.name_format, container_name, port_label);
                ports.push(self.schema().service_port(&rendered, number, number, protocol)?);
            }
        }

        tracing::debug!(
            resource = %workload.display_name(),
            ports = ports.len(),
            selector = selector.len(),
            "derived service"
        );

        let mut service = self.schema().service(name, &selector, ports)?;
        service.mixin(&json!({ "metadata": { "labels": { "name": name } } }));
        Ok(service)
    }
}
