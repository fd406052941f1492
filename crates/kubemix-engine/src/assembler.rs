//! The manifest assembler
//!
//! An [`Assembler`] bundles a [`Schema`] with its [`AssemblerConfig`]. Every
//! operation takes the resource it augments by reference and returns a new one;
//! the operations themselves live next to their domain (`service`, `rbac`,
//! `volumes`, `resources`, `scheduling`).

use indexmap::IndexMap;
use kubemix_core::{KubeSchema, ListStrategy, Resource, Schema, deep_merge};
use serde_json::Value as JsonValue;

use crate::config::AssemblerConfig;
use crate::error::Result;
use crate::flags;

/// Assembler builder
pub struct AssemblerBuilder<S: Schema = KubeSchema> {
    schema: S,
    config: AssemblerConfig,
}

impl Default for AssemblerBuilder<KubeSchema> {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblerBuilder<KubeSchema> {
    pub fn new() -> Self {
        Self {
            schema: KubeSchema,
            config: AssemblerConfig::default(),
        }
    }
}

impl<S: Schema> AssemblerBuilder<S> {
    /// Use a different schema (e.g. a test double)
    pub fn schema<T: Schema>(self, schema: T) -> AssemblerBuilder<T> {
        AssemblerBuilder {
            schema,
            config: self.config,
        }
    }

    /// Replace all defaults
    pub fn config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn flag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.flag_prefix = prefix.into();
        self
    }

    pub fn service_name_format(mut self, format: impl Into<String>) -> Self {
        self.config.service_name_format = format.into();
        self
    }

    pub fn secret_default_mode(mut self, mode: i32) -> Self {
        self.config.secret_default_mode = mode;
        self
    }

    pub fn topology_key(mut self, key: impl Into<String>) -> Self {
        self.config.topology_key = key.into();
        self
    }

    /// Build the assembler
    pub fn build(self) -> Assembler<S> {
        Assembler::with_schema(self.schema, self.config)
    }
}

/// Builds Kubernetes manifests from a base resource and a series of steps
#[derive(Debug, Clone, Default)]
pub struct Assembler<S: Schema = KubeSchema> {
    schema: S,
    config: AssemblerConfig,
}

impl Assembler<KubeSchema> {
    /// Assembler with the k8s-openapi schema and default settings
    pub fn new() -> Self {
        Self::with_schema(KubeSchema, AssemblerConfig::default())
    }

    /// Create a builder
    pub fn builder() -> AssemblerBuilder<KubeSchema> {
        AssemblerBuilder::new()
    }
}

impl<S: Schema> Assembler<S> {
    pub fn with_schema(schema: S, config: AssemblerConfig) -> Self {
        Self { schema, config }
    }

    /// The schema used to build base resources and fragments
    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Convert an option map to command line flags
    ///
    /// `prefix` falls back to the configured flag prefix (`-` by default).
    pub fn map_to_flags(
        &self,
        map: &IndexMap<String, JsonValue>,
        prefix: Option<&str>,
    ) -> Vec<String> {
        flags::map_to_flags(map, prefix.unwrap_or(&self.config.flag_prefix))
    }

    /// Mix a fragment into every container of the pod template
    ///
    /// Lists in the fragment are appended, so a `volumeMounts` or `env` mixin
    /// adds entries instead of replacing them.
    pub fn with_container_mixin(&self, workload: &Resource, mixin: &JsonValue) -> Result<Resource> {
        let mut result = workload.clone();
        for container in result.containers_mut()? {
            deep_merge(container, mixin, ListStrategy::Append);
        }

        tracing::trace!(resource = %workload.display_name(), "applied container mixin");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(assembler: &Assembler) -> Resource {
        let schema = assembler.schema();
        let containers = vec![
            schema.container("web", "nginx").unwrap(),
            schema.container("sidecar", "envoy").unwrap(),
        ];
        schema.deployment("api", 1, containers).unwrap()
    }

    #[test]
    fn test_builder_overrides() {
        let assembler = Assembler::builder()
            .flag_prefix("--")
            .secret_default_mode(0o440)
            .topology_key("topology.kubernetes.io/zone")
            .service_name_format("%(port)s")
            .build();

        let config = assembler.config();
        assert_eq!(config.flag_prefix, "--");
        assert_eq!(config.secret_default_mode, 288);
        assert_eq!(config.topology_key, "topology.kubernetes.io/zone");
        assert_eq!(config.service_name_format, "%(port)s");
    }

    #[test]
    fn test_map_to_flags_default_prefix() {
        let mut map = IndexMap::new();
        map.insert("a".to_string(), json!(1));

        let assembler = Assembler::new();
        assert_eq!(assembler.map_to_flags(&map, None), vec!["-a=1"]);
        assert_eq!(assembler.map_to_flags(&map, Some("--")), vec!["--a=1"]);

        let custom = Assembler::builder().flag_prefix("/").build();
        assert_eq!(custom.map_to_flags(&map, None), vec!["/a=1"]);
    }

    #[test]
    fn test_container_mixin_applies_to_all_containers() {
        let assembler = Assembler::new();
        let d = deployment(&assembler);
        let mixin = json!({"env": [{"name": "MODE", "value": "prod"}]});

        let updated = assembler.with_container_mixin(&d, &mixin).unwrap();
        for container in updated.containers().unwrap() {
            assert_eq!(container["env"], json!([{"name": "MODE", "value": "prod"}]));
        }
        assert!(d.containers().unwrap()[0].get("env").is_none());
    }

    #[test]
    fn test_container_mixin_requires_containers() {
        let assembler = Assembler::new();
        let svc = Resource::from(json!({"kind": "Service"}));
        assert!(assembler.with_container_mixin(&svc, &json!({})).is_err());
    }
}
