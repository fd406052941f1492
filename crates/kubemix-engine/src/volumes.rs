//! Volume mount augmenters
//!
//! Each helper adds one VolumeMount to every container of the pod template and
//! one Volume to the pod spec. Lists are appended, never replaced, so helpers
//! compose in any order.

use kubemix_core::{ListStrategy, Resource, Schema, deep_merge, merged};
use serde_json::{Value as JsonValue, json};

use crate::assembler::Assembler;
use crate::config::{MountOptions, SecretMountOptions};
use crate::error::Result;
use crate::hash::{content_hash, hash_annotation_key};

fn with_mixin(fragment: JsonValue, mixin: Option<&JsonValue>) -> JsonValue {
    match mixin {
        Some(mixin) => merged(&fragment, mixin, ListStrategy::Replace),
        None => fragment,
    }
}

impl<S: Schema> Assembler<S> {
    /// Mount `volume` into every container and register it on the pod spec
    fn add_volume(
        &self,
        workload: &Resource,
        mount: JsonValue,
        volume: JsonValue,
    ) -> Result<Resource> {
        let mut result = workload.clone();

        let mount_mixin = json!({ "volumeMounts": [mount] });
        let containers = result.containers_mut()?;
        for container in containers.iter_mut() {
            deep_merge(container, &mount_mixin, ListStrategy::Append);
        }
        let count = containers.len();

        deep_merge(
            result.pod_template_mut()?,
            &json!({ "spec": { "volumes": [volume] } }),
            ListStrategy::Append,
        );

        tracing::debug!(
            resource = %workload.display_name(),
            volume = volume.get("name").and_then(JsonValue::as_str).unwrap_or_default(),
            containers = count,
            "added volume mount"
        );
        Ok(result)
    }

    /// Mount a ConfigMap and pin its content hash on the pod template
    ///
    /// The annotation `<configmap name>-hash` changes whenever any part of the
    /// ConfigMap changes, so the workload rolls on configuration drift.
    pub fn config_map_volume_mount(
        &self,
        workload: &Resource,
        config_map: &Resource,
        path: &str,
        options: &MountOptions,
    ) -> Result<Resource> {
        let name = config_map.require_name()?;
        let hash = content_hash(config_map)?;

        let mut annotations = serde_json::Map::new();
        annotations.insert(hash_annotation_key(name), JsonValue::String(hash));

        let mut result = self.config_volume_mount(workload, name, path, options)?;
        deep_merge(
            result.pod_template_mut()?,
            &json!({ "metadata": { "annotations": annotations } }),
            ListStrategy::Append,
        );
        Ok(result)
    }

    /// Mount the ConfigMap `name` (no hash annotation)
    pub fn config_volume_mount(
        &self,
        workload: &Resource,
        name: &str,
        path: &str,
        options: &MountOptions,
    ) -> Result<Resource> {
        let schema = self.schema();
        let mount = with_mixin(
            schema.volume_mount(name, path, None)?,
            options.volume_mount_mixin.as_ref(),
        );
        self.add_volume(workload, mount, schema.config_map_volume(name, name)?)
    }

    /// Mount the node directory `host_path`
    pub fn host_volume_mount(
        &self,
        workload: &Resource,
        name: &str,
        host_path: &str,
        path: &str,
        options: &MountOptions,
    ) -> Result<Resource> {
        let schema = self.schema();
        let mount = with_mixin(
            schema.volume_mount(name, path, Some(options.read_only))?,
            options.volume_mount_mixin.as_ref(),
        );
        self.add_volume(workload, mount, schema.host_path_volume(name, host_path)?)
    }

    /// Mount the PersistentVolumeClaim `claim_name`, using it as volume name
    pub fn pvc_volume_mount(
        &self,
        workload: &Resource,
        claim_name: &str,
        path: &str,
        options: &MountOptions,
    ) -> Result<Resource> {
        let schema = self.schema();
        let mount = with_mixin(
            schema.volume_mount(claim_name, path, Some(options.read_only))?,
            options.volume_mount_mixin.as_ref(),
        );
        self.add_volume(workload, mount, schema.pvc_volume(claim_name, claim_name)?)
    }

    /// Mount the Secret `name` with a restricted file mode
    ///
    /// `options` falls back to the assembler defaults (mode 0o400).
    pub fn secret_volume_mount(
        &self,
        workload: &Resource,
        name: &str,
        path: &str,
        options: Option<&SecretMountOptions>,
    ) -> Result<Resource> {
        let defaults;
        let options = match options {
            Some(options) => options,
            None => {
                defaults = self.config().secret_mount_options();
                &defaults
            }
        };

        let schema = self.schema();
        let mount = with_mixin(
            schema.volume_mount(name, path, None)?,
            options.volume_mount_mixin.as_ref(),
        );
        let volume = schema.secret_volume(name, name, Some(options.default_mode))?;
        self.add_volume(workload, mount, volume)
    }

    /// Mount a fresh emptyDir; `volume_mixin` tunes the volume (medium, size)
    pub fn empty_volume_mount(
        &self,
        workload: &Resource,
        name: &str,
        path: &str,
        options: &MountOptions,
    ) -> Result<Resource> {
        let schema = self.schema();
        let mount = with_mixin(
            schema.volume_mount(name, path, None)?,
            options.volume_mount_mixin.as_ref(),
        );
        let volume = with_mixin(schema.empty_dir_volume(name)?, options.volume_mixin.as_ref());
        self.add_volume(workload, mount, volume)
    }
}
