//! Object constructors for the Kubernetes resource model
//!
//! Builders never import resource kinds directly. They go through a [`Schema`],
//! which supplies one factory function per kind or fragment. [`KubeSchema`] is
//! backed by the typed `k8s-openapi` structs; tests can substitute their own.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource,
    HostPathVolumeSource, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    SecretVolumeSource, Service, ServiceAccount, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1 as rbac;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::resource::{CONTAINERS_PATH, Resource};

/// API group of every RBAC role reference
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Subject kind used by RBAC bindings
pub const SERVICE_ACCOUNT_KIND: &str = "ServiceAccount";

/// Reference from a binding to the role it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

/// Binding subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Subject {
    /// A ServiceAccount subject in `namespace`
    pub fn service_account(name: &str, namespace: &str) -> Self {
        Self {
            kind: SERVICE_ACCOUNT_KIND.to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
        }
    }
}

/// Factory functions for every kind and fragment the assembler produces
///
/// Top-level kinds come back as [`Resource`]; fragments (containers, ports,
/// mounts, volumes) as raw JSON ready to be mixed into a resource.
pub trait Schema {
    /// Deployment whose selector and pod template carry the label `name=<name>`
    fn deployment(
        &self,
        name: &str,
        replicas: i32,
        containers: Vec<JsonValue>,
    ) -> Result<Resource>;

    /// StatefulSet whose selector and pod template carry the label `name=<name>`
    fn stateful_set(
        &self,
        name: &str,
        replicas: i32,
        containers: Vec<JsonValue>,
    ) -> Result<Resource>;

    fn service(
        &self,
        name: &str,
        selector: &BTreeMap<String, String>,
        ports: Vec<JsonValue>,
    ) -> Result<Resource>;

    fn service_account(&self, name: &str, namespace: Option<&str>) -> Result<Resource>;

    fn cluster_role(&self, name: &str) -> Result<Resource>;

    fn role(&self, name: &str, namespace: &str) -> Result<Resource>;

    fn cluster_role_binding(
        &self,
        name: &str,
        role_ref: &RoleRef,
        subjects: &[Subject],
    ) -> Result<Resource>;

    fn role_binding(
        &self,
        name: &str,
        namespace: &str,
        role_ref: &RoleRef,
        subjects: &[Subject],
    ) -> Result<Resource>;

    fn config_map(&self, name: &str, data: &BTreeMap<String, String>) -> Result<Resource>;

    fn container(&self, name: &str, image: &str) -> Result<JsonValue>;

    fn container_port(&self, name: &str, port: i32, protocol: Option<&str>) -> Result<JsonValue>;

    fn service_port(
        &self,
        name: &str,
        port: i32,
        target_port: i32,
        protocol: Option<&str>,
    ) -> Result<JsonValue>;

    fn volume_mount(&self, name: &str, path: &str, read_only: Option<bool>) -> Result<JsonValue>;

    fn config_map_volume(&self, name: &str, config_map_name: &str) -> Result<JsonValue>;

    fn secret_volume(
        &self,
        name: &str,
        secret_name: &str,
        default_mode: Option<i32>,
    ) -> Result<JsonValue>;

    fn host_path_volume(&self, name: &str, host_path: &str) -> Result<JsonValue>;

    fn pvc_volume(&self, name: &str, claim_name: &str) -> Result<JsonValue>;

    fn empty_dir_volume(&self, name: &str) -> Result<JsonValue>;
}

/// Schema backed by the k8s-openapi type definitions
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeSchema;

fn metadata(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..Default::default()
    }
}

fn name_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("name".to_string(), name.to_string())])
}

fn pod_template(name: &str) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(name_labels(name)),
            ..Default::default()
        }),
        spec: Some(PodSpec::default()),
    }
}

fn name_selector(name: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some(name_labels(name)),
        ..Default::default()
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<JsonValue> {
    Ok(serde_json::to_value(value)?)
}

fn rbac_role_ref(role_ref: &RoleRef) -> rbac::RoleRef {
    rbac::RoleRef {
        api_group: role_ref.api_group.clone(),
        kind: role_ref.kind.clone(),
        name: role_ref.name.clone(),
    }
}

fn rbac_subjects(subjects: &[Subject]) -> Vec<rbac::Subject> {
    subjects
        .iter()
        .map(|s| rbac::Subject {
            kind: s.kind.clone(),
            name: s.name.clone(),
            namespace: s.namespace.clone(),
            ..Default::default()
        })
        .collect()
}

impl Schema for KubeSchema {
    fn deployment(
        &self,
        name: &str,
        replicas: i32,
        containers: Vec<JsonValue>,
    ) -> Result<Resource> {
        let deployment = Deployment {
            metadata: metadata(name, None),
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                selector: name_selector(name),
                template: pod_template(name),
                ..Default::default()
            }),
            ..Default::default()
        };

        // Containers stay untyped so caller mixins survive verbatim
        let mut resource = Resource::from_typed(&deployment)?;
        resource.set(CONTAINERS_PATH, JsonValue::Array(containers));
        Ok(resource)
    }

    fn stateful_set(
        &self,
        name: &str,
        replicas: i32,
        containers: Vec<JsonValue>,
    ) -> Result<Resource> {
        let stateful_set = StatefulSet {
            metadata: metadata(name, None),
            spec: Some(StatefulSetSpec {
                replicas: Some(replicas),
                selector: name_selector(name),
                service_name: name.to_string().into(),
                template: pod_template(name),
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut resource = Resource::from_typed(&stateful_set)?;
        resource.set(CONTAINERS_PATH, JsonValue::Array(containers));
        Ok(resource)
    }

    fn service(
        &self,
        name: &str,
        selector: &BTreeMap<String, String>,
        ports: Vec<JsonValue>,
    ) -> Result<Resource> {
        let service = Service {
            metadata: metadata(name, None),
            spec: Some(ServiceSpec {
                selector: Some(selector.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut resource = Resource::from_typed(&service)?;
        resource.set("spec.ports", JsonValue::Array(ports));
        Ok(resource)
    }

    fn service_account(&self, name: &str, namespace: Option<&str>) -> Result<Resource> {
        Resource::from_typed(&ServiceAccount {
            metadata: metadata(name, namespace),
            ..Default::default()
        })
    }

    fn cluster_role(&self, name: &str) -> Result<Resource> {
        Resource::from_typed(&rbac::ClusterRole {
            metadata: metadata(name, None),
            ..Default::default()
        })
    }

    fn role(&self, name: &str, namespace: &str) -> Result<Resource> {
        Resource::from_typed(&rbac::Role {
            metadata: metadata(name, Some(namespace)),
            ..Default::default()
        })
    }

    fn cluster_role_binding(
        &self,
        name: &str,
        role_ref: &RoleRef,
        subjects: &[Subject],
    ) -> Result<Resource> {
        Resource::from_typed(&rbac::ClusterRoleBinding {
            metadata: metadata(name, None),
            role_ref: rbac_role_ref(role_ref),
            subjects: Some(rbac_subjects(subjects)),
        })
    }

    fn role_binding(
        &self,
        name: &str,
        namespace: &str,
        role_ref: &RoleRef,
        subjects: &[Subject],
    ) -> Result<Resource> {
        Resource::from_typed(&rbac::RoleBinding {
            metadata: metadata(name, Some(namespace)),
            role_ref: rbac_role_ref(role_ref),
            subjects: Some(rbac_subjects(subjects)),
        })
    }

    fn config_map(&self, name: &str, data: &BTreeMap<String, String>) -> Result<Resource> {
        Resource::from_typed(&ConfigMap {
            metadata: metadata(name, None),
            data: Some(data.clone()),
            ..Default::default()
        })
    }

    fn container(&self, name: &str, image: &str) -> Result<JsonValue> {
        to_json(&Container {
            name: name.to_string(),
            image: Some(image.to_string()),
            ..Default::default()
        })
    }

    fn container_port(&self, name: &str, port: i32, protocol: Option<&str>) -> Result<JsonValue> {
        to_json(&ContainerPort {
            name: Some(name.to_string()),
            container_port: port,
            protocol: protocol.map(str::to_string),
            ..Default::default()
        })
    }

    fn service_port(
        &self,
        name: &str,
        port: i32,
        target_port: i32,
        protocol: Option<&str>,
    ) -> Result<JsonValue> {
        to_json(&ServicePort {
            name: Some(name.to_string()),
            port,
            target_port: Some(IntOrString::Int(target_port)),
            protocol: protocol.map(str::to_string),
            ..Default::default()
        })
    }

    fn volume_mount(&self, name: &str, path: &str, read_only: Option<bool>) -> Result<JsonValue> {
        to_json(&VolumeMount {
            name: name.to_string(),
            mount_path: path.to_string(),
            read_only,
            ..Default::default()
        })
    }

    fn config_map_volume(&self, name: &str, config_map_name: &str) -> Result<JsonValue> {
        to_json(&Volume {
            name: name.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name.to_string().into(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn secret_volume(
        &self,
        name: &str,
        secret_name: &str,
        default_mode: Option<i32>,
    ) -> Result<JsonValue> {
        to_json(&Volume {
            name: name.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret_name.to_string()),
                default_mode,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn host_path_volume(&self, name: &str, host_path: &str) -> Result<JsonValue> {
        to_json(&Volume {
            name: name.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: host_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn pvc_volume(&self, name: &str, claim_name: &str) -> Result<JsonValue> {
        to_json(&Volume {
            name: name.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn empty_dir_volume(&self, name: &str) -> Result<JsonValue> {
        to_json(&Volume {
            name: name.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        })
    }
}
