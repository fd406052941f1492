//! Assembly plans
//!
//! A plan is a YAML file listing base workloads, the steps applied to each of
//! them and the RBAC triples to emit:
//!
//! ```yaml
//! config:
//!   topologyKey: topology.kubernetes.io/zone
//! workloads:
//!   - file: deployment.yaml
//!     steps:
//!       - configMapVolumeMount: { file: config.yaml, path: /etc/app }
//!       - resources: { requests: { cpu: 100m } }
//!       - antiAffinity
//!     service:
//!       ignoredLabels: [version]
//! rbac:
//!   - name: app
//!     namespace: prod
//!     scope: namespaced
//!     rules: [...]
//! ```

use indexmap::IndexMap;
use kubemix_core::{CoreError, ListStrategy, Resource, Schema, deep_merge};
use kubemix_engine::{
    Assembler, AssemblerConfig, MountOptions, RbacTriple, SecretMountOptions, ServiceOptions,
    env_map, resources, resources_limits, resources_requests,
};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// A whole plan file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Plan {
    /// Assembler defaults
    pub config: AssemblerConfig,
    pub workloads: Vec<Workload>,
    pub rbac: Vec<RbacEntry>,
}

/// A base resource, given inline or as a YAML file
#[derive(Debug, Clone, Default)]
pub struct Source {
    pub resource: Option<Resource>,
    /// Relative to the plan file
    pub file: Option<PathBuf>,
}

impl Source {
    /// Resolve the resource, reading `file` relative to `base_dir`
    pub fn load(&self, base_dir: &Path) -> Result<Resource> {
        match (&self.resource, &self.file) {
            (Some(resource), None) => Ok(resource.clone()),
            (None, Some(file)) => {
                let path = base_dir.join(file);
                Resource::from_file(&path).map_err(|e| match e {
                    CoreError::Io(err) => CliError::io(&path, err),
                    other => CliError::plan(format!("{}: {}", path.display(), other)),
                })
            }
            (Some(_), Some(_)) => Err(CliError::plan_with_help(
                "both 'resource' and 'file' are set",
                "give the base resource inline or as a file, not both",
            )),
            (None, None) => Err(CliError::plan_with_help(
                "no base resource",
                "add a 'resource' mapping or a 'file' path",
            )),
        }
    }
}

/// One workload and what to do with it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Workload {
    /// Inline base resource
    #[serde(default)]
    pub resource: Option<Resource>,
    /// Base resource file, relative to the plan file
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Derive a Service from the finished workload
    #[serde(default)]
    pub service: Option<ServiceSpec>,
}

impl Workload {
    pub fn source(&self) -> Source {
        Source {
            resource: self.resource.clone(),
            file: self.file.clone(),
        }
    }
}

/// Service derivation settings; unset fields fall back to the plan config
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceSpec {
    pub ignored_labels: Vec<String>,
    pub name_format: Option<String>,
}

impl ServiceSpec {
    pub fn options(&self, config: &AssemblerConfig) -> ServiceOptions {
        let mut options = config.service_options();
        options.ignored_labels = self.ignored_labels.clone();
        if let Some(format) = &self.name_format {
            options.name_format = format.clone();
        }
        options
    }
}

/// CPU and memory quantities
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Quantities {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

impl Quantities {
    fn pair(&self) -> (Option<&str>, Option<&str>) {
        (self.cpu.as_deref(), self.memory.as_deref())
    }
}

/// A transformation applied to a workload
///
/// Volume steps only accept the options their helper honours: `readOnly` on
/// host path and PVC mounts, `volumeMixin` on emptyDir mounts.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    deny_unknown_fields
)]
pub enum Step {
    ConfigMapVolumeMount {
        #[serde(default)]
        config_map: Option<Resource>,
        #[serde(default)]
        file: Option<PathBuf>,
        path: String,
        #[serde(default)]
        volume_mount_mixin: Option<JsonValue>,
    },
    ConfigVolumeMount {
        name: String,
        path: String,
        #[serde(default)]
        volume_mount_mixin: Option<JsonValue>,
    },
    HostVolumeMount {
        name: String,
        host_path: String,
        path: String,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        volume_mount_mixin: Option<JsonValue>,
    },
    PvcVolumeMount {
        claim_name: String,
        path: String,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        volume_mount_mixin: Option<JsonValue>,
    },
    SecretVolumeMount {
        name: String,
        path: String,
        #[serde(default)]
        default_mode: Option<i32>,
        #[serde(default)]
        volume_mount_mixin: Option<JsonValue>,
    },
    EmptyVolumeMount {
        name: String,
        path: String,
        #[serde(default)]
        volume_mount_mixin: Option<JsonValue>,
        #[serde(default)]
        volume_mixin: Option<JsonValue>,
    },
    Resources {
        #[serde(default)]
        requests: Option<Quantities>,
        #[serde(default)]
        limits: Option<Quantities>,
    },
    /// Environment variables for every container, in key order
    Env(IndexMap<String, JsonValue>),
    /// Command line flags appended to every container's args, in key order
    Args(IndexMap<String, JsonValue>),
    AntiAffinity,
    Priority(String),
    /// Merge into the resource, replacing lists
    Merge(JsonValue),
    /// Merge into the resource, appending lists
    Mixin(JsonValue),
    /// Merge into every container, appending lists
    ContainerMixin(JsonValue),
}

fn mount_options(
    read_only: bool,
    volume_mount_mixin: &Option<JsonValue>,
    volume_mixin: &Option<JsonValue>,
) -> MountOptions {
    MountOptions {
        read_only,
        volume_mount_mixin: volume_mount_mixin.clone(),
        volume_mixin: volume_mixin.clone(),
    }
}

impl Step {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Step::ConfigMapVolumeMount { .. } => "configMapVolumeMount",
            Step::ConfigVolumeMount { .. } => "configVolumeMount",
            Step::HostVolumeMount { .. } => "hostVolumeMount",
            Step::PvcVolumeMount { .. } => "pvcVolumeMount",
            Step::SecretVolumeMount { .. } => "secretVolumeMount",
            Step::EmptyVolumeMount { .. } => "emptyVolumeMount",
            Step::Resources { .. } => "resources",
            Step::Env(_) => "env",
            Step::Args(_) => "args",
            Step::AntiAffinity => "antiAffinity",
            Step::Priority(_) => "priority",
            Step::Merge(_) => "merge",
            Step::Mixin(_) => "mixin",
            Step::ContainerMixin(_) => "containerMixin",
        }
    }

    /// Apply this step, returning the updated resource
    pub fn apply<S: Schema>(
        &self,
        assembler: &Assembler<S>,
        resource: &Resource,
        base_dir: &Path,
    ) -> Result<Resource> {
        let updated = match self {
            Step::ConfigMapVolumeMount {
                config_map,
                file,
                path,
                volume_mount_mixin,
            } => {
                let source = Source {
                    resource: config_map.clone(),
                    file: file.clone(),
                };
                let config_map = source.load(base_dir)?;
                let options = mount_options(false, volume_mount_mixin, &None);
                assembler.config_map_volume_mount(resource, &config_map, path, &options)?
            }
            Step::ConfigVolumeMount {
                name,
                path,
                volume_mount_mixin,
            } => {
                let options = mount_options(false, volume_mount_mixin, &None);
                assembler.config_volume_mount(resource, name, path, &options)?
            }
            Step::HostVolumeMount {
                name,
                host_path,
                path,
                read_only,
                volume_mount_mixin,
            } => {
                let options = mount_options(*read_only, volume_mount_mixin, &None);
                assembler.host_volume_mount(resource, name, host_path, path, &options)?
            }
            Step::PvcVolumeMount {
                claim_name,
                path,
                read_only,
                volume_mount_mixin,
            } => {
                let options = mount_options(*read_only, volume_mount_mixin, &None);
                assembler.pvc_volume_mount(resource, claim_name, path, &options)?
            }
            Step::SecretVolumeMount {
                name,
                path,
                default_mode,
                volume_mount_mixin,
            } => {
                let mut options: SecretMountOptions = assembler.config().secret_mount_options();
                if let Some(mode) = default_mode {
                    options.default_mode = *mode;
                }
                options.volume_mount_mixin = volume_mount_mixin.clone();
                assembler.secret_volume_mount(resource, name, path, Some(&options))?
            }
            Step::EmptyVolumeMount {
                name,
                path,
                volume_mount_mixin,
                volume_mixin,
            } => {
                let options = mount_options(false, volume_mount_mixin, volume_mixin);
                assembler.empty_volume_mount(resource, name, path, &options)?
            }
            Step::Resources { requests, limits } => {
                let mixin = match (requests, limits) {
                    (Some(requests), Some(limits)) => resources(requests.pair(), limits.pair()),
                    (Some(requests), None) => {
                        let (cpu, memory) = requests.pair();
                        resources_requests(cpu, memory)
                    }
                    (None, Some(limits)) => {
                        let (cpu, memory) = limits.pair();
                        resources_limits(cpu, memory)
                    }
                    (None, None) => {
                        return Err(CliError::plan_with_help(
                            "resources step without requests or limits",
                            "set 'requests', 'limits' or both",
                        ));
                    }
                };
                assembler.with_container_mixin(resource, &mixin)?
            }
            Step::Env(vars) => assembler.with_container_mixin(resource, &env_map(vars))?,
            Step::Args(flags) => {
                let args = assembler.map_to_flags(flags, None);
                assembler.with_container_mixin(resource, &json!({ "args": args }))?
            }
            Step::AntiAffinity => assembler.anti_affinity(resource)?,
            Step::Priority(class_name) => assembler.pod_priority(resource, class_name)?,
            Step::Merge(overlay) => resource.merged(overlay),
            Step::Mixin(overlay) => resource.mixed(overlay),
            Step::ContainerMixin(mixin) => assembler.with_container_mixin(resource, mixin)?,
        };

        tracing::debug!(resource = %updated.display_name(), step = self.name(), "applied step");
        Ok(updated)
    }
}

/// Whether an RBAC entry grants cluster-wide or namespaced permissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RbacScope {
    #[default]
    Cluster,
    Namespaced,
}

/// A service account with its role and binding
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RbacEntry {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub scope: RbacScope,
    #[serde(default)]
    pub rules: Vec<JsonValue>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl RbacEntry {
    pub fn build<S: Schema>(&self, assembler: &Assembler<S>) -> Result<RbacTriple> {
        let triple = match self.scope {
            RbacScope::Cluster => assembler.rbac(&self.name, &self.rules, &self.namespace)?,
            RbacScope::Namespaced => {
                assembler.namespaced_rbac(&self.name, &self.rules, &self.namespace)?
            }
        };
        Ok(triple)
    }
}

impl Plan {
    /// Parse a plan, applying `--set` overrides before deserializing
    pub fn from_yaml(yaml: &str, set_values: &[String]) -> Result<Self> {
        let mut value: JsonValue = if yaml.trim().is_empty() {
            json!({})
        } else {
            serde_yaml::from_str(yaml)?
        };
        if value.is_null() {
            value = json!({});
        }

        if !set_values.is_empty() {
            let overrides = parse_set_values(set_values)?;
            deep_merge(&mut value, &overrides, ListStrategy::Replace);
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Read a plan file
    pub fn load(path: &Path, set_values: &[String]) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        Self::from_yaml(&content, set_values)
            .map_err(|e| match e {
                CliError::Plan { message, help } => CliError::Plan {
                    message: format!("{}: {}", path.display(), message),
                    help,
                },
                other => other,
            })
    }

    pub fn assembler(&self) -> Assembler {
        Assembler::builder().config(self.config.clone()).build()
    }

    /// Assemble every resource of the plan, in order: each workload followed
    /// by its service, then the RBAC objects
    pub fn assemble<S: Schema>(
        &self,
        assembler: &Assembler<S>,
        base_dir: &Path,
    ) -> Result<Vec<Resource>> {
        let mut output = Vec::new();

        for workload in &self.workloads {
            let mut resource = workload.source().load(base_dir)?;
            for step in &workload.steps {
                resource = step.apply(assembler, &resource, base_dir)?;
            }

            let service = match &workload.service {
                Some(spec) => {
                    let options = spec.options(assembler.config());
                    Some(assembler.service_for(&resource, Some(&options))?)
                }
                None => None,
            };

            output.push(resource);
            output.extend(service);
        }

        for entry in &self.rbac {
            output.extend(entry.build(assembler)?.into_resources());
        }

        Ok(output)
    }
}

/// Parse `key=value` overrides into a value tree
///
/// Keys are dotted paths; values are parsed as booleans, null, numbers or
/// inline JSON where possible and kept as strings otherwise.
pub fn parse_set_values(set_args: &[String]) -> Result<JsonValue> {
    let mut values = Resource::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| {
            CliError::plan_with_help(
                format!("Invalid --set format: '{}'", arg),
                "expected key=value, e.g. --set config.topologyKey=zone",
            )
        })?;

        let json_value = if val == "true" {
            JsonValue::Bool(true)
        } else if val == "false" {
            JsonValue::Bool(false)
        } else if val == "null" {
            JsonValue::Null
        } else if let Ok(num) = val.parse::<i64>() {
            JsonValue::Number(num.into())
        } else if let Some(num) = val.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
        {
            JsonValue::Number(num)
        } else if val.starts_with('[') || val.starts_with('{') {
            serde_json::from_str(val).unwrap_or_else(|_| JsonValue::String(val.to_string()))
        } else {
            JsonValue::String(val.to_string())
        };

        values.set(key, json_value);
    }

    Ok(values.into_inner())
}
