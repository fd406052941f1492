//! Assembler defaults and per-operation options

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default prefix for `map_to_flags`
pub const DEFAULT_FLAG_PREFIX: &str = "-";

/// Default service port naming template
pub const DEFAULT_NAME_FORMAT: &str = "%(container)s-%(port)s";

/// Default file mode of secret volumes (0o400)
pub const DEFAULT_SECRET_MODE: i32 = 0o400;

/// Node topology key used by anti-affinity rules
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Defaults applied by an [`Assembler`](crate::Assembler) when an operation
/// doesn't receive explicit options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssemblerConfig {
    /// Prefix for generated command line flags (`-`)
    pub flag_prefix: String,
    /// Naming template for derived service ports (`%(container)s-%(port)s`)
    pub service_name_format: String,
    /// Mode of secret volumes (256, i.e. 0o400)
    pub secret_default_mode: i32,
    /// Topology key of anti-affinity terms (`kubernetes.io/hostname`)
    pub topology_key: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            flag_prefix: DEFAULT_FLAG_PREFIX.to_string(),
            service_name_format: DEFAULT_NAME_FORMAT.to_string(),
            secret_default_mode: DEFAULT_SECRET_MODE,
            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
        }
    }
}

impl AssemblerConfig {
    /// Service options seeded from these defaults
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            ignored_labels: Vec::new(),
            name_format: self.service_name_format.clone(),
        }
    }

    /// Secret mount options seeded from these defaults
    pub fn secret_mount_options(&self) -> SecretMountOptions {
        SecretMountOptions {
            default_mode: self.secret_default_mode,
            volume_mount_mixin: None,
        }
    }
}

/// Options for deriving a Service from a workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceOptions {
    /// Pod template labels left out of the selector
    pub ignored_labels: Vec<String>,
    /// Port naming template with `%(container)s` and `%(port)s` placeholders
    pub name_format: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            ignored_labels: Vec::new(),
            name_format: DEFAULT_NAME_FORMAT.to_string(),
        }
    }
}

impl ServiceOptions {
    pub fn ignore_label(mut self, label: impl Into<String>) -> Self {
        self.ignored_labels.push(label.into());
        self
    }

    pub fn name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = format.into();
        self
    }
}

/// Options shared by the volume mount helpers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MountOptions {
    /// Mount read-only (host path and PVC mounts only)
    pub read_only: bool,
    /// Fragment merged into every generated VolumeMount
    pub volume_mount_mixin: Option<JsonValue>,
    /// Fragment merged into the generated Volume (empty-dir mounts only)
    pub volume_mixin: Option<JsonValue>,
}

impl MountOptions {
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn volume_mount_mixin(mut self, mixin: JsonValue) -> Self {
        self.volume_mount_mixin = Some(mixin);
        self
    }

    pub fn volume_mixin(mut self, mixin: JsonValue) -> Self {
        self.volume_mixin = Some(mixin);
        self
    }
}

/// Options for secret volume mounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretMountOptions {
    /// File mode of the projected keys, decimal (256 == 0o400)
    pub default_mode: i32,
    /// Fragment merged into every generated VolumeMount
    pub volume_mount_mixin: Option<JsonValue>,
}

impl Default for SecretMountOptions {
    fn default() -> Self {
        Self {
            default_mode: DEFAULT_SECRET_MODE,
            volume_mount_mixin: None,
        }
    }
}

impl SecretMountOptions {
    pub fn default_mode(mut self, mode: i32) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn volume_mount_mixin(mut self, mixin: JsonValue) -> Self {
        self.volume_mount_mixin = Some(mixin);
        self
    }
}
