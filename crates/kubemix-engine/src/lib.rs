//! kubemix Engine - Assembles Kubernetes manifests from composable helpers
//!
//! This crate provides the `Assembler`, built over a `Schema`, with:
//! - Services derived from workload container ports
//! - RBAC triples (ServiceAccount, Role/ClusterRole, binding)
//! - Volume mounts applied to every container, with ConfigMap content hashes
//! - Resource requests/limits, anti-affinity and priority helpers
//! - Flag conversion and YAML output
//!
//! ```
//! use kubemix_core::Schema;
//! use kubemix_engine::{Assembler, format};
//!
//! let assembler = Assembler::new();
//! let schema = assembler.schema();
//!
//! let mut web = schema.container("web", "nginx:1.27").unwrap();
//! web["ports"] = serde_json::json!([schema.container_port("http", 8080, None).unwrap()]);
//! let deployment = schema.deployment("api", 2, vec![web]).unwrap();
//!
//! let service = assembler.service_for(&deployment, None).unwrap();
//! assert_eq!(service.get("spec.ports").unwrap()[0]["name"], "web-http");
//!
//! let yaml = format::to_yaml(&service).unwrap();
//! assert!(yaml.contains("kind: Service"));
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod flags;
pub mod format;
pub mod hash;
pub mod rbac;
pub mod resources;
pub mod scheduling;
pub mod service;
pub mod volumes;

pub use assembler::{Assembler, AssemblerBuilder};
pub use config::{AssemblerConfig, MountOptions, SecretMountOptions, ServiceOptions};
pub use error::{EngineError, Result};
pub use flags::{env_map, map_to_flags};
pub use format::{to_yaml, to_yaml_stream};
pub use hash::content_hash;
pub use rbac::RbacTriple;
pub use resources::{resources, resources_limits, resources_requests};
