//! kubemix Core - Resource records and schema factories for Kubernetes manifests
//!
//! This crate provides the foundational types used throughout kubemix:
//! - `Resource`: A Kubernetes object as a JSON tree with merge/mixin composition
//! - `merge`: The deep merge utility and its list policies
//! - `Schema`: Factory functions per resource kind, with the k8s-openapi backed `KubeSchema`

pub mod error;
pub mod merge;
pub mod resource;
pub mod schema;

pub use error::{CoreError, Result};
pub use merge::{ListStrategy, deep_merge, merged};
pub use resource::{CONTAINERS_PATH, POD_TEMPLATE_PATH, Resource};
pub use schema::{KubeSchema, RBAC_API_GROUP, RoleRef, SERVICE_ACCOUNT_KIND, Schema, Subject};
