//! ServiceAccount + Role + Binding triples

use kubemix_core::{RBAC_API_GROUP, Resource, RoleRef, Schema, Subject};
use serde_json::Value as JsonValue;

use crate::assembler::Assembler;
use crate::error::Result;

/// The three objects granting a service account its permissions
///
/// All three share one name. `role` is a ClusterRole or a Role, `binding` the
/// matching ClusterRoleBinding or RoleBinding.
#[derive(Debug, Clone, PartialEq)]
pub struct RbacTriple {
    pub service_account: Resource,
    pub role: Resource,
    pub binding: Resource,
}

impl RbacTriple {
    /// The objects in apply order: service account, role, binding
    pub fn into_resources(self) -> Vec<Resource> {
        vec![self.service_account, self.role, self.binding]
    }
}

fn role_ref(kind: &str, name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

fn with_rules(mut role: Resource, rules: &[JsonValue]) -> Resource {
    role.set("rules", JsonValue::Array(rules.to_vec()));
    role
}

impl<S: Schema> Assembler<S> {
    /// Cluster-wide permissions for the service account `name` in `namespace`
    ///
    /// Rules are passed through verbatim.
    pub fn rbac(&self, name: &str, rules: &[JsonValue], namespace: &str) -> Result<RbacTriple> {
        let schema = self.schema();
        let subjects = [Subject::service_account(name, namespace)];

        let triple = RbacTriple {
            service_account: schema.service_account(name, None)?,
            role: with_rules(schema.cluster_role(name)?, rules),
            binding: schema.cluster_role_binding(
                name,
                &role_ref("ClusterRole", name),
                &subjects,
            )?,
        };

        tracing::debug!(name, namespace, rules = rules.len(), "built cluster RBAC");
        Ok(triple)
    }

    /// Permissions limited to `namespace` for the service account `name`
    pub fn namespaced_rbac(
        &self,
        name: &str,
        rules: &[JsonValue],
        namespace: &str,
    ) -> Result<RbacTriple> {
        let schema = self.schema();
        let subjects = [Subject::service_account(name, namespace)];

        let triple = RbacTriple {
            service_account: schema.service_account(name, Some(namespace))?,
            role: with_rules(schema.role(name, namespace)?, rules),
            binding: schema.role_binding(name, namespace, &role_ref("Role", name), &subjects)?,
        };

        tracing::debug!(name, namespace, rules = rules.len(), "built namespaced RBAC");
        Ok(triple)
    }
}
