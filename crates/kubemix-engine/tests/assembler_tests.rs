//! End-to-end tests for the assembler, against the k8s-openapi schema and a
//! minimal hand-written schema

use std::collections::BTreeMap;

use indexmap::IndexMap;
use kubemix_core::{Resource, RoleRef, Schema, Subject};
use kubemix_engine::{
    Assembler, AssemblerConfig, MountOptions, ServiceOptions, content_hash, format,
    resources_limits, resources_requests,
};
use serde_json::{Value as JsonValue, json};

/// Schema producing bare JSON objects, tagged so tests can tell it was used
#[derive(Debug, Clone, Copy, Default)]
struct MockSchema;

fn object(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> Resource {
    let mut metadata = json!({ "name": name });
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    Resource::from(json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": metadata,
        "mock": true,
    }))
}

fn workload(kind: &str, name: &str, replicas: i32, containers: Vec<JsonValue>) -> Resource {
    object("mock/v1", kind, name, None).merged(&json!({
        "spec": {
            "replicas": replicas,
            "template": {
                "metadata": { "labels": { "name": name } },
                "spec": { "containers": containers }
            }
        }
    }))
}

impl Schema for MockSchema {
    fn deployment(
        &self,
        name: &str,
        replicas: i32,
        containers: Vec<JsonValue>,
    ) -> kubemix_core::Result<Resource> {
        Ok(workload("Deployment", name, replicas, containers))
    }

    fn stateful_set(
        &self,
        name: &str,
        replicas: i32,
        containers: Vec<JsonValue>,
    ) -> kubemix_core::Result<Resource> {
        Ok(workload("StatefulSet", name, replicas, containers))
    }

    fn service(
        &self,
        name: &str,
        selector: &BTreeMap<String, String>,
        ports: Vec<JsonValue>,
    ) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "Service", name, None)
            .merged(&json!({ "spec": { "selector": selector, "ports": ports } })))
    }

    fn service_account(&self, name: &str, namespace: Option<&str>) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "ServiceAccount", name, namespace))
    }

    fn cluster_role(&self, name: &str) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "ClusterRole", name, None))
    }

    fn role(&self, name: &str, namespace: &str) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "Role", name, Some(namespace)))
    }

    fn cluster_role_binding(
        &self,
        name: &str,
        role_ref: &RoleRef,
        subjects: &[Subject],
    ) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "ClusterRoleBinding", name, None)
            .merged(&json!({ "roleRef": role_ref, "subjects": subjects })))
    }

    fn role_binding(
        &self,
        name: &str,
        namespace: &str,
        role_ref: &RoleRef,
        subjects: &[Subject],
    ) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "RoleBinding", name, Some(namespace))
            .merged(&json!({ "roleRef": role_ref, "subjects": subjects })))
    }

    fn config_map(
        &self,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> kubemix_core::Result<Resource> {
        Ok(object("mock/v1", "ConfigMap", name, None).merged(&json!({ "data": data })))
    }

    fn container(&self, name: &str, image: &str) -> kubemix_core::Result<JsonValue> {
        Ok(json!({ "name": name, "image": image }))
    }

    fn container_port(
        &self,
        name: &str,
        port: i32,
        protocol: Option<&str>,
    ) -> kubemix_core::Result<JsonValue> {
        let mut value = json!({ "name": name, "containerPort": port });
        if let Some(protocol) = protocol {
            value["protocol"] = json!(protocol);
        }
        Ok(value)
    }

    fn service_port(
        &self,
        name: &str,
        port: i32,
        target_port: i32,
        protocol: Option<&str>,
    ) -> kubemix_core::Result<JsonValue> {
        let mut value = json!({ "name": name, "port": port, "targetPort": target_port });
        if let Some(protocol) = protocol {
            value["protocol"] = json!(protocol);
        }
        Ok(value)
    }

    fn volume_mount(
        &self,
        name: &str,
        path: &str,
        read_only: Option<bool>,
    ) -> kubemix_core::Result<JsonValue> {
        let mut value = json!({ "name": name, "mountPath": path });
        if let Some(read_only) = read_only {
            value["readOnly"] = json!(read_only);
        }
        Ok(value)
    }

    fn config_map_volume(&self, name: &str, config_map_name: &str) -> kubemix_core::Result<JsonValue> {
        Ok(json!({ "name": name, "configMap": { "name": config_map_name } }))
    }

    fn secret_volume(
        &self,
        name: &str,
        secret_name: &str,
        default_mode: Option<i32>,
    ) -> kubemix_core::Result<JsonValue> {
        Ok(json!({ "name": name, "secret": { "secretName": secret_name, "defaultMode": default_mode } }))
    }

    fn host_path_volume(&self, name: &str, host_path: &str) -> kubemix_core::Result<JsonValue> {
        Ok(json!({ "name": name, "hostPath": { "path": host_path } }))
    }

    fn pvc_volume(&self, name: &str, claim_name: &str) -> kubemix_core::Result<JsonValue> {
        Ok(json!({ "name": name, "persistentVolumeClaim": { "claimName": claim_name } }))
    }

    fn empty_dir_volume(&self, name: &str) -> kubemix_core::Result<JsonValue> {
        Ok(json!({ "name": name, "emptyDir": {} }))
    }
}

fn mock_assembler() -> Assembler<MockSchema> {
    Assembler::builder().schema(MockSchema).build()
}

/// Deployment with containers `web` (http, metrics) and `sidecar` (no ports)
fn deployment<S: Schema>(schema: &S) -> Resource {
    let mut web = schema.container("web", "nginx").unwrap();
    web["ports"] = json!([
        schema.container_port("http", 8080, None).unwrap(),
        schema.container_port("metrics", 9090, Some("TCP")).unwrap(),
    ]);
    let sidecar = schema.container("sidecar", "envoy").unwrap();

    let mut d = schema.deployment("api", 2, vec![web, sidecar]).unwrap();
    d.mixin(&json!({"spec": {"template": {"metadata": {"labels": {"version": "v3"}}}}}));
    d
}

mod service_derivation {
    use super::*;

    #[test]
    fn test_single_port_end_to_end() {
        let assembler = Assembler::new();
        let schema = assembler.schema();
        let mut web = schema.container("web", "nginx").unwrap();
        web["ports"] = json!([schema.container_port("http", 8080, None).unwrap()]);
        let d = schema.deployment("api", 1, vec![web]).unwrap();

        let service = assembler.service_for(&d, None).unwrap();

        assert_eq!(service.kind(), Some("Service"));
        assert_eq!(service.name(), Some("api"));
        assert_eq!(
            service.get("spec.ports").unwrap(),
            &json!([{"name": "web-http", "port": 8080, "targetPort": 8080}])
        );
    }

    #[test]
    fn test_port_count_and_order() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());
        let service = assembler.service_for(&d, None).unwrap();

        let ports = service.get("spec.ports").and_then(JsonValue::as_array).unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0]["name"], "web-http");
        assert_eq!(ports[1]["name"], "web-metrics");
        for port in ports {
            assert_eq!(port["port"], port["targetPort"]);
        }
        assert!(ports[0].get("protocol").is_none());
        assert_eq!(ports[1]["protocol"], "TCP");
    }

    #[test]
    fn test_ignored_labels_only_affect_selector() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());

        let all = assembler.service_for(&d, None).unwrap();
        assert_eq!(
            all.get("spec.selector").unwrap(),
            &json!({"name": "api", "version": "v3"})
        );

        let options = ServiceOptions::default().ignore_label("version");
        let service = assembler.service_for(&d, Some(&options)).unwrap();
        assert_eq!(service.get("spec.selector").unwrap(), &json!({"name": "api"}));
        // the service's own labels are not the selector
        assert_eq!(service.get("metadata.labels").unwrap(), &json!({"name": "api"}));
        // the workload keeps its labels
        assert_eq!(d.get_str("spec.template.metadata.labels.version"), Some("v3"));
    }

    #[test]
    fn test_custom_name_format() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());
        let options = ServiceOptions::default().name_format("%(port)s");
        let service = assembler.service_for(&d, Some(&options)).unwrap();
        assert_eq!(service.get("spec.ports").unwrap()[0]["name"], "http");

        let configured = Assembler::builder().service_name_format("p-%(port)s").build();
        let service = configured.service_for(&d, None).unwrap();
        assert_eq!(service.get("spec.ports").unwrap()[1]["name"], "p-metrics");
    }

    #[test]
    fn test_no_ports_yields_empty_port_list() {
        let assembler = Assembler::new();
        let schema = assembler.schema();
        let d = schema
            .deployment("worker", 1, vec![schema.container("worker", "busybox").unwrap()])
            .unwrap();
        let service = assembler.service_for(&d, None).unwrap();
        assert_eq!(service.get("spec.ports").unwrap(), &json!([]));
    }

    #[test]
    fn test_missing_container_port_fails() {
        let assembler = Assembler::new();
        let d = Resource::from(json!({
            "kind": "Deployment",
            "metadata": {"name": "api"},
            "spec": {"template": {
                "metadata": {"labels": {"name": "api"}},
                "spec": {"containers": [{"name": "web", "ports": [{"name": "http"}]}]}
            }}
        }));
        assert!(matches!(
            assembler.service_for(&d, None),
            Err(kubemix_engine::EngineError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_with_mock_schema() {
        let assembler = mock_assembler();
        let d = deployment(assembler.schema());
        let service = assembler.service_for(&d, None).unwrap();
        assert_eq!(service.get("mock").unwrap(), true);
        assert_eq!(service.get("spec.ports").unwrap().as_array().unwrap().len(), 2);
    }
}

mod rbac_triples {
    use super::*;

    fn rules() -> Vec<JsonValue> {
        vec![json!({"apiGroups": ["apps"], "resources": ["deployments"], "verbs": ["get"]})]
    }

    #[test]
    fn test_names_match() {
        let assembler = Assembler::new();
        for triple in [
            assembler.rbac("operator", &rules(), "ops").unwrap(),
            assembler.namespaced_rbac("operator", &rules(), "ops").unwrap(),
        ] {
            assert_eq!(triple.service_account.name(), Some("operator"));
            assert_eq!(triple.role.name(), Some("operator"));
            assert_eq!(triple.binding.name(), Some("operator"));
            assert_eq!(triple.binding.get_str("roleRef.name"), Some("operator"));
            assert_eq!(
                triple.binding.get_str("roleRef.apiGroup"),
                Some("rbac.authorization.k8s.io")
            );
            assert_eq!(
                triple.binding.get("subjects").unwrap()[0]["kind"],
                "ServiceAccount"
            );
        }
    }

    #[test]
    fn test_role_ref_kind_per_scope() {
        let assembler = mock_assembler();
        let cluster = assembler.rbac("a", &rules(), "ns").unwrap();
        let namespaced = assembler.namespaced_rbac("a", &rules(), "ns").unwrap();
        assert_eq!(cluster.binding.get_str("roleRef.kind"), Some("ClusterRole"));
        assert_eq!(namespaced.binding.get_str("roleRef.kind"), Some("Role"));
        assert_eq!(cluster.role.get("mock").unwrap(), true);
    }
}

mod volume_mounts {
    use super::*;

    #[test]
    fn test_each_helper_adds_one_mount_per_container_and_one_volume() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());
        let opts = MountOptions::default();
        let cm = assembler
            .schema()
            .config_map("conf", &BTreeMap::from([("k".to_string(), "v".to_string())]))
            .unwrap();

        let results = vec![
            assembler.config_map_volume_mount(&d, &cm, "/conf", &opts).unwrap(),
            assembler.config_volume_mount(&d, "conf", "/conf", &opts).unwrap(),
            assembler.host_volume_mount(&d, "logs", "/var/log", "/logs", &opts).unwrap(),
            assembler.pvc_volume_mount(&d, "data", "/data", &opts).unwrap(),
            assembler.secret_volume_mount(&d, "tls", "/tls", None).unwrap(),
            assembler.empty_volume_mount(&d, "tmp", "/tmp", &opts).unwrap(),
        ];

        for result in &results {
            let containers = result.containers().unwrap();
            assert_eq!(containers.len(), 2);
            for container in containers {
                assert_eq!(container["volumeMounts"].as_array().unwrap().len(), 1);
            }
            assert_eq!(
                result
                    .get("spec.template.spec.volumes")
                    .and_then(JsonValue::as_array)
                    .unwrap()
                    .len(),
                1
            );
        }
    }

    #[test]
    fn test_config_map_hash_tracks_content() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());
        let opts = MountOptions::default();
        let schema = assembler.schema();

        let v1 = schema
            .config_map("conf", &BTreeMap::from([("level".to_string(), "info".to_string())]))
            .unwrap();
        let v2 = schema
            .config_map("conf", &BTreeMap::from([("level".to_string(), "debug".to_string())]))
            .unwrap();

        let hash = |cm: &Resource| {
            assembler
                .config_map_volume_mount(&d, cm, "/conf", &opts)
                .unwrap()
                .get("spec.template.metadata.annotations")
                .and_then(|a| a.get("conf-hash"))
                .cloned()
                .unwrap()
        };

        assert_eq!(hash(&v1), hash(&v1));
        assert_ne!(hash(&v1), hash(&v2));
        assert_eq!(hash(&v1), json!(content_hash(&v1).unwrap()));
    }

    #[test]
    fn test_with_mock_schema() {
        let assembler = mock_assembler();
        let d = deployment(assembler.schema());
        let updated = assembler
            .pvc_volume_mount(&d, "data", "/data", &MountOptions::default().read_only(true))
            .unwrap();
        assert_eq!(
            updated.containers().unwrap()[1]["volumeMounts"],
            json!([{"name": "data", "mountPath": "/data", "readOnly": true}])
        );
    }
}

mod container_resources {
    use super::*;

    #[test]
    fn test_requests_and_limits_on_every_container() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());

        let d = assembler
            .with_container_mixin(&d, &resources_requests(Some("250m"), None))
            .unwrap();
        let d = assembler
            .with_container_mixin(&d, &resources_limits(None, Some("512Mi")))
            .unwrap();

        for container in d.containers().unwrap() {
            assert_eq!(
                container["resources"],
                json!({"requests": {"cpu": "250m"}, "limits": {"memory": "512Mi"}})
            );
        }
    }

    #[test]
    fn test_empty_requests_fragment() {
        assert_eq!(resources_requests(None, None), json!({"resources": {"requests": {}}}));
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn test_pipeline_to_yaml() {
        let config: AssemblerConfig = serde_yaml::from_str("secretDefaultMode: 292\n").unwrap();
        let assembler = Assembler::builder().config(config).build();
        let d = deployment(assembler.schema());

        let d = assembler.secret_volume_mount(&d, "tls", "/tls", None).unwrap();
        let d = assembler.anti_affinity(&d).unwrap();
        let d = assembler.pod_priority(&d, "high").unwrap();
        let service = assembler.service_for(&d, None).unwrap();

        assert_eq!(
            d.get("spec.template.spec.volumes").unwrap()[0]["secret"]["defaultMode"],
            292
        );

        let stream = format::to_yaml_stream(&[d.clone(), service]).unwrap();
        let docs: Vec<Resource> = stream
            .split("---\n")
            .map(|doc| Resource::from_yaml(doc).unwrap())
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], d);
        assert_eq!(docs[1].kind(), Some("Service"));
    }

    #[test]
    fn test_flags_for_container_args() {
        let assembler = Assembler::new();
        let mut opts = IndexMap::new();
        opts.insert("config.file".to_string(), json!("/conf/app.yaml"));
        opts.insert("web.listen-address".to_string(), json!(":9090"));
        opts.insert("disabled".to_string(), JsonValue::Null);

        let args = assembler.map_to_flags(&opts, None);
        assert_eq!(args, vec!["-config.file=/conf/app.yaml", "-web.listen-address=:9090"]);

        let d = deployment(assembler.schema());
        let d = assembler.with_container_mixin(&d, &json!({"args": args})).unwrap();
        assert_eq!(d.containers().unwrap()[0]["args"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_inputs_are_never_modified() {
        let assembler = Assembler::new();
        let d = deployment(assembler.schema());
        let snapshot = d.clone();

        let _ = assembler.anti_affinity(&d).unwrap();
        let _ = assembler.pod_priority(&d, "high").unwrap();
        let _ = assembler.empty_volume_mount(&d, "tmp", "/tmp", &MountOptions::default()).unwrap();
        let _ = assembler.service_for(&d, None).unwrap();

        assert_eq!(d, snapshot);
    }
}
