//! Flattens EndpointSlice objects, usually read back from the Kubernetes API,
//! into the configuration representation used for state storage and diffing.
//!
//! Flattening never fails. Every emitted map is sparse: a key is only present
//! if the corresponding domain field is set and non-empty, with the exception
//! of port numbers, where `0` is a valid value.
use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        core::v1::ObjectReference,
        discovery::v1::{Endpoint, EndpointConditions, EndpointPort, EndpointSlice},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    keys,
    set::{ConfigSet, hash_endpoint_slice_endpoints, hash_endpoint_slice_ports},
};

/// Flattens a complete EndpointSlice, including the computed metadata fields.
#[instrument(skip_all, fields(name = slice.metadata.name.as_deref()))]
pub fn flatten_endpoint_slice(slice: &EndpointSlice) -> Value {
    let mut fields = Map::new();

    fields.insert(
        keys::METADATA_KEY.to_owned(),
        Value::Array(flatten_metadata(&slice.metadata)),
    );
    insert_string(&mut fields, keys::ADDRESS_TYPE_KEY, Some(&slice.address_type));

    let endpoints = flatten_endpoint_slice_endpoints(&slice.endpoints);
    if !endpoints.is_empty() {
        fields.insert(keys::ENDPOINT_KEY.to_owned(), endpoints.into());
    }

    let ports = flatten_endpoint_slice_ports(slice.ports.as_deref().unwrap_or_default());
    if !ports.is_empty() {
        fields.insert(keys::PORT_KEY.to_owned(), ports.into());
    }

    tracing::debug!(
        endpoints = slice.endpoints.len(),
        ports = slice.ports.as_ref().map_or(0, Vec::len),
        "flattened endpoint slice"
    );

    Value::Object(fields)
}

/// Flattens endpoints into a set hashed with [`hash_endpoint_slice_endpoints`].
pub fn flatten_endpoint_slice_endpoints(endpoints: &[Endpoint]) -> ConfigSet {
    ConfigSet::from_values(
        hash_endpoint_slice_endpoints(),
        endpoints.iter().map(flatten_endpoint),
    )
}

fn flatten_endpoint(endpoint: &Endpoint) -> Value {
    let mut fields = Map::new();

    if !endpoint.addresses.is_empty() {
        fields.insert(
            keys::ADDRESSES_KEY.to_owned(),
            Value::from(endpoint.addresses.clone()),
        );
    }

    if let Some(conditions) = &endpoint.conditions {
        fields.insert(
            keys::CONDITIONS_KEY.to_owned(),
            Value::Array(flatten_endpoint_conditions(conditions)),
        );
    }

    insert_string(&mut fields, keys::HOSTNAME_KEY, endpoint.hostname.as_ref());
    insert_string(&mut fields, keys::NODE_NAME_KEY, endpoint.node_name.as_ref());

    if let Some(target_ref) = &endpoint.target_ref {
        fields.insert(
            keys::TARGET_REF_KEY.to_owned(),
            Value::Array(flatten_object_reference(target_ref)),
        );
    }

    insert_string(&mut fields, keys::ZONE_KEY, endpoint.zone.as_ref());

    Value::Object(fields)
}

/// Flattens readiness conditions into a single-element block.
pub fn flatten_endpoint_conditions(conditions: &EndpointConditions) -> Vec<Value> {
    let mut fields = Map::new();

    for (key, condition) in [
        (keys::READY_KEY, conditions.ready),
        (keys::SERVING_KEY, conditions.serving),
        (keys::TERMINATING_KEY, conditions.terminating),
    ] {
        if let Some(condition) = condition {
            fields.insert(key.to_owned(), Value::Bool(condition));
        }
    }

    vec![Value::Object(fields)]
}

/// Flattens ports into a set hashed with [`hash_endpoint_slice_ports`].
pub fn flatten_endpoint_slice_ports(ports: &[EndpointPort]) -> ConfigSet {
    ConfigSet::from_values(hash_endpoint_slice_ports(), ports.iter().map(flatten_port))
}

fn flatten_port(port: &EndpointPort) -> Value {
    let mut fields = Map::new();

    insert_string(&mut fields, keys::NAME_KEY, port.name.as_ref());

    if let Some(number) = port.port {
        fields.insert(keys::PORT_NUMBER_KEY.to_owned(), Value::from(number));
    }
    insert_string(&mut fields, keys::PROTOCOL_KEY, port.protocol.as_ref());
    insert_string(&mut fields, keys::APP_PROTOCOL_KEY, port.app_protocol.as_ref());

    Value::Object(fields)
}

/// Flattens an object reference into a block with exactly one element, even if
/// no field of the reference is set.
pub fn flatten_object_reference(reference: &ObjectReference) -> Vec<Value> {
    let mut fields = Map::new();

    insert_string(&mut fields, keys::NAME_KEY, reference.name.as_ref());
    insert_string(&mut fields, keys::NAMESPACE_KEY, reference.namespace.as_ref());
    insert_string(&mut fields, keys::FIELD_PATH_KEY, reference.field_path.as_ref());
    insert_string(
        &mut fields,
        keys::RESOURCE_VERSION_KEY,
        reference.resource_version.as_ref(),
    );
    insert_string(&mut fields, keys::UID_KEY, reference.uid.as_ref());

    vec![Value::Object(fields)]
}

/// Flattens object metadata into a single-element block. Unlike expanding,
/// this includes the fields computed by the API server.
pub fn flatten_metadata(metadata: &ObjectMeta) -> Vec<Value> {
    let mut fields = Map::new();

    insert_string(&mut fields, keys::NAME_KEY, metadata.name.as_ref());
    insert_string(
        &mut fields,
        keys::GENERATE_NAME_KEY,
        metadata.generate_name.as_ref(),
    );
    insert_string(&mut fields, keys::NAMESPACE_KEY, metadata.namespace.as_ref());
    insert_string_map(&mut fields, keys::LABELS_KEY, metadata.labels.as_ref());
    insert_string_map(&mut fields, keys::ANNOTATIONS_KEY, metadata.annotations.as_ref());
    insert_string(&mut fields, keys::UID_KEY, metadata.uid.as_ref());
    insert_string(
        &mut fields,
        keys::RESOURCE_VERSION_KEY,
        metadata.resource_version.as_ref(),
    );

    if let Some(generation) = metadata.generation {
        fields.insert(keys::GENERATION_KEY.to_owned(), Value::from(generation));
    }

    vec![Value::Object(fields)]
}

fn insert_string(fields: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        fields.insert(key.to_owned(), Value::String(value.clone()));
    }
}

fn insert_string_map(
    fields: &mut Map<String, Value>,
    key: &str,
    value: Option<&BTreeMap<String, String>>,
) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        let map = value
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        fields.insert(key.to_owned(), Value::Object(map));
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn object_reference_fields_keep_their_own_values() {
        let reference = ObjectReference {
            name: Some("a".to_owned()),
            namespace: Some("b".to_owned()),
            field_path: Some("c".to_owned()),
            resource_version: Some("d".to_owned()),
            uid: Some("e".to_owned()),
            ..ObjectReference::default()
        };

        assert_eq!(
            flatten_object_reference(&reference),
            vec![json!({
                "name": "a",
                "namespace": "b",
                "field_path": "c",
                "resource_version": "d",
                "uid": "e",
            })]
        );
    }

    #[rstest]
    #[case(ObjectReference::default())]
    #[case(ObjectReference { name: Some(String::new()), ..ObjectReference::default() })]
    #[case(ObjectReference { kind: Some("Pod".to_owned()), ..ObjectReference::default() })]
    fn empty_object_reference_is_single_empty_element(#[case] reference: ObjectReference) {
        assert_eq!(flatten_object_reference(&reference), vec![json!({})]);
    }

    #[test]
    fn port_without_name_omits_name() {
        let port = EndpointPort {
            name: None,
            port: Some(8080),
            protocol: None,
            app_protocol: None,
        };

        let set = flatten_endpoint_slice_ports(&[port]);

        assert_eq!(set.to_list(), vec![json!({"port": 8080})]);
    }

    #[test]
    fn port_with_empty_name_omits_name() {
        let port = EndpointPort {
            name: Some(String::new()),
            port: Some(0),
            protocol: Some("UDP".to_owned()),
            app_protocol: Some("dns".to_owned()),
        };

        let set = flatten_endpoint_slice_ports(&[port]);

        assert_eq!(
            set.to_list(),
            vec![json!({"port": 0, "protocol": "UDP", "app_protocol": "dns"})]
        );
    }

    #[test]
    fn port_with_empty_protocols_omits_them() {
        let port = EndpointPort {
            name: None,
            port: Some(1),
            protocol: Some(String::new()),
            app_protocol: Some(String::new()),
        };

        let set = flatten_endpoint_slice_ports(&[port]);

        assert_eq!(set.to_list(), vec![json!({"port": 1})]);
    }

    #[test]
    fn ports_differing_in_protocol_are_distinct_members() {
        let tcp = EndpointPort {
            name: Some("dns".to_owned()),
            port: Some(53),
            protocol: Some("TCP".to_owned()),
            app_protocol: None,
        };
        let udp = EndpointPort {
            protocol: Some("UDP".to_owned()),
            ..tcp.clone()
        };

        let set = flatten_endpoint_slice_ports(&[tcp, udp]);

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn conditions_are_flattened_from_readiness_flags() {
        let endpoint = Endpoint {
            addresses: vec!["10.0.0.1".to_owned()],
            conditions: Some(EndpointConditions {
                ready: Some(true),
                serving: None,
                terminating: Some(false),
            }),
            hostname: Some("pod-1".to_owned()),
            ..Endpoint::default()
        };

        let set = flatten_endpoint_slice_endpoints(&[endpoint]);

        assert_eq!(
            set.to_list(),
            vec![json!({
                "addresses": ["10.0.0.1"],
                "conditions": [{"ready": true, "terminating": false}],
                "hostname": "pod-1",
            })]
        );
    }

    #[test]
    fn endpoint_is_sparse() {
        let endpoint = Endpoint {
            hostname: Some(String::new()),
            zone: Some(String::new()),
            ..Endpoint::default()
        };

        let set = flatten_endpoint_slice_endpoints(&[endpoint]);

        assert_eq!(set.to_list(), vec![json!({})]);
    }

    #[test]
    fn endpoint_target_ref_is_flattened_as_block() {
        let endpoint = Endpoint {
            addresses: vec!["10.0.0.1".to_owned()],
            node_name: Some("node-a".to_owned()),
            target_ref: Some(ObjectReference {
                name: Some("pod-1".to_owned()),
                namespace: Some("default".to_owned()),
                ..ObjectReference::default()
            }),
            zone: Some("a".to_owned()),
            ..Endpoint::default()
        };

        let set = flatten_endpoint_slice_endpoints(&[endpoint]);

        assert_eq!(
            set.to_list(),
            vec![json!({
                "addresses": ["10.0.0.1"],
                "node_name": "node-a",
                "target_ref": [{"name": "pod-1", "namespace": "default"}],
                "zone": "a",
            })]
        );
    }

    #[test]
    fn duplicate_endpoints_collapse() {
        let endpoint = Endpoint {
            addresses: vec!["10.0.0.1".to_owned()],
            ..Endpoint::default()
        };

        let set = flatten_endpoint_slice_endpoints(&[endpoint.clone(), endpoint]);

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn metadata_includes_computed_fields() {
        let metadata = ObjectMeta {
            name: Some("web-abc".to_owned()),
            namespace: Some("default".to_owned()),
            labels: Some(BTreeMap::from([(
                "kubernetes.io/service-name".to_owned(),
                "web".to_owned(),
            )])),
            annotations: Some(BTreeMap::new()),
            uid: Some("c0ffee".to_owned()),
            resource_version: Some("42".to_owned()),
            generation: Some(1),
            ..ObjectMeta::default()
        };

        assert_eq!(
            flatten_metadata(&metadata),
            vec![json!({
                "name": "web-abc",
                "namespace": "default",
                "labels": {"kubernetes.io/service-name": "web"},
                "uid": "c0ffee",
                "resource_version": "42",
                "generation": 1,
            })]
        );
    }

    #[test]
    fn flatten_slice_without_ports() {
        let slice = EndpointSlice {
            metadata: ObjectMeta {
                name: Some("web-abc".to_owned()),
                ..ObjectMeta::default()
            },
            address_type: "IPv6".to_owned(),
            endpoints: Vec::new(),
            ports: None,
        };

        assert_eq!(
            flatten_endpoint_slice(&slice),
            json!({
                "metadata": [{"name": "web-abc"}],
                "address_type": "IPv6",
            })
        );
    }
}
