//! Configuration keys used by the EndpointSlice schema.
//!
//! Nested blocks (`metadata`, `conditions`, `target_ref`) are lists holding at
//! most one map, sets (`endpoint`, `port`) are lists of maps which get
//! deduplicated by their [`SetHasher`](crate::set::SetHasher).

/// The `metadata` block of an EndpointSlice.
pub const METADATA_KEY: &str = "metadata";

/// The address type of all endpoints in a slice, one of `IPv4`, `IPv6` or
/// `FQDN`.
pub const ADDRESS_TYPE_KEY: &str = "address_type";

/// The set of endpoints of a slice.
pub const ENDPOINT_KEY: &str = "endpoint";

/// The set of ports of a slice.
pub const PORT_KEY: &str = "port";

pub const ADDRESSES_KEY: &str = "addresses";
pub const CONDITIONS_KEY: &str = "conditions";
pub const HOSTNAME_KEY: &str = "hostname";
pub const NODE_NAME_KEY: &str = "node_name";
pub const TARGET_REF_KEY: &str = "target_ref";
pub const ZONE_KEY: &str = "zone";

pub const READY_KEY: &str = "ready";
pub const SERVING_KEY: &str = "serving";
pub const TERMINATING_KEY: &str = "terminating";

pub const NAME_KEY: &str = "name";
pub const PORT_NUMBER_KEY: &str = "port";
pub const PROTOCOL_KEY: &str = "protocol";
pub const APP_PROTOCOL_KEY: &str = "app_protocol";

pub const NAMESPACE_KEY: &str = "namespace";
pub const RESOURCE_VERSION_KEY: &str = "resource_version";
pub const UID_KEY: &str = "uid";
pub const FIELD_PATH_KEY: &str = "field_path";

pub const GENERATE_NAME_KEY: &str = "generate_name";
pub const LABELS_KEY: &str = "labels";
pub const ANNOTATIONS_KEY: &str = "annotations";
pub const GENERATION_KEY: &str = "generation";

/// The fields of an endpoint which contribute to its identity within a set.
pub const ENDPOINT_HASH_FIELDS: &[&str] = &[
    ADDRESSES_KEY,
    CONDITIONS_KEY,
    HOSTNAME_KEY,
    NODE_NAME_KEY,
    TARGET_REF_KEY,
    ZONE_KEY,
];

/// The fields of a port which contribute to its identity within a set.
pub const PORT_HASH_FIELDS: &[&str] = &[NAME_KEY, PORT_NUMBER_KEY, PROTOCOL_KEY, APP_PROTOCOL_KEY];
