//! Expands user-authored configuration into EndpointSlice objects destined for
//! the Kubernetes API.
//!
//! Optional fields follow one discipline throughout: missing keys, `null`,
//! empty strings and empty lists all expand to the unset state of the domain
//! field. As a consequence an explicitly configured empty string cannot be told
//! apart from an unset field. Present values of the wrong shape are handled
//! according to [`ExpandOptions::on_shape_mismatch`].
use k8s_openapi::{
    api::{
        core::v1::ObjectReference,
        discovery::v1::{Endpoint, EndpointConditions, EndpointPort, EndpointSlice},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde_json::Value;
use snafu::Snafu;
use tracing::instrument;

use crate::{
    keys,
    options::{ExpandOptions, ShapeMismatchPolicy},
    set::{ConfigSet, hash_endpoint_slice_endpoints, hash_endpoint_slice_ports},
    types::{AddressType, Protocol},
};

mod decode;

use decode::Decoder;
pub use decode::FieldPath;

const PROTOCOL: &str = "one of TCP, UDP or SCTP";
const ADDRESS_TYPE: &str = "one of IPv4, IPv6 or FQDN";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("field {path} must be {expected}, found {found}"))]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        found: Value,
    },

    #[snafu(display("required field {path} is missing"))]
    MissingField { path: FieldPath },
}

/// Converts configuration sets and blocks into their EndpointSlice domain
/// objects.
///
/// ```
/// use serde_json::json;
/// use stackable_endpointslice::{expand::Expander, set::{ConfigSet, hash_endpoint_slice_ports}};
///
/// let ports = ConfigSet::from_values(
///     hash_endpoint_slice_ports(),
///     [json!({"name": "http", "port": 80, "protocol": "TCP"})],
/// );
///
/// let ports = Expander::default()
///     .expand_endpoint_slice_ports(Some(&ports))
///     .expect("ports are well-formed");
///
/// assert_eq!(ports[0].port, Some(80));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Expander {
    options: ExpandOptions,
}

impl Expander {
    pub fn new(options: ExpandOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    fn policy(&self) -> ShapeMismatchPolicy {
        self.options.on_shape_mismatch
    }

    /// Expands a complete EndpointSlice configuration.
    ///
    /// The `endpoint` and `port` lists are deduplicated through their set
    /// hashers before being expanded. An empty port set results in no ports
    /// at all, rather than an empty list.
    ///
    /// The `address_type` is required and must be one of the values allowed by
    /// the API, an unknown value fails regardless of the configured policy.
    #[instrument(skip_all, fields(policy = %self.policy()))]
    pub fn expand_endpoint_slice(&self, config: &Value) -> Result<EndpointSlice> {
        let root = Decoder::new(config, FieldPath::default(), self.policy())?;

        let metadata = match root.list(keys::METADATA_KEY)? {
            Some(block) => self.metadata(block, FieldPath::root(keys::METADATA_KEY))?,
            None => ObjectMeta::default(),
        };

        let address_type: AddressType =
            root.required_parse(keys::ADDRESS_TYPE_KEY, ADDRESS_TYPE)?;

        let endpoints = root.list(keys::ENDPOINT_KEY)?.map(|members| {
            ConfigSet::from_values(hash_endpoint_slice_endpoints(), members.iter().cloned())
        });
        let endpoints = self.endpoints(endpoints.as_ref(), &FieldPath::root(keys::ENDPOINT_KEY))?;

        let ports = root.list(keys::PORT_KEY)?.map(|members| {
            ConfigSet::from_values(hash_endpoint_slice_ports(), members.iter().cloned())
        });
        let ports = self.ports(ports.as_ref(), &FieldPath::root(keys::PORT_KEY))?;

        tracing::debug!(
            name = metadata.name.as_deref(),
            endpoints = endpoints.len(),
            ports = ports.len(),
            "expanded endpoint slice"
        );

        Ok(EndpointSlice {
            metadata,
            address_type: address_type.to_string(),
            endpoints,
            ports: (!ports.is_empty()).then_some(ports),
        })
    }

    /// Expands the `endpoint` set. A missing or empty set results in an empty
    /// list. The order of the set is kept and no deduplication happens here.
    pub fn expand_endpoint_slice_endpoints(
        &self,
        set: Option<&ConfigSet>,
    ) -> Result<Vec<Endpoint>> {
        self.endpoints(set, &FieldPath::root(keys::ENDPOINT_KEY))
    }

    /// Expands a `target_ref` block.
    ///
    /// An empty block, or one whose only element is empty, results in a
    /// zero-valued [`ObjectReference`]. The `uid` must always be a string, a
    /// mismatch fails regardless of the configured policy.
    pub fn expand_object_reference(&self, block: &[Value]) -> Result<ObjectReference> {
        self.object_reference(block, FieldPath::root(keys::TARGET_REF_KEY))
    }

    /// Expands the `port` set. A missing or empty set results in an empty
    /// list.
    pub fn expand_endpoint_slice_ports(
        &self,
        set: Option<&ConfigSet>,
    ) -> Result<Vec<EndpointPort>> {
        self.ports(set, &FieldPath::root(keys::PORT_KEY))
    }

    /// Expands a `conditions` block. Like object references, an empty block
    /// results in zero-valued conditions.
    pub fn expand_endpoint_conditions(&self, block: &[Value]) -> Result<EndpointConditions> {
        self.endpoint_conditions(block, FieldPath::root(keys::CONDITIONS_KEY))
    }

    /// Expands a `metadata` block. Computed fields such as `uid` are ignored.
    pub fn expand_metadata(&self, block: &[Value]) -> Result<ObjectMeta> {
        self.metadata(block, FieldPath::root(keys::METADATA_KEY))
    }

    fn endpoints(&self, set: Option<&ConfigSet>, path: &FieldPath) -> Result<Vec<Endpoint>> {
        let Some(set) = set else {
            return Ok(Vec::new());
        };

        set.members()
            .enumerate()
            .map(|(index, member)| self.endpoint(member, path.join(index)))
            .collect()
    }

    fn endpoint(&self, member: &Value, path: FieldPath) -> Result<Endpoint> {
        let fields = Decoder::new(member, path, self.policy())?;

        let conditions = fields
            .list(keys::CONDITIONS_KEY)?
            .map(|block| self.endpoint_conditions(block, fields.path().join(keys::CONDITIONS_KEY)))
            .transpose()?;

        let target_ref = fields
            .list(keys::TARGET_REF_KEY)?
            .map(|block| self.object_reference(block, fields.path().join(keys::TARGET_REF_KEY)))
            .transpose()?;

        Ok(Endpoint {
            addresses: fields.string_list(keys::ADDRESSES_KEY)?.unwrap_or_default(),
            conditions,
            hostname: fields.string(keys::HOSTNAME_KEY)?,
            node_name: fields.string(keys::NODE_NAME_KEY)?,
            target_ref,
            zone: fields.string(keys::ZONE_KEY)?,
            ..Endpoint::default()
        })
    }

    fn endpoint_conditions(&self, block: &[Value], path: FieldPath) -> Result<EndpointConditions> {
        let fields = Decoder::first_of(block, path, self.policy())?;

        Ok(EndpointConditions {
            ready: fields.bool(keys::READY_KEY)?,
            serving: fields.bool(keys::SERVING_KEY)?,
            terminating: fields.bool(keys::TERMINATING_KEY)?,
        })
    }

    fn object_reference(&self, block: &[Value], path: FieldPath) -> Result<ObjectReference> {
        let fields = Decoder::first_of(block, path, self.policy())?;

        if fields.is_empty() {
            return Ok(ObjectReference::default());
        }

        Ok(ObjectReference {
            name: fields.string(keys::NAME_KEY)?,
            namespace: fields.string(keys::NAMESPACE_KEY)?,
            resource_version: fields.string(keys::RESOURCE_VERSION_KEY)?,
            uid: fields.strict_string(keys::UID_KEY)?,
            field_path: fields.string(keys::FIELD_PATH_KEY)?,
            ..ObjectReference::default()
        })
    }

    fn ports(&self, set: Option<&ConfigSet>, path: &FieldPath) -> Result<Vec<EndpointPort>> {
        let Some(set) = set else {
            return Ok(Vec::new());
        };

        set.members()
            .enumerate()
            .map(|(index, member)| self.port(member, path.join(index)))
            .collect()
    }

    fn port(&self, member: &Value, path: FieldPath) -> Result<EndpointPort> {
        let fields = Decoder::new(member, path, self.policy())?;

        Ok(EndpointPort {
            name: fields.string(keys::NAME_KEY)?,
            port: fields.port(keys::PORT_NUMBER_KEY)?,
            protocol: fields
                .parse::<Protocol>(keys::PROTOCOL_KEY, PROTOCOL)?
                .map(|protocol| protocol.to_string()),
            app_protocol: fields.string(keys::APP_PROTOCOL_KEY)?,
        })
    }

    fn metadata(&self, block: &[Value], path: FieldPath) -> Result<ObjectMeta> {
        let fields = Decoder::first_of(block, path, self.policy())?;

        Ok(ObjectMeta {
            name: fields.string(keys::NAME_KEY)?,
            generate_name: fields.string(keys::GENERATE_NAME_KEY)?,
            namespace: fields.string(keys::NAMESPACE_KEY)?,
            labels: fields.string_map(keys::LABELS_KEY)?,
            annotations: fields.string_map(keys::ANNOTATIONS_KEY)?,
            ..ObjectMeta::default()
        })
    }
}
