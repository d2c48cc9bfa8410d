//! Bidirectional conversion between the dynamically-typed configuration of an
//! infrastructure-as-code tool and Kubernetes `discovery.k8s.io/v1`
//! EndpointSlices.
//!
//! - [`expand`] turns configuration into [`k8s_openapi`] objects which can be
//!   handed to a Kubernetes client.
//! - [`flatten`] turns objects read from the Kubernetes API back into
//!   configuration.
//!
//! Collections of endpoints and ports are unordered [`ConfigSet`]s,
//! deduplicated by a structural hash of their visible fields.
//!
//! ```
//! use serde_json::json;
//! use stackable_endpointslice::{expand::Expander, flatten::flatten_endpoint_slice};
//!
//! let config = json!({
//!     "metadata": [{"name": "web-abc", "namespace": "default"}],
//!     "address_type": "IPv4",
//!     "endpoint": [{"addresses": ["10.0.0.1"], "conditions": [{"ready": true}]}],
//!     "port": [{"name": "http", "port": 80, "protocol": "TCP"}],
//! });
//!
//! let slice = Expander::default()
//!     .expand_endpoint_slice(&config)
//!     .expect("config is well-formed");
//!
//! assert_eq!(flatten_endpoint_slice(&slice), config);
//! ```
//!
//! ## Crate Features
//!
//! - `clap` enables parsing [`ExpandOptions`] as command line arguments.
//! - `full` enables all available features.

pub mod expand;
pub mod flatten;
pub mod keys;
pub mod options;
pub mod set;
pub mod types;

// External re-exports
pub use k8s_openapi;
// Internal re-exports
pub use expand::Expander;
pub use options::{ExpandOptions, ShapeMismatchPolicy};
pub use set::{ConfigSet, SetHash, SetHasher};
