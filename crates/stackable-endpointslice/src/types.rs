//! Closed value sets of the EndpointSlice API which are plain strings in
//! [`k8s_openapi`], but get validated while expanding configuration.
use strum::{AsRefStr, Display, EnumString, VariantNames};

/// The IP protocol of an [`EndpointPort`](k8s_openapi::api::discovery::v1::EndpointPort).
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq, VariantNames)]
pub enum Protocol {
    #[strum(serialize = "TCP")]
    Tcp,

    #[strum(serialize = "UDP")]
    Udp,

    #[strum(serialize = "SCTP")]
    Sctp,
}

/// The type of address carried by every endpoint of an EndpointSlice.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq, VariantNames)]
pub enum AddressType {
    #[strum(serialize = "IPv4")]
    IPv4,

    #[strum(serialize = "IPv6")]
    IPv6,

    /// Fully qualified domain name.
    #[strum(serialize = "FQDN")]
    Fqdn,
}
