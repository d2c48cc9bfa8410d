use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Decides what happens when an optional configuration field is present, but
/// does not hold the shape the EndpointSlice API expects, e.g. a `port` given
/// as a string.
///
/// The policy applies to every optional field of every expand operation. The
/// `uid` of an object reference is fixed by the API contract and always fails
/// on a mismatch, regardless of the policy.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum ShapeMismatchPolicy {
    /// Treat the wrongly-shaped field as unset.
    #[default]
    Skip,

    /// Abort the conversion with a type mismatch error naming the field.
    Fail,
}

/// Options which influence how configuration is expanded into EndpointSlice
/// objects.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[cfg_attr(feature = "clap", command(next_help_heading = "Expand Options"))]
#[serde(rename_all = "camelCase")]
pub struct ExpandOptions {
    /// What to do with optional fields which are present, but wrongly shaped.
    #[cfg_attr(
        feature = "clap",
        arg(
            long,
            env = "ENDPOINTSLICE_ON_SHAPE_MISMATCH",
            value_enum,
            default_value_t = ShapeMismatchPolicy::Skip
        )
    )]
    #[serde(default)]
    pub on_shape_mismatch: ShapeMismatchPolicy,
}

impl ExpandOptions {
    pub fn with_shape_mismatch_policy(mut self, policy: ShapeMismatchPolicy) -> Self {
        self.on_shape_mismatch = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_to_skip() {
        assert_eq!(
            ExpandOptions::default().on_shape_mismatch,
            ShapeMismatchPolicy::Skip
        );
    }

    #[rstest]
    #[case(r#"{}"#, ShapeMismatchPolicy::Skip)]
    #[case(r#"{"onShapeMismatch": "skip"}"#, ShapeMismatchPolicy::Skip)]
    #[case(r#"{"onShapeMismatch": "fail"}"#, ShapeMismatchPolicy::Fail)]
    fn deserialize(#[case] input: &str, #[case] expected: ShapeMismatchPolicy) {
        let options: ExpandOptions = serde_json::from_str(input).expect("options must deserialize");
        assert_eq!(options.on_shape_mismatch, expected);
    }

    #[rstest]
    #[case("skip", ShapeMismatchPolicy::Skip)]
    #[case("fail", ShapeMismatchPolicy::Fail)]
    fn parse_policy(#[case] input: &str, #[case] expected: ShapeMismatchPolicy) {
        let policy: ShapeMismatchPolicy = input.parse().expect("policy must parse");
        assert_eq!(policy, expected);
        assert_eq!(policy.to_string(), input);
    }
}
