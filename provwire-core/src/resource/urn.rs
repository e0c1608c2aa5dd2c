use serde::{Deserialize, Serialize};
use std::fmt;

const URN_PREFIX: &str = "urn:pulumi:";
const LEGACY_URN_PREFIX: &str = "urn:lumi:";
const URN_SEPARATOR: &str = "::";

/// Resource reference identifier, e.g. `urn:pulumi:dev::web::aws:s3/bucket:Bucket::site`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(value: impl Into<String>) -> Self {
        Urn(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for URNs minted before the `urn:pulumi:` scheme.
    pub fn is_legacy(&self) -> bool {
        self.0.starts_with(LEGACY_URN_PREFIX)
    }

    /// Checks the prefix and that the body has at least four non-empty
    /// `::`-separated segments.
    pub fn is_valid(&self) -> bool {
        let body = self
            .0
            .strip_prefix(URN_PREFIX)
            .or_else(|| self.0.strip_prefix(LEGACY_URN_PREFIX));
        match body {
            Some(body) => {
                let segments: Vec<&str> = body.split(URN_SEPARATOR).collect();
                segments.len() >= 4 && segments.iter().all(|s| !s.is_empty())
            }
            None => false,
        }
    }

    /// Resource name, the last segment.
    pub fn name(&self) -> Option<&str> {
        if !self.is_valid() {
            return None;
        }
        self.0.rsplit(URN_SEPARATOR).next()
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Urn {
    fn from(value: &str) -> Self {
        Urn::new(value)
    }
}

impl From<String> for Urn {
    fn from(value: String) -> Self {
        Urn(value)
    }
}

/// Provider-assigned identifier of a created resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        ResourceId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        ResourceId::new(value)
    }
}

/// A property value that points at another resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceReference {
    pub urn: Urn,
}

impl ResourceReference {
    pub fn new(urn: impl Into<Urn>) -> Self {
        ResourceReference { urn: urn.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urns() {
        let urn = Urn::from("urn:pulumi:dev::web::aws:s3/bucket:Bucket::site");
        assert!(urn.is_valid());
        assert!(!urn.is_legacy());
        assert_eq!(urn.name(), Some("site"));

        let legacy = Urn::from("urn:lumi:prod::infra::aws:ec2/instance:Instance::db");
        assert!(legacy.is_valid());
        assert!(legacy.is_legacy());
        assert_eq!(legacy.name(), Some("db"));
    }

    #[test]
    fn test_malformed_urns() {
        assert!(!Urn::from("site").is_valid());
        assert!(!Urn::from("urn:pulumi:dev::web::type").is_valid());
        assert!(!Urn::from("urn:pulumi:dev::::type::name").is_valid());
        assert!(!Urn::from("urn:other:dev::web::type::name").is_valid());
        assert_eq!(Urn::from("site").name(), None);
    }

    #[test]
    fn test_urn_serializes_as_string() {
        let urn = Urn::from("urn:pulumi:dev::web::t::n");
        assert_eq!(serde_json::to_string(&urn).unwrap(), "\"urn:pulumi:dev::web::t::n\"");
    }
}
