use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::MarshalOptions;
use crate::error::ResolveError;
use crate::resource::{ResourceId, Urn};

/// Maps a resource reference to the identifier its provider assigned.
///
/// `Ok(None)` means the resource is known but has no identifier yet; the
/// marshaler then treats the reference as an unknown value.
pub trait UrnResolver: Send + Sync {
    fn resolve(&self, urn: &Urn, opts: &MarshalOptions) -> Result<Option<ResourceId>, ResolveError>;
}

impl fmt::Debug for dyn UrnResolver + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UrnResolver")
    }
}

/// Resolver backed by a fixed table of known resources.
#[derive(Debug, Default, Clone)]
pub struct TableResolver {
    entries: HashMap<Urn, Option<ResourceId>>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created resource.
    pub fn insert(&mut self, urn: impl Into<Urn>, id: impl Into<ResourceId>) {
        self.entries.insert(urn.into(), Some(id.into()));
    }

    /// Record a resource that exists in the plan but has not been created.
    pub fn insert_pending(&mut self, urn: impl Into<Urn>) {
        self.entries.insert(urn.into(), None);
    }
}

impl UrnResolver for TableResolver {
    fn resolve(&self, urn: &Urn, opts: &MarshalOptions) -> Result<Option<ResourceId>, ResolveError> {
        if !urn.is_valid() {
            return Err(ResolveError::MalformedUrn);
        }
        if urn.is_legacy() && !opts.old_urns {
            debug!("Rejecting legacy URN {}", urn);
            return Err(ResolveError::LegacyUrn);
        }
        self.entries
            .get(urn)
            .cloned()
            .ok_or(ResolveError::UnknownResource)
    }
}
