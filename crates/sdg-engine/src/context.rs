//! Per-run engine context.

use std::sync::Arc;

use sdg_core::{root_key, RunIdentity, SdgError};

use crate::catalog::FamilyCatalog;
use crate::draw::SubstreamHandle;
use crate::substream::{EntityKey, SubstreamKey, SubstreamRegistry};

/// Explicit per-run engine value; no ambient singleton exists.
///
/// Constructed once from the run's identity and the catalog of allowed
/// substream families, then passed by reference into every stage. The root
/// key is derived here and owned exclusively by this context.
pub struct RunContext {
    identity: Arc<RunIdentity>,
    catalog: FamilyCatalog,
    registry: SubstreamRegistry,
}

impl RunContext {
    /// Builds the run's engine from its identity and family catalog.
    pub fn new(identity: RunIdentity, catalog: FamilyCatalog) -> Self {
        let root = root_key(identity.seed, &identity.manifest_fingerprint);
        Self {
            identity: Arc::new(identity),
            catalog,
            registry: SubstreamRegistry::new(root),
        }
    }

    /// Identity of the run this context serves.
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Catalog of substream families this run may derive.
    pub fn catalog(&self) -> &FamilyCatalog {
        &self.catalog
    }

    /// Number of live substreams derived so far.
    pub fn substreams(&self) -> usize {
        self.registry.len()
    }

    /// Returns a handle to the (module, label, entity_keys) substream,
    /// creating it with a zero counter on first use.
    ///
    /// Idempotent within the run: repeat calls return the current live
    /// substream. The family must be declared in the catalog.
    pub fn derive_substream(
        &self,
        module: &str,
        label: &str,
        entity_keys: Vec<EntityKey>,
    ) -> Result<SubstreamHandle, SdgError> {
        self.catalog.ensure_known(module, label)?;
        let key = SubstreamKey::new(module, label, entity_keys)?;
        let (slot, substream_label) = self.registry.derive_slot(&key)?;
        Ok(SubstreamHandle::new(
            Arc::clone(&self.identity),
            Arc::from(module),
            Arc::from(substream_label.as_str()),
            slot,
        ))
    }
}
