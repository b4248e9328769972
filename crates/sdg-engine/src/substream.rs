//! Substream identity, canonicalization, and the collision-checked registry.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use sdg_core::errors::ErrorInfo;
use sdg_core::{sub_key, RootKey, SdgError, SubKey};

use crate::draw::DrawState;

/// One primitive component of a substream's entity identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Unsigned integer identifier (merchant id, site id, ...).
    U64(u64),
    /// Signed integer identifier (offsets, deltas).
    I64(i64),
    /// String identifier (timezone name, campaign code).
    Str(String),
}

impl EntityKey {
    // Type-tagged rendering; '|' and '\' in strings are escaped so the
    // rendered label is injective over key sequences.
    fn render_into(&self, out: &mut String) {
        match self {
            EntityKey::U64(value) => {
                let _ = write!(out, "u:{value}");
            }
            EntityKey::I64(value) => {
                let _ = write!(out, "i:{value}");
            }
            EntityKey::Str(value) => {
                out.push_str("s:");
                for ch in value.chars() {
                    if ch == '|' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
            }
        }
    }
}

impl From<u64> for EntityKey {
    fn from(value: u64) -> Self {
        EntityKey::U64(value)
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        EntityKey::I64(value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::Str(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        EntityKey::Str(value)
    }
}

fn check_name(field: &str, value: &str) -> Result<(), SdgError> {
    if value.is_empty() {
        return Err(SdgError::Substream(
            ErrorInfo::new("key-name", "module and label must be non-empty")
                .with_context("field", field.to_string()),
        ));
    }
    if value.chars().any(|ch| ch == '|' || ch.is_control()) {
        return Err(SdgError::Substream(
            ErrorInfo::new("key-name", "module and label must not contain '|' or controls")
                .with_context("field", field.to_string())
                .with_context("value", value.to_string()),
        ));
    }
    Ok(())
}

/// Caller-supplied identity of one logical independent stream.
///
/// Entity keys are folded in exactly the order supplied: two calls differing
/// only in entity-key order address two distinct substreams. Callers that
/// need one logical stream per entity set must present a total, reproducible
/// order (e.g. ascending merchant id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstreamKey {
    module: String,
    label: String,
    entity_keys: Vec<EntityKey>,
}

impl SubstreamKey {
    /// Builds a substream key, validating the module and label names.
    pub fn new(
        module: impl Into<String>,
        label: impl Into<String>,
        entity_keys: Vec<EntityKey>,
    ) -> Result<Self, SdgError> {
        let module = module.into();
        let label = label.into();
        check_name("module", &module)?;
        check_name("label", &label)?;
        Ok(Self {
            module,
            label,
            entity_keys,
        })
    }

    /// Module that owns the substream.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Family label, without entity keys.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Entity keys in caller-supplied order.
    pub fn entity_keys(&self) -> &[EntityKey] {
        &self.entity_keys
    }

    /// Fully rendered substream label: the family label followed by each
    /// entity key, '|'-separated. This string plus the module is the exact
    /// input to sub-key derivation and travels verbatim on audit events.
    pub fn substream_label(&self) -> String {
        let mut out = self.label.clone();
        for key in &self.entity_keys {
            out.push('|');
            key.render_into(&mut out);
        }
        out
    }
}

#[derive(Debug)]
pub(crate) struct SubstreamSlot {
    pub(crate) sub_key: SubKey,
    pub(crate) state: Mutex<DrawState>,
}

#[derive(Default)]
struct RegistryInner {
    by_label: HashMap<(String, String), Arc<SubstreamSlot>>,
    by_sub_key: HashMap<SubKey, (String, String)>,
}

/// Deterministically splits the run's root key into independent substreams.
///
/// `derive` is idempotent within a run: a repeat call with the same key
/// returns the current live substream, never resetting its counter, so
/// repeated lookups never replay already-consumed randomness.
pub struct SubstreamRegistry {
    root: RootKey,
    inner: Mutex<RegistryInner>,
}

impl SubstreamRegistry {
    /// Creates an empty registry over the run's root key.
    pub fn new(root: RootKey) -> Self {
        Self {
            root,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub(crate) fn derive_slot(
        &self,
        key: &SubstreamKey,
    ) -> Result<(Arc<SubstreamSlot>, String), SdgError> {
        let substream_label = key.substream_label();
        let stream_id = (key.module().to_string(), substream_label.clone());
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.by_label.get(&stream_id) {
            return Ok((Arc::clone(slot), substream_label));
        }
        let derived = sub_key(&self.root, key.module(), &substream_label);
        if let Some((prior_module, prior_label)) = inner.by_sub_key.get(&derived) {
            // Distinct canonical keys deriving the same sub-key would corrupt
            // statistical independence; fail the run, never tolerate.
            return Err(SdgError::Integrity(
                ErrorInfo::new("subkey-collision", "two distinct substream keys share a sub-key")
                    .with_context("sub_key", derived.to_hex())
                    .with_context("first", format!("{prior_module}/{prior_label}"))
                    .with_context("second", format!("{}/{}", stream_id.0, stream_id.1)),
            ));
        }
        let slot = Arc::new(SubstreamSlot {
            sub_key: derived,
            state: Mutex::new(DrawState::new()),
        });
        inner.by_sub_key.insert(derived, stream_id.clone());
        inner.by_label.insert(stream_id, Arc::clone(&slot));
        Ok((slot, substream_label))
    }

    /// Number of live substreams derived so far.
    pub fn len(&self) -> usize {
        self.inner.lock().by_label.len()
    }

    /// Whether no substream has been derived yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().by_label.is_empty()
    }
}
