//! Structured error types shared across SDG crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SdgError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, counters, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the SDG randomness engine.
///
/// Variant families map onto the platform's error taxonomy: `Counter` and
/// `Derivation` are fatal at the call site, `Integrity` is never silently
/// downgraded, `Budget` severity is policy-controlled, and `Audit`/`Serde`
/// cover the ledger and artifact surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SdgError {
    /// Key-derivation input errors (malformed digests, bad encodings).
    #[error("derivation error: {0}")]
    Derivation(ErrorInfo),
    /// Counter-space errors, including the fatal overflow case.
    #[error("counter error: {0}")]
    Counter(ErrorInfo),
    /// Structural integrity violations (sub-key collisions, bad ranges).
    #[error("integrity error: {0}")]
    Integrity(ErrorInfo),
    /// Substream addressing errors (unknown families, bad keys).
    #[error("substream error: {0}")]
    Substream(ErrorInfo),
    /// Draw-budget violations from bounded retry loops.
    #[error("budget error: {0}")]
    Budget(ErrorInfo),
    /// Audit ledger errors (identity mismatches, ordering violations).
    #[error("audit error: {0}")]
    Audit(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SdgError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SdgError::Derivation(info)
            | SdgError::Counter(info)
            | SdgError::Integrity(info)
            | SdgError::Substream(info)
            | SdgError::Budget(info)
            | SdgError::Audit(info)
            | SdgError::Serde(info) => info,
        }
    }
}
