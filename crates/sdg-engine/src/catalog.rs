//! Enumerated catalog of known substream families.
//!
//! Stages register their (module, label) families up front instead of
//! threading ambient string constants through call chains; derivation against
//! an unlisted family fails at the call site.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sdg_core::errors::ErrorInfo;
use sdg_core::SdgError;

/// One known substream family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstreamFamily {
    /// Module that owns the family.
    pub module: String,
    /// Family label, without entity keys.
    pub label: String,
    /// Optional per-substream draw cap, surfaced to validation policies.
    #[serde(default)]
    pub draw_budget: Option<u64>,
}

impl SubstreamFamily {
    /// Creates a family without a draw budget.
    pub fn new(module: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            label: label.into(),
            draw_budget: None,
        }
    }

    /// Sets the per-substream draw cap.
    pub fn with_draw_budget(mut self, cap: u64) -> Self {
        self.draw_budget = Some(cap);
        self
    }
}

/// Catalog of every substream family a run is allowed to derive.
#[derive(Debug, Clone, Default)]
pub struct FamilyCatalog {
    families: BTreeMap<(String, String), SubstreamFamily>,
}

impl FamilyCatalog {
    /// Builds a catalog, rejecting duplicate (module, label) pairs.
    pub fn new(families: Vec<SubstreamFamily>) -> Result<Self, SdgError> {
        let mut map = BTreeMap::new();
        for family in families {
            let id = (family.module.clone(), family.label.clone());
            if map.insert(id.clone(), family).is_some() {
                return Err(SdgError::Substream(
                    ErrorInfo::new("duplicate-family", "substream family declared twice")
                        .with_context("module", id.0)
                        .with_context("label", id.1),
                ));
            }
        }
        Ok(Self { families: map })
    }

    /// Returns the family for (module, label), or an `unknown-family` error.
    pub fn ensure_known(&self, module: &str, label: &str) -> Result<&SubstreamFamily, SdgError> {
        self.families
            .get(&(module.to_string(), label.to_string()))
            .ok_or_else(|| {
                SdgError::Substream(
                    ErrorInfo::new("unknown-family", "substream family is not in the catalog")
                        .with_context("module", module.to_string())
                        .with_context("label", label.to_string())
                        .with_hint("declare the family in the run's catalog at startup"),
                )
            })
    }

    /// Iterates over the declared families in (module, label) order.
    pub fn families(&self) -> impl Iterator<Item = &SubstreamFamily> {
        self.families.values()
    }

    /// Family-level draw budgets keyed `module/label`, ready for a
    /// validation policy.
    pub fn draw_budgets(&self) -> BTreeMap<String, u64> {
        self.families
            .values()
            .filter_map(|family| {
                family
                    .draw_budget
                    .map(|cap| (format!("{}/{}", family.module, family.label), cap))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_families_are_rejected() {
        let err = FamilyCatalog::new(vec![
            SubstreamFamily::new("outlets", "hurdle"),
            SubstreamFamily::new("outlets", "hurdle"),
        ])
        .unwrap_err();
        assert_eq!(err.info().code, "duplicate-family");
    }

    #[test]
    fn budgets_surface_per_family() {
        let catalog = FamilyCatalog::new(vec![
            SubstreamFamily::new("outlets", "hurdle").with_draw_budget(128),
            SubstreamFamily::new("timing", "jitter"),
        ])
        .unwrap();
        let budgets = catalog.draw_budgets();
        assert_eq!(budgets.get("outlets/hurdle"), Some(&128));
        assert!(!budgets.contains_key("timing/jitter"));
    }
}
