#![deny(missing_docs)]
#![doc = "Substream derivation and draw engine for the SDG platform: the run context, the collision-checked substream registry, counter-space accounting, and bounded rejection-sampling episodes."]

pub mod catalog;
pub mod context;
pub mod draw;
pub mod episode;
pub mod substream;

pub use catalog::{FamilyCatalog, SubstreamFamily};
pub use context::RunContext;
pub use draw::{DrawDelta, SubstreamHandle};
pub use episode::{AttemptBudget, AttemptOutcome};
pub use substream::{EntityKey, SubstreamKey, SubstreamRegistry};
