//! Coarse per-substream rollups for fast sanity audits.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::event::RngEvent;

/// Per-substream rollup derived from an event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Module that owns the substream.
    pub module: String,
    /// Fully rendered substream label.
    pub substream_label: String,
    /// Total draws across all episodes.
    pub draws_total: u64,
    /// Total blocks across all episodes.
    pub blocks_total: u64,
    /// Number of flushed episodes.
    pub events_total: u64,
}

/// Aggregates an event stream into per-substream rollups, ordered by
/// (module, substream_label).
pub fn summarize(events: &[RngEvent]) -> Vec<TraceSummary> {
    let mut totals: BTreeMap<(String, String), (u64, u64, u64)> = BTreeMap::new();
    for event in events {
        let entry = totals
            .entry((event.module.clone(), event.substream_label.clone()))
            .or_default();
        entry.0 = entry.0.saturating_add(event.draws);
        entry.1 = entry.1.saturating_add(event.blocks);
        entry.2 += 1;
    }
    totals
        .into_iter()
        .map(
            |((module, substream_label), (draws_total, blocks_total, events_total))| {
                TraceSummary {
                    module,
                    substream_label,
                    draws_total,
                    blocks_total,
                    events_total,
                }
            },
        )
        .collect()
}

/// Writes rollups to a CSV file.
pub fn write_csv<P: AsRef<Path>>(summaries: &[TraceSummary], path: P) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "module,substream_label,draws_total,blocks_total,events_total")?;
    for summary in summaries {
        writeln!(
            file,
            "{},{},{},{},{}",
            summary.module,
            summary.substream_label,
            summary.draws_total,
            summary.blocks_total,
            summary.events_total
        )?;
    }
    Ok(())
}
