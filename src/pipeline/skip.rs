//! Skip policy for fact records with unresolvable parent references.
//!
//! Skipping never raises and never touches the transaction outcome; the
//! accumulated records surface in the run summary.

use super::phases::Phase;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// One excluded record: which phase dropped it, its natural id, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkipRecord {
    pub phase: Phase,
    pub natural_id: String,
    pub reason: String,
}

/// Run-scoped accumulator of skipped records.
#[derive(Debug)]
pub struct SkipLog {
    max_reasons: usize,
    total: u64,
    totals_by_phase: HashMap<Phase, u64>,
    records: Vec<SkipRecord>,
}

impl SkipLog {
    pub fn new(max_reasons: usize) -> Self {
        Self {
            max_reasons,
            total: 0,
            totals_by_phase: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Records a fact record whose required foreign key could not be resolved.
    /// Every skip is counted, per phase and overall; only the first
    /// `max_reasons` keep a structured record for the summary.
    pub fn on_unresolved(
        &mut self,
        phase: Phase,
        natural_id: impl Into<String>,
        reason: impl Into<String>,
    ) {
        let natural_id = natural_id.into();
        let reason = reason.into();
        warn!(phase = phase.name(), natural_id = %natural_id, %reason, "Skipping record");
        self.total += 1;
        *self.totals_by_phase.entry(phase).or_insert(0) += 1;
        if self.records.len() < self.max_reasons {
            self.records.push(SkipRecord {
                phase,
                natural_id,
                reason,
            });
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_for(&self, phase: Phase) -> u64 {
        self.totals_by_phase.get(&phase).copied().unwrap_or(0)
    }

    pub fn into_records(self) -> Vec<SkipRecord> {
        self.records
    }
}
