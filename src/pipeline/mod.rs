//! The multi-phase load pipeline: natural-key resolution, dependency-ordered
//! inserts, skip accounting, and the single transaction around all of it.

pub mod phases;
pub mod resolver;
pub mod runner;
pub mod skip;

use serde::Serialize;
use skip::SkipRecord;

pub use runner::Coordinator;

/// What one run did: rows inserted per table, rows read per source, and the
/// records the skip policy excluded. Serializable for machine-readable
/// reporting.
#[derive(Debug, Default, Serialize)]
pub struct LoadSummary {
    pub advertisers_inserted: u64,
    pub interests_inserted: u64,
    pub users_inserted: u64,
    pub user_interests_inserted: u64,
    pub campaigns_inserted: u64,
    pub campaign_interests_inserted: u64,
    pub events_inserted: u64,
    pub events_read: u64,
    pub users_read: u64,
    pub campaigns_read: u64,
    /// Campaign rows excluded for an unresolvable advertiser.
    pub campaigns_skipped: u64,
    /// Event rows excluded for an unresolvable campaign. Always satisfies
    /// `events_inserted + events_skipped == events_read`.
    pub events_skipped: u64,
    /// All skipped records across every phase.
    pub skipped: u64,
    pub skip_reasons: Vec<SkipRecord>,
}
