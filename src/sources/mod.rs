//! Source file reading.
//!
//! Loads the three tabular exports into typed in-memory record sets. Only
//! type coercion happens here; referential checks belong to the load phases.

pub mod records;

use crate::config::SourcesConfig;
use crate::error::Result;
use std::path::Path;
use tracing::info;

pub use records::{CampaignRecord, EventRecord, UserRecord};

/// All source records for one loader run.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub events: Vec<EventRecord>,
    pub users: Vec<UserRecord>,
    pub campaigns: Vec<CampaignRecord>,
}

/// Reads every configured source file into one batch.
pub fn read_batch(sources: &SourcesConfig) -> Result<SourceBatch> {
    let events = read_events(&sources.events)?;
    let users = read_users(&sources.users)?;
    let campaigns = read_campaigns(&sources.campaigns)?;
    info!(
        events = events.len(),
        users = users.len(),
        campaigns = campaigns.len(),
        "Source files loaded"
    );
    Ok(SourceBatch {
        events,
        users,
        campaigns,
    })
}

/// Reads the ad-event export. The export's first line is a header row; it is
/// discarded and the remaining rows are bound by the fixed column positions.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<EventRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;
    let mut events = Vec::new();
    for result in rdr.records().skip(1) {
        let record = result?;
        events.push(record.deserialize(None)?);
    }
    Ok(events)
}

/// Reads the headered user profile export.
pub fn read_users<P: AsRef<Path>>(path: P) -> Result<Vec<UserRecord>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let mut users = Vec::new();
    for result in rdr.deserialize() {
        users.push(result?);
    }
    Ok(users)
}

/// Reads the headered campaign export.
pub fn read_campaigns<P: AsRef<Path>>(path: P) -> Result<Vec<CampaignRecord>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let mut campaigns = Vec::new();
    for result in rdr.deserialize() {
        campaigns.push(result?);
    }
    Ok(campaigns)
}
