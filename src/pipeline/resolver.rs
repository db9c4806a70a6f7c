//! Idempotent natural-key resolution.
//!
//! Advertisers and interests are identified by name across every source set.
//! Resolution inserts with `INSERT OR IGNORE`, then reads the authoritative
//! name-to-id mapping back from the store rather than trusting locally
//! generated ids, so repeated runs converge to the same mapping without
//! duplicate rows.

use crate::error::Result;
use rusqlite::{params, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// The mapping produced for one entity type, plus how many rows the run
/// actually created (pre-existing keys insert nothing).
#[derive(Debug)]
pub struct ResolvedEntities {
    pub map: HashMap<String, i64>,
    pub inserted: u64,
}

pub struct NaturalKeyResolver<'a> {
    tx: &'a Transaction<'a>,
}

impl<'a> NaturalKeyResolver<'a> {
    pub fn new(tx: &'a Transaction<'a>) -> Self {
        Self { tx }
    }

    pub fn advertisers(&self, names: &BTreeSet<String>) -> Result<ResolvedEntities> {
        self.resolve_or_create(
            "INSERT OR IGNORE INTO Advertisers (AdvertiserName) VALUES (?1)",
            "SELECT AdvertiserName, AdvertiserID FROM Advertisers",
            names,
        )
    }

    pub fn interests(&self, names: &BTreeSet<String>) -> Result<ResolvedEntities> {
        self.resolve_or_create(
            "INSERT OR IGNORE INTO Interests (Name) VALUES (?1)",
            "SELECT Name, InterestID FROM Interests",
            names,
        )
    }

    fn resolve_or_create(
        &self,
        insert_sql: &str,
        select_sql: &str,
        keys: &BTreeSet<String>,
    ) -> Result<ResolvedEntities> {
        let mut inserted = 0u64;
        {
            let mut stmt = self.tx.prepare(insert_sql)?;
            for key in keys {
                // OR IGNORE reports zero changed rows for an existing key.
                inserted += stmt.execute(params![key])? as u64;
            }
        }

        let mut stmt = self.tx.prepare(select_sql)?;
        let map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        debug!(keys = keys.len(), inserted, known = map.len(), "Resolved natural keys");
        Ok(ResolvedEntities { map, inserted })
    }
}
