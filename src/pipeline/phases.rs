//! The dependency-ordered load phases.
//!
//! Entities are written strictly leaves-first: natural-key entities, then
//! their first-level dependents, then campaigns, then the event facts. Each
//! phase may only reference surrogate ids produced by earlier phases, and the
//! order is an explicit constant rather than an accident of source layout.

use super::resolver::NaturalKeyResolver;
use super::skip::SkipLog;
use super::LoadSummary;
use crate::error::Result;
use crate::sources::SourceBatch;
use crate::targeting::{self, CountryVocabulary};
use rusqlite::{params, Transaction};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// One ordered unit of the load, bounded by the entities it may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Advertisers,
    Interests,
    Users,
    UserInterests,
    Campaigns,
    Events,
}

impl Phase {
    /// The fixed dependency order. Every phase references only surrogate ids
    /// produced by phases earlier in this list.
    pub const ORDER: [Phase; 6] = [
        Phase::Advertisers,
        Phase::Interests,
        Phase::Users,
        Phase::UserInterests,
        Phase::Campaigns,
        Phase::Events,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Advertisers => "advertisers",
            Phase::Interests => "interests",
            Phase::Users => "users",
            Phase::UserInterests => "user_interests",
            Phase::Campaigns => "campaigns",
            Phase::Events => "events",
        }
    }
}

/// Mutable state threaded through the phases of one run: the ambient
/// transaction, the source batch, and the id mappings built so far.
pub struct LoadContext<'a> {
    tx: &'a Transaction<'a>,
    batch: &'a SourceBatch,
    vocab: CountryVocabulary,
    advertisers: HashMap<String, i64>,
    interests: HashMap<String, i64>,
    campaigns: HashMap<String, i64>,
    skips: SkipLog,
    summary: LoadSummary,
}

impl<'a> LoadContext<'a> {
    pub fn new(
        tx: &'a Transaction<'a>,
        batch: &'a SourceBatch,
        vocab: CountryVocabulary,
        max_skip_reasons: usize,
    ) -> Self {
        let summary = LoadSummary {
            events_read: batch.events.len() as u64,
            users_read: batch.users.len() as u64,
            campaigns_read: batch.campaigns.len() as u64,
            ..LoadSummary::default()
        };
        Self {
            tx,
            batch,
            vocab,
            advertisers: HashMap::new(),
            interests: HashMap::new(),
            campaigns: HashMap::new(),
            skips: SkipLog::new(max_skip_reasons),
            summary,
        }
    }

    pub fn execute(&mut self, phase: Phase) -> Result<()> {
        info!(phase = phase.name(), "Executing load phase");
        match phase {
            Phase::Advertisers => self.load_advertisers(),
            Phase::Interests => self.load_interests(),
            Phase::Users => self.load_users(),
            Phase::UserInterests => self.load_user_interests(),
            Phase::Campaigns => self.load_campaigns(),
            Phase::Events => self.load_events(),
        }
    }

    /// Advertiser names appear in both the event and campaign sources;
    /// dedupe across both before resolving.
    fn load_advertisers(&mut self) -> Result<()> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        names.extend(
            self.batch
                .events
                .iter()
                .map(|e| e.advertiser_name.trim().to_string())
                .filter(|n| !n.is_empty()),
        );
        names.extend(
            self.batch
                .campaigns
                .iter()
                .map(|c| c.advertiser_name.trim().to_string())
                .filter(|n| !n.is_empty()),
        );

        let resolved = NaturalKeyResolver::new(self.tx).advertisers(&names)?;
        self.summary.advertisers_inserted = resolved.inserted;
        self.advertisers = resolved.map;
        Ok(())
    }

    /// Interest tags come from user profiles and from parsed campaign
    /// descriptors.
    fn load_interests(&mut self) -> Result<()> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for user in &self.batch.users {
            names.extend(targeting::split_interest_list(&user.interests));
        }
        for campaign in &self.batch.campaigns {
            names.extend(targeting::parse(&campaign.targeting_criteria, &self.vocab).interests);
        }

        let resolved = NaturalKeyResolver::new(self.tx).interests(&names)?;
        self.summary.interests_inserted = resolved.inserted;
        self.interests = resolved.map;
        Ok(())
    }

    /// Users carry their own natural id; re-inserting an existing id is a
    /// no-op.
    fn load_users(&mut self) -> Result<()> {
        let mut stmt = self.tx.prepare(
            "INSERT OR IGNORE INTO Users (UserID, Age, Gender, Location, SignupDate) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for user in &self.batch.users {
            self.summary.users_inserted += stmt.execute(params![
                user.user_id,
                user.age,
                user.gender,
                user.location,
                user.signup_date.to_string(),
            ])? as u64;
        }
        Ok(())
    }

    fn load_user_interests(&mut self) -> Result<()> {
        let mut stmt = self.tx.prepare(
            "INSERT OR IGNORE INTO UserInterests (UserID, InterestID) VALUES (?1, ?2)",
        )?;
        for user in &self.batch.users {
            for tag in targeting::split_interest_list(&user.interests) {
                // Interests were collected from this same column one phase
                // earlier, so the mapping always has the tag.
                match self.interests.get(&tag) {
                    Some(interest_id) => {
                        self.summary.user_interests_inserted +=
                            stmt.execute(params![user.user_id, interest_id])? as u64;
                    }
                    None => debug!(user = user.user_id, %tag, "Interest missing from mapping"),
                }
            }
        }
        Ok(())
    }

    /// Campaigns are inserted one row at a time: the generated id must be
    /// captured immediately to resolve event foreign keys later, and that
    /// campaign's interest links go in right behind it.
    fn load_campaigns(&mut self) -> Result<()> {
        let mut insert_campaign = self.tx.prepare(
            "INSERT INTO Campaigns (\
                 AdvertiserID, CampaignName, CampaignStartDate, CampaignEndDate, \
                 Budget, RemainingBudget, TargetingAgeMin, TargetingAgeMax, \
                 TargetingCountry, AdSlotSize\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        let mut insert_link = self.tx.prepare(
            "INSERT OR IGNORE INTO CampaignInterests (CampaignID, InterestID) VALUES (?1, ?2)",
        )?;

        for campaign in &self.batch.campaigns {
            let advertiser_id = match self.advertisers.get(campaign.advertiser_name.trim()) {
                Some(id) => *id,
                None => {
                    self.skips.on_unresolved(
                        Phase::Campaigns,
                        campaign.campaign_name.clone(),
                        format!("unknown advertiser '{}'", campaign.advertiser_name),
                    );
                    continue;
                }
            };

            let parsed = targeting::parse(&campaign.targeting_criteria, &self.vocab);
            insert_campaign.execute(params![
                advertiser_id,
                campaign.campaign_name,
                campaign.campaign_start_date.to_string(),
                campaign.campaign_end_date.to_string(),
                campaign.budget,
                campaign.remaining_budget,
                parsed.age_min,
                parsed.age_max,
                parsed.country,
                campaign.ad_slot_size,
            ])?;
            let campaign_id = self.tx.last_insert_rowid();
            self.summary.campaigns_inserted += 1;
            self.campaigns
                .insert(campaign.campaign_name.clone(), campaign_id);

            for tag in &parsed.interests {
                match self.interests.get(tag) {
                    Some(interest_id) => {
                        self.summary.campaign_interests_inserted +=
                            insert_link.execute(params![campaign_id, interest_id])? as u64;
                    }
                    None => debug!(campaign = %campaign.campaign_name, %tag, "Interest missing from mapping"),
                }
            }
        }
        Ok(())
    }

    /// Events resolve their campaign through the name-to-id map built during
    /// this run's Campaigns phase; a miss diverts the row to the skip log.
    fn load_events(&mut self) -> Result<()> {
        let mut stmt = self.tx.prepare(
            "INSERT INTO AdEvents (\
                 EventID, CampaignID, UserID, Device, Location, Timestamp, \
                 BidAmount, AdCost, AdRevenue, WasClicked, ClickTimestamp\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for event in &self.batch.events {
            let campaign_id = match self.campaigns.get(&event.campaign_name) {
                Some(id) => *id,
                None => {
                    self.skips.on_unresolved(
                        Phase::Events,
                        event.event_id.to_string(),
                        format!("unknown campaign '{}'", event.campaign_name),
                    );
                    continue;
                }
            };

            stmt.execute(params![
                event.event_id,
                campaign_id,
                event.user_id,
                event.device,
                event.location,
                event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                event.bid_amount,
                event.ad_cost,
                event.ad_revenue,
                event.was_clicked,
                event
                    .click_timestamp
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            ])?;
            self.summary.events_inserted += 1;
        }
        Ok(())
    }

    /// Folds the skip log into the summary, ending the run's borrow of the
    /// transaction.
    pub fn into_summary(self) -> LoadSummary {
        let mut summary = self.summary;
        summary.campaigns_skipped = self.skips.total_for(Phase::Campaigns);
        summary.events_skipped = self.skips.total_for(Phase::Events);
        summary.skipped = self.skips.total();
        summary.skip_reasons = self.skips.into_records();
        summary
    }
}
