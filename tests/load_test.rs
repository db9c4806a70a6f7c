use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::Result;

use ad_loader::config::{Config, ReloadPolicy};
use ad_loader::error::LoaderError;
use ad_loader::pipeline::{Coordinator, LoadSummary};
use ad_loader::sources;
use ad_loader::store::Store;

fn event_row(event_id: i64, campaign: &str) -> String {
    format!(
        "{event_id},Acme,{campaign},2024-03-01,2024-05-31,Age 18-35,sports,USA,300x250,\
         42,mobile,Seattle,2024-03-02 12:30:00,1.25,0.90,true,,2.10,10000,8000"
    )
}

/// Writes the three source CSVs (one advertiser "Acme", one campaign
/// "Spring24", one user) plus the given event rows, and returns a config
/// pointing at them.
fn write_sources(dir: &Path, event_rows: &[String]) -> Config {
    let events_path = dir.join("events.csv");
    let mut events = String::from(
        "EventID,AdvertiserName,CampaignName,CampaignStartDate,CampaignEndDate,\
         TargetingAge,TargetingInterest,TargetingCountry,AdSlotSize,UserID,Device,\
         Location,Timestamp,BidAmount,AdCost,WasClicked,ClickTimestamp,AdRevenue,\
         Budget,RemainingBudget\n",
    );
    for row in event_rows {
        events.push_str(row);
        events.push('\n');
    }
    fs::write(&events_path, events).unwrap();

    let users_path = dir.join("users.csv");
    fs::write(
        &users_path,
        "UserID,Age,Gender,Location,Interests,SignupDate\n\
         42,29,F,Seattle,sports,2023-11-05\n",
    )
    .unwrap();

    let campaigns_path = dir.join("campaigns.csv");
    fs::write(
        &campaigns_path,
        "AdvertiserName,CampaignName,CampaignStartDate,CampaignEndDate,Budget,RemainingBudget,TargetingCriteria,AdSlotSize\n\
         Acme,Spring24,2024-03-01,2024-05-31,10000,8000,\"Age 18-35, USA, sports\",300x250\n",
    )
    .unwrap();

    let mut config = Config::default();
    config.sources.events = events_path;
    config.sources.users = users_path;
    config.sources.campaigns = campaigns_path;
    config.store.path = dir.join("store.db");
    config
}

fn run_load(config: &Config) -> (std::result::Result<LoadSummary, LoaderError>, Store) {
    let batch = sources::read_batch(&config.sources).unwrap();
    let store = Store::open(&config.store.path).unwrap();
    store.run_migrations().unwrap();
    let mut coordinator = Coordinator::new(store, config);
    let result = coordinator.run(&batch);
    (result, coordinator.into_store())
}

fn count(store: &mut Store, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
}

#[test]
fn end_to_end_load_with_one_unresolvable_event() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_sources(
        dir.path(),
        &[event_row(5001, "Spring24"), event_row(5002, "Unknown")],
    );

    let (result, mut store) = run_load(&config);
    let summary = result?;

    assert_eq!(summary.advertisers_inserted, 1);
    assert_eq!(summary.interests_inserted, 1);
    assert_eq!(summary.users_inserted, 1);
    assert_eq!(summary.user_interests_inserted, 1);
    assert_eq!(summary.campaigns_inserted, 1);
    assert_eq!(summary.campaign_interests_inserted, 1);
    assert_eq!(summary.events_inserted, 1);
    assert_eq!(summary.events_skipped, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.events_read, 2);
    assert_eq!(
        summary.events_inserted + summary.events_skipped,
        summary.events_read
    );
    assert_eq!(summary.skip_reasons.len(), 1);
    assert_eq!(summary.skip_reasons[0].natural_id, "5002");
    assert!(summary.skip_reasons[0].reason.contains("Unknown"));

    // The loaded event references the campaign created in the same run.
    let (event_campaign, stored_campaign): (i64, i64) = store.connection().query_row(
        "SELECT e.CampaignID, c.CampaignID FROM AdEvents e \
         JOIN Campaigns c ON e.CampaignID = c.CampaignID WHERE e.EventID = 5001",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    assert_eq!(event_campaign, stored_campaign);

    // Parsed targeting landed on the campaign row.
    let (age_min, age_max, country): (i64, i64, String) = store.connection().query_row(
        "SELECT TargetingAgeMin, TargetingAgeMax, TargetingCountry \
         FROM Campaigns WHERE CampaignName = 'Spring24'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    assert_eq!((age_min, age_max), (18, 35));
    assert_eq!(country, "USA");

    assert_eq!(count(&mut store, "AdEvents"), 1);
    Ok(())
}

#[test]
fn campaign_with_unresolvable_advertiser_is_skipped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_sources(
        dir.path(),
        &[event_row(5001, "Spring24"), event_row(5002, "Orphan")],
    );
    // A second campaign with a blank advertiser name; its events then miss
    // the campaign map too.
    fs::write(
        &config.sources.campaigns,
        "AdvertiserName,CampaignName,CampaignStartDate,CampaignEndDate,Budget,RemainingBudget,TargetingCriteria,AdSlotSize\n\
         Acme,Spring24,2024-03-01,2024-05-31,10000,8000,\"Age 18-35, USA, sports\",300x250\n\
         ,Orphan,2024-03-01,2024-05-31,5000,5000,\"Age 18-35, UK, music\",300x250\n",
    )?;

    let (result, mut store) = run_load(&config);
    let summary = result?;

    assert_eq!(summary.campaigns_inserted, 1);
    assert_eq!(summary.campaigns_skipped, 1);
    assert_eq!(summary.events_inserted, 1);
    assert_eq!(summary.events_skipped, 1);
    assert_eq!(summary.skipped, 2);
    // The event-level consistency holds even with campaign-phase skips in
    // the same run.
    assert_eq!(
        summary.events_inserted + summary.events_skipped,
        summary.events_read
    );

    assert_eq!(count(&mut store, "Campaigns"), 1);
    assert_eq!(count(&mut store, "AdEvents"), 1);
    Ok(())
}

#[test]
fn integrity_violation_rolls_back_the_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    // Two events with the same natural id both resolve to Spring24; the
    // second insert violates the EventID primary key during the final phase.
    let config = write_sources(
        dir.path(),
        &[event_row(5001, "Spring24"), event_row(5001, "Spring24")],
    );

    let (result, mut store) = run_load(&config);
    assert!(matches!(result, Err(LoaderError::Database(_))));

    for table in [
        "Advertisers",
        "Interests",
        "Users",
        "UserInterests",
        "Campaigns",
        "CampaignInterests",
        "AdEvents",
    ] {
        assert_eq!(count(&mut store, table), 0, "{table} should be empty");
    }
}

#[test]
fn rerun_in_append_mode_duplicates_campaigns_only() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_sources(dir.path(), &[event_row(5001, "Spring24")]);
    let (first, _) = run_load(&config);
    first?;

    // A later batch for the same campaign name, with fresh event ids.
    let config = write_sources(dir.path(), &[event_row(6001, "Spring24")]);
    let (second, mut store) = run_load(&config);
    let summary = second?;

    // Natural-key entities are idempotent; campaigns are not.
    assert_eq!(summary.advertisers_inserted, 0);
    assert_eq!(summary.interests_inserted, 0);
    assert_eq!(summary.users_inserted, 0);
    assert_eq!(summary.campaigns_inserted, 1);
    assert_eq!(count(&mut store, "Advertisers"), 1);
    assert_eq!(count(&mut store, "Campaigns"), 2);
    assert_eq!(count(&mut store, "AdEvents"), 2);
    Ok(())
}

#[test]
fn abort_policy_refuses_an_already_loaded_batch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_sources(dir.path(), &[event_row(5001, "Spring24")]);
    let (first, _) = run_load(&config);
    first?;

    let mut config = write_sources(dir.path(), &[event_row(6001, "Spring24")]);
    config.load.on_existing_campaigns = ReloadPolicy::Abort;
    let (second, mut store) = run_load(&config);
    assert!(matches!(second, Err(LoaderError::BatchAlreadyLoaded(_))));

    // Nothing from the refused batch persists.
    assert_eq!(count(&mut store, "Campaigns"), 1);
    assert_eq!(count(&mut store, "AdEvents"), 1);
    Ok(())
}

#[test]
fn cancellation_rolls_back_the_in_flight_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_sources(dir.path(), &[event_row(5001, "Spring24")]);

    let batch = sources::read_batch(&config.sources)?;
    let store = Store::open(&config.store.path)?;
    store.run_migrations()?;
    let mut coordinator = Coordinator::new(store, &config);
    coordinator.cancel_flag().store(true, Ordering::Relaxed);

    let result = coordinator.run(&batch);
    assert!(matches!(result, Err(LoaderError::Cancelled)));

    let mut store = coordinator.into_store();
    assert_eq!(count(&mut store, "Advertisers"), 0);
    assert_eq!(count(&mut store, "AdEvents"), 0);
    Ok(())
}
