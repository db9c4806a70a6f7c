use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use ad_loader::config::Config;
use ad_loader::logging;
use ad_loader::pipeline::{Coordinator, LoadSummary};
use ad_loader::sources;
use ad_loader::store::Store;

#[derive(Parser)]
#[command(name = "ad_loader")]
#[command(about = "Ad-analytics batch ETL loader")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the target schema and exit
    InitDb {
        /// Override the store path from the config
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run the full batch load
    Load {
        /// Override the events CSV path from the config
        #[arg(long)]
        events: Option<PathBuf>,
        /// Override the users CSV path from the config
        #[arg(long)]
        users: Option<PathBuf>,
        /// Override the campaigns CSV path from the config
        #[arg(long)]
        campaigns: Option<PathBuf>,
        /// Override the store path from the config
        #[arg(long)]
        db: Option<PathBuf>,
        /// Print the run summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn print_summary(summary: &LoadSummary) {
    println!("\n📊 Load Summary:");
    println!("   Advertisers inserted: {}", summary.advertisers_inserted);
    println!("   Interests inserted: {}", summary.interests_inserted);
    println!(
        "   Users inserted: {} (of {} read)",
        summary.users_inserted, summary.users_read
    );
    println!(
        "   User interests inserted: {}",
        summary.user_interests_inserted
    );
    println!(
        "   Campaigns inserted: {} (of {} read)",
        summary.campaigns_inserted, summary.campaigns_read
    );
    println!(
        "   Campaign interests inserted: {}",
        summary.campaign_interests_inserted
    );
    println!(
        "   Events inserted: {} (of {} read)",
        summary.events_inserted, summary.events_read
    );
    println!("   Campaigns skipped: {}", summary.campaigns_skipped);
    println!("   Events skipped: {}", summary.events_skipped);
    println!("   Total skipped: {}", summary.skipped);

    if !summary.skip_reasons.is_empty() {
        println!("\n⚠️  Skipped records:");
        for skip in &summary.skip_reasons {
            println!(
                "   - [{}] {}: {}",
                skip.phase.name(),
                skip.natural_id,
                skip.reason
            );
        }
        let unlisted = summary.skipped - summary.skip_reasons.len() as u64;
        if unlisted > 0 {
            println!("   ... and {} more", unlisted);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::InitDb { db } => {
            if let Some(db) = db {
                config.store.path = db;
            }
            let store = Store::open(&config.store.path)?;
            store.run_migrations()?;
            println!("✅ Store schema ready at {}", config.store.path.display());
        }
        Commands::Load {
            events,
            users,
            campaigns,
            db,
            json,
        } => {
            if let Some(events) = events {
                config.sources.events = events;
            }
            if let Some(users) = users {
                config.sources.users = users;
            }
            if let Some(campaigns) = campaigns {
                config.sources.campaigns = campaigns;
            }
            if let Some(db) = db {
                config.store.path = db;
            }

            info!("Reading source files");
            let batch = sources::read_batch(&config.sources)?;

            let store = Store::open(&config.store.path)?;
            store.run_migrations()?;

            let mut coordinator = Coordinator::new(store, &config);
            match coordinator.run(&batch) {
                Ok(summary) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                    } else {
                        print_summary(&summary);
                        println!("\n✅ Load committed");
                    }
                }
                Err(e) => {
                    error!("Load failed: {}", e);
                    println!("❌ Load failed, store unchanged: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}
