use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use storage::Database;
use storage::gateway::SystemClock;
use storage::repository::segment::SegmentRepository;
use storage::repository::user::UserRepository;
use storage::services::{ChallengeService, SchedulerConfig};
use strava::{DEFAULT_BASE_URL, StravaClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "bestrida")]
#[command(about = "Segment challenge maintenance tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "STRAVA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    strava_base_url: String,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Settle every challenge whose window has elapsed, once
    Sweep,
    /// Fetch one participant's qualifying effort
    Ingest {
        #[arg(long)]
        challenge: Uuid,

        #[arg(long)]
        athlete: i64,
    },
    /// Resolve a challenge with the efforts already on record
    Resolve {
        #[arg(long)]
        challenge: Uuid,
    },
    /// Register (or refresh) the athlete owning an access token
    RegisterUser {
        #[arg(long)]
        token: String,
    },
    /// Fetch a segment from Strava into the local cache
    RefreshSegment {
        #[arg(long)]
        segment: i64,

        #[arg(long, env = "STRAVA_ACCESS_TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("bestrida={0},strava={0},storage={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::new(&cli.database_url)
        .await
        .context("Failed to connect to database")?;
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;

    let client = StravaClient::new(&cli.strava_base_url).context("Invalid Strava base URL")?;

    match cli.command {
        Commands::Sweep => {
            let service = engine(db, client)?;
            let report = service.scheduler().sweep().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Ingest { challenge, athlete } => {
            let service = engine(db, client)?;
            let response = service.ingest_effort(challenge, athlete).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Resolve { challenge } => {
            let service = engine(db, client)?;
            let resolution = service.scheduler().resolve(challenge).await?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Commands::RegisterUser { token } => {
            let athlete = client
                .athlete(&token)
                .await
                .context("Failed to fetch authenticated athlete")?;
            let user = UserRepository::new(db.pool())
                .upsert(&athlete.into_upsert(token))
                .await?;
            tracing::info!(user_id = user.user_id, "Registered {}", user.full_name);
        }
        Commands::RefreshSegment { segment, token } => {
            let detailed = client
                .segment(&token, segment)
                .await
                .with_context(|| format!("Failed to fetch segment {}", segment))?;
            let cached = SegmentRepository::new(db.pool())
                .upsert(&detailed.into())
                .await?;
            tracing::info!(segment_id = cached.segment_id, "Cached segment {}", cached.name);
        }
    }

    Ok(())
}

fn engine(db: Database, client: StravaClient) -> Result<ChallengeService> {
    let offset_minutes: i32 = std::env::var("REFERENCE_UTC_OFFSET_MINUTES")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .context("REFERENCE_UTC_OFFSET_MINUTES must be a number of minutes")?;
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .context("REFERENCE_UTC_OFFSET_MINUTES is out of range")?;

    Ok(ChallengeService::with_database(
        db,
        Arc::new(client),
        Arc::new(SystemClock),
        SchedulerConfig::default(),
        offset,
    ))
}
