use std::sync::Arc;

use anyhow::Context;
use storage::Database;
use storage::gateway::SystemClock;
use storage::services::ChallengeService;
use strava::StravaClient;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;
mod state;

use config::Config;
use features::{admin, challenges, segments, users};
use middleware::auth::ApiKeys;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::health,
        challenges::handlers::create_challenge,
        challenges::handlers::get_challenge,
        challenges::handlers::accept_challenge,
        challenges::handlers::decline_challenge,
        challenges::handlers::complete_challenge,
        challenges::handlers::ingest_effort,
        users::handlers::get_user,
        users::handlers::list_user_challenges,
        segments::handlers::get_segment,
        segments::handlers::refresh_segment,
        segments::handlers::list_athlete_efforts,
        admin::handlers::run_sweep,
    ),
    components(
        schemas(
            storage::dto::challenge::CreateChallengeRequest,
            storage::dto::challenge::IngestionResponse,
            storage::dto::user::UserProfileResponse,
            storage::models::Challenge,
            storage::models::ChallengeStatus,
            storage::models::Opponent,
            storage::models::Segment,
            storage::models::EffortSummary,
            storage::models::Friend,
            storage::models::UserSegment,
            storage::services::IngestOutcome,
            storage::services::Resolution,
            storage::services::SweepReport,
        )
    ),
    tags(
        (name = "challenges", description = "Challenge lifecycle endpoints"),
        (name = "users", description = "User profiles and challenge history"),
        (name = "segments", description = "Cached Strava segments"),
        (name = "admin", description = "Maintenance endpoints, API key required"),
        (name = "health", description = "Liveness probe"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Bestrida API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let strava = StravaClient::new(&config.strava_base_url).context("Invalid STRAVA_BASE_URL")?;
    if config.strava_access_token.is_none() {
        tracing::warn!("STRAVA_ACCESS_TOKEN not set, segment refresh is disabled");
    }

    let challenges = Arc::new(ChallengeService::with_database(
        db.clone(),
        Arc::new(strava.clone()),
        Arc::new(SystemClock),
        config.scheduler,
        config.reference_offset,
    ));

    let scheduler = tokio::spawn(challenges.scheduler().clone().run());

    let api_keys = ApiKeys::from_comma_separated(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty, admin endpoints will reject every request");
    }

    let state = AppState {
        db,
        challenges,
        strava,
        strava_token: config.strava_access_token.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let app = features::router(state, api_keys)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
