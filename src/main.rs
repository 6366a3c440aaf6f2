//! Server entry point: tracing init, optional database hydration, bind and
//! serve.

use agrosuelo_api::state::{AppConfig, AppState};
use agrosuelo_api::{app, db};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env();
    let pool = db::init_pool().await?;
    let state = AppState::with_config(config.clone(), pool);

    if let Some(pool) = state.db_pool.clone() {
        hydrate(&state, &pool).await?;
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "agrosuelo-api listening");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` controls the filter
/// (default "info"); `AGROSUELO_LOG_JSON=true` switches to JSON output for
/// log shippers.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("AGROSUELO_LOG_JSON")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Load every table into the in-memory stores. Runs once at startup, before
/// the listener binds, so requests never see a half-hydrated state.
async fn hydrate(state: &AppState, pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
    state.roles.hydrate(db::roles::load_all(pool).await?);
    state.interfaces.hydrate(db::interfaces::load_all(pool).await?);
    state.capabilities.hydrate(db::capabilities::load_all(pool).await?);
    state.countries.hydrate(db::geography::load_all_countries(pool).await?);
    state
        .departments
        .hydrate(db::geography::load_all_departments(pool).await?);
    state
        .municipalities
        .hydrate(db::geography::load_all_municipalities(pool).await?);
    state.elements.hydrate(db::elements::load_all(pool).await?);
    state.parcels.hydrate(db::parcels::load_all(pool).await?);
    state.analyses.hydrate(
        db::analyses::load_all(pool).await?,
        db::analyses::load_all_measurements(pool).await?,
    );

    tracing::info!(
        roles = state.roles.len(),
        interfaces = state.interfaces.len(),
        capability_edges = state.capabilities.len(),
        "state hydrated from database"
    );
    Ok(())
}
