//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx. The database is **optional**: when
//! `DATABASE_URL` is set, directories, geography, catalogs, and the
//! capability edge table are hydrated on startup and every mutation is
//! written through; when absent, the API runs in-memory only (development
//! and test mode).
//!
//! The capability edge table is the one piece with transactional depth:
//! a reconciliation batch commits as a single transaction or not at all
//! (see [`capabilities::apply_plan`]).

pub mod analyses;
pub mod capabilities;
pub mod elements;
pub mod geography;
pub mod interfaces;
pub mod parcels;
pub mod roles;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open the connection pool and bring the schema up to date.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
///
/// Every request is answered from the in-memory stores; the pool only
/// carries write-through statements and the startup hydration, so it is
/// sized small. Writes that cannot grab a connection within the acquire
/// window fail the request rather than queueing up.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(300))
        .connect(&url)
        .await?;

    tracing::info!("write-through database pool ready");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("schema migrations up to date");

    Ok(Some(pool))
}
