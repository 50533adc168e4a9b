//! Sattva — practice management backend for a yoga therapy clinic.
//!
//! Patients, therapists, clinical records, and appointment scheduling over
//! an embedded SQLite store. Records are soft-deleted, never destroyed;
//! every state change lands in an append-only audit log committed in the
//! same transaction as the change itself. Appointment booking enforces a
//! per-participant no-overlap invariant over half-open time slots.

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod scheduling;

pub use error::ServiceError;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from RUST_LOG, falling back to the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
