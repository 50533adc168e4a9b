//! Service-level error taxonomy.
//!
//! Four kinds, propagated unmodified to the boundary layer: `NotFound`
//! (absent or soft-deleted id), `Validation` (input outside its declared
//! constraint), `Conflict` (scheduling overlap), `Storage` (store failure).

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::EntityKind;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(DatabaseError::Sqlite(e))
    }
}
