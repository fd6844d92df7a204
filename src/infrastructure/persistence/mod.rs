pub mod database;
pub mod repositories;

pub use database::Database;

use crate::domain::errors::StoreError;

pub(crate) fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        reason: e.to_string(),
    }
}
