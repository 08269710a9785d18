//! # Service Error Types
//!
//! The error surface the outer layer (UI command handlers, HTTP
//! endpoints) sees: core business errors and database errors under one
//! roof, each keeping its own message.

use thiserror::Error;

use bazaar_core::{CoreError, ValidationError};
use bazaar_db::DbError;

/// Top-level error for session orchestration operations.
#[derive(Debug, Error)]
pub enum PosError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for PosError {
    fn from(err: ValidationError) -> Self {
        PosError::Core(CoreError::Validation(err))
    }
}

impl PosError {
    /// True when the operator can fix the situation and retry (stock
    /// conflicts, validation failures), as opposed to infrastructure
    /// trouble.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PosError::Db(DbError::StockConflict { .. })
                | PosError::Core(CoreError::Validation(_))
                | PosError::Core(CoreError::AdvanceExceedsGrandTotal { .. })
        )
    }
}

/// Result type for session orchestration operations.
pub type PosResult<T> = Result<T, PosError>;
