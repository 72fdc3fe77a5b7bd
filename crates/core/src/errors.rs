use thiserror::Error;

use crate::recommend::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid recommendation option: {0}")]
    InvalidOption(String),
}

/// Failure of a whole strategy or tracking call.
///
/// No-signal conditions (unknown seed, empty history, empty cart) are never
/// errors; strategies answer those with an empty list or a fallback. Only
/// option validation and data-access failures surface here, and data-access
/// failures propagate without retry or partial results.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
