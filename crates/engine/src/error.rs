//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`RuleData`] thrown when the rule sheets are missing or malformed.
//! - [`Mapping`] thrown when a shared category has no counterpart category.
//! - [`Ledger`] wraps a failure reported by the ledger port.
//! - [`InvalidShare`] thrown when a share fraction is outside `(0, 1)`.
//! - [`Unsplittable`] thrown when the ledger cannot hold the split, e.g. a
//!   split parent whose amount cannot be patched.
//!
//!  [`RuleData`]: EngineError::RuleData
//!  [`Mapping`]: EngineError::Mapping
//!  [`Ledger`]: EngineError::Ledger
//!  [`InvalidShare`]: EngineError::InvalidShare
//!  [`Unsplittable`]: EngineError::Unsplittable
use thiserror::Error;

use crate::UserId;

/// Failures reported by a [`Ledger`](crate::Ledger) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger rejected the credentials: {0}")]
    Auth(String),
    #[error("\"{0}\" not found in ledger")]
    NotFound(String),
    #[error("ledger rejected the request: {0}")]
    Rejected(String),
    #[error("ledger transport error: {0}")]
    Transport(String),
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid rule data: {0}")]
    RuleData(String),
    #[error("No mapping for category \"{category}\" towards user {target_user}")]
    Mapping {
        category: String,
        target_user: UserId,
    },
    #[error("Invalid share: {0}")]
    InvalidShare(String),
    #[error("Cannot split transaction {transaction}: {reason}")]
    Unsplittable { transaction: String, reason: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    /// Returns `true` when the ledger could not find the requested resource.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::NotFound(_)))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::RuleData(a), Self::RuleData(b)) => a == b,
            (
                Self::Mapping {
                    category: a,
                    target_user: ua,
                },
                Self::Mapping {
                    category: b,
                    target_user: ub,
                },
            ) => a == b && ua == ub,
            (Self::InvalidShare(a), Self::InvalidShare(b)) => a == b,
            (
                Self::Unsplittable {
                    transaction: a,
                    reason: ra,
                },
                Self::Unsplittable {
                    transaction: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (Self::Ledger(a), Self::Ledger(b)) => a == b,
            _ => false,
        }
    }
}
