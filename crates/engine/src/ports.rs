//! Boundaries between the engine and the outside world.
//!
//! The engine performs no I/O of its own; the rule sheet and the ledger are
//! reached only through these traits. Futures must be `Send` so the engine
//! can be driven from a multi-threaded runtime.

use std::{future::Future, sync::Arc};

use chrono::NaiveDate;

use crate::{
    CategoryMapping, LedgerError, ResultEngine, Transaction, TransactionDraft, TransactionPatch,
    User, WriteReceipt,
};

/// Read-only source of users and category mappings.
pub trait RuleStore: Send + Sync {
    /// Fails with `RuleData` (or a ledger-style `NotFound`) when the users
    /// tab is missing or empty.
    fn get_users(&self) -> impl Future<Output = ResultEngine<Vec<User>>> + Send;

    fn get_category_mappings(
        &self,
    ) -> impl Future<Output = ResultEngine<Vec<CategoryMapping>>> + Send;
}

/// Budgeting ledger holding one budget per user.
pub trait Ledger: Send + Sync {
    /// Normalized transactions of `budget_id`, optionally from `since`
    /// (inclusive).
    fn get_transactions(
        &self,
        budget_id: &str,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<Transaction>, LedgerError>> + Send;

    fn get_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, LedgerError>> + Send;

    fn create_transaction(
        &self,
        budget_id: &str,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<WriteReceipt, LedgerError>> + Send;

    fn update_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
        patch: &TransactionPatch,
    ) -> impl Future<Output = Result<WriteReceipt, LedgerError>> + Send;

    /// The transaction of `budget_id` whose import marker is `marker`,
    /// deleted ones included.
    fn find_by_marker(
        &self,
        budget_id: &str,
        marker: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, LedgerError>> + Send;

    /// Id of the budget whose name best matches `name`.
    fn find_budget_id(&self, name: &str) -> impl Future<Output = Result<String, LedgerError>> + Send;
}

impl<T: RuleStore> RuleStore for Arc<T> {
    fn get_users(&self) -> impl Future<Output = ResultEngine<Vec<User>>> + Send {
        (**self).get_users()
    }

    fn get_category_mappings(
        &self,
    ) -> impl Future<Output = ResultEngine<Vec<CategoryMapping>>> + Send {
        (**self).get_category_mappings()
    }
}

impl<T: Ledger> Ledger for Arc<T> {
    fn get_transactions(
        &self,
        budget_id: &str,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<Transaction>, LedgerError>> + Send {
        (**self).get_transactions(budget_id, since)
    }

    fn get_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, LedgerError>> + Send {
        (**self).get_transaction(budget_id, transaction_id)
    }

    fn create_transaction(
        &self,
        budget_id: &str,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<WriteReceipt, LedgerError>> + Send {
        (**self).create_transaction(budget_id, draft)
    }

    fn update_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
        patch: &TransactionPatch,
    ) -> impl Future<Output = Result<WriteReceipt, LedgerError>> + Send {
        (**self).update_transaction(budget_id, transaction_id, patch)
    }

    fn find_by_marker(
        &self,
        budget_id: &str,
        marker: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, LedgerError>> + Send {
        (**self).find_by_marker(budget_id, marker)
    }

    fn find_budget_id(&self, name: &str) -> impl Future<Output = Result<String, LedgerError>> + Send {
        (**self).find_budget_id(name)
    }
}
