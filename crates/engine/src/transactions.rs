//! Canonical ledger transaction and the write payloads derived from it.
//!
//! The ledger adapter is the only producer of [`Transaction`]; everything in
//! the engine consumes this shape.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Milliunits};

/// Flag colours supported by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl FlagColor {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FlagColor::Red => "red",
            FlagColor::Orange => "orange",
            FlagColor::Yellow => "yellow",
            FlagColor::Green => "green",
            FlagColor::Blue => "blue",
            FlagColor::Purple => "purple",
        }
    }
}

impl fmt::Display for FlagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagColor {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(FlagColor::Red),
            "orange" => Ok(FlagColor::Orange),
            "yellow" => Ok(FlagColor::Yellow),
            "green" => Ok(FlagColor::Green),
            "blue" => Ok(FlagColor::Blue),
            "purple" => Ok(FlagColor::Purple),
            other => Err(EngineError::RuleData(format!("unknown flag colour \"{other}\""))),
        }
    }
}

/// Clearing state as reported by the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearedState {
    Cleared,
    #[default]
    Uncleared,
    Reconciled,
}

/// One category line of a transaction split across categories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubTransaction {
    pub amount: Milliunits,
    pub category: Option<String>,
    pub memo: Option<String>,
}

impl SubTransaction {
    #[must_use]
    pub fn new(amount: Milliunits, category: impl Into<String>) -> Self {
        Self {
            amount,
            category: Some(category.into()),
            memo: None,
        }
    }
}

/// A normalized ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub budget_id: String,
    pub date: NaiveDate,
    pub payee: String,
    pub amount: Milliunits,
    /// `None` for uncategorized transactions and split parents.
    pub category: Option<String>,
    pub memo: Option<String>,
    pub cleared: ClearedState,
    pub approved: bool,
    pub flag: Option<FlagColor>,
    pub account_name: String,
    pub account_id: Option<String>,
    /// Idempotency marker; set on mirrored transactions.
    pub import_id: Option<String>,
    pub deleted: bool,
    /// Live lines of a split parent; empty for ordinary transactions.
    pub subtransactions: Vec<SubTransaction>,
}

impl Transaction {
    /// Minimal transaction, mostly useful to build fixtures and fakes.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        budget_id: impl Into<String>,
        date: NaiveDate,
        amount: Milliunits,
    ) -> Self {
        Self {
            id: id.into(),
            budget_id: budget_id.into(),
            date,
            payee: String::new(),
            amount,
            category: None,
            memo: None,
            cleared: ClearedState::default(),
            approved: false,
            flag: None,
            account_name: String::new(),
            account_id: None,
            import_id: None,
            deleted: false,
            subtransactions: Vec::new(),
        }
    }

    /// `true` when the ledger holds this transaction as a split parent.
    #[must_use]
    pub fn is_split_parent(&self) -> bool {
        !self.subtransactions.is_empty()
    }

    #[must_use]
    pub fn payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = payee.into();
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    #[must_use]
    pub fn account(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = account_name.into();
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: FlagColor) -> Self {
        self.flag = Some(flag);
        self
    }

    #[must_use]
    pub fn import_id(mut self, import_id: impl Into<String>) -> Self {
        self.import_id = Some(import_id.into());
        self
    }

    #[must_use]
    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    #[must_use]
    pub fn subtransactions(mut self, lines: Vec<SubTransaction>) -> Self {
        self.subtransactions = lines;
        self
    }
}

/// A transaction to create in a counterpart budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionDraft {
    pub budget_id: String,
    pub account_name: String,
    pub date: NaiveDate,
    pub payee: String,
    pub amount: Milliunits,
    pub category: Option<String>,
    pub memo: Option<String>,
    pub cleared: ClearedState,
    pub approved: bool,
    pub flag: Option<FlagColor>,
    /// Deterministic idempotency marker, see [`derive_marker`](crate::derive_marker).
    pub import_id: String,
    /// Category lines when the mirror is itself split; `category` is then
    /// `None` and the lines add up to `amount`.
    pub subtransactions: Vec<SubTransaction>,
}

/// Partial update of an existing transaction. `None` fields are left as is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionPatch {
    pub id: String,
    pub budget_id: String,
    pub amount: Option<Milliunits>,
    pub category: Option<String>,
    pub flag: Option<FlagColor>,
}

impl TransactionPatch {
    #[must_use]
    pub fn new(budget_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            budget_id: budget_id.into(),
            amount: None,
            category: None,
            flag: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: Milliunits) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: FlagColor) -> Self {
        self.flag = Some(flag);
        self
    }
}

/// Outcome of a successful ledger write.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteReceipt {
    pub transaction_id: String,
    /// Raw ledger response body, kept for reporting.
    pub raw: serde_json::Value,
}
