use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ledger flag colours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearedState {
    Cleared,
    #[default]
    Uncleared,
    Reconciled,
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
    }
}

pub mod transaction {
    use super::*;

    /// Query string accepted by every transaction endpoint.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SinceQuery {
        /// Inclusive lower bound (`YYYY-MM-DD`). Defaults to the configured
        /// lookback.
        pub since_date: Option<NaiveDate>,
    }

    /// One category line of a split transaction.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SubTransactionView {
        pub amount: i64,
        pub category_name: Option<String>,
        pub memo: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: String,
        pub budget_id: String,
        pub date: NaiveDate,
        pub payee_name: String,
        /// Signed amount in milliunits.
        pub amount: i64,
        pub category_name: Option<String>,
        pub memo: Option<String>,
        #[serde(default)]
        pub cleared: ClearedState,
        #[serde(default)]
        pub approved: bool,
        pub flag_color: Option<FlagColor>,
        pub account_name: String,
        pub account_id: Option<String>,
        pub import_id: Option<String>,
        #[serde(default)]
        pub deleted: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub subtransactions: Vec<SubTransactionView>,
    }
}

pub mod shared {
    use super::*;
    use crate::transaction::TransactionView;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct UserSummary {
        pub user_num: u32,
        pub budget_id: String,
    }

    /// Shared transactions of one user.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SharedTransactionsView {
        pub user: UserSummary,
        pub shared_transactions: Vec<TransactionView>,
    }
}

pub mod split {
    use super::*;
    use crate::transaction::{SubTransactionView, TransactionView};

    /// Update applied to the original transaction.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SourceUpdateView {
        pub budget_id: String,
        pub transaction_id: String,
        pub amount: Option<i64>,
        pub category_name: Option<String>,
        pub flag_color: Option<FlagColor>,
    }

    /// Mirror created in the counterpart's budget.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct MirrorView {
        pub budget_id: String,
        pub account_name: String,
        pub date: NaiveDate,
        pub payee_name: String,
        pub amount: i64,
        pub category_name: Option<String>,
        pub memo: Option<String>,
        #[serde(default)]
        pub cleared: ClearedState,
        #[serde(default)]
        pub approved: bool,
        pub flag_color: Option<FlagColor>,
        /// Idempotency marker stored as the ledger import id.
        pub import_id: String,
        /// Category lines when the mirror is split; `category_name` is then
        /// empty.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub subtransactions: Vec<SubTransactionView>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SplitGroupView {
        pub original: TransactionView,
        pub source_user: u32,
        pub target_user: u32,
        pub source: SourceUpdateView,
        pub target: MirrorView,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SplitFailureView {
        pub transaction: TransactionView,
        pub source_user: u32,
        pub target_user: u32,
        pub error: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SplitPreviewView {
        pub groups: Vec<SplitGroupView>,
        pub failures: Vec<SplitFailureView>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum UpsertStage {
        Split,
        Target,
        Source,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum UpsertAction {
        Created,
        Updated,
        Skipped,
        Failed,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct UpsertResultView {
        pub stage: UpsertStage,
        pub action: UpsertAction,
        pub budget_id: String,
        pub transaction_id: Option<String>,
        pub original_id: String,
        pub source_user: u32,
        pub target_user: Option<u32>,
        pub response: Option<serde_json::Value>,
        pub error: Option<String>,
    }
}
