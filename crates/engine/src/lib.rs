//! Shared-expense engine: decides which ledger transactions are shared
//! between household members, splits them and writes the splits back
//! idempotently.
//!
//! The engine talks to the outside world only through [`RuleStore`] and
//! [`Ledger`]. [`Engine`] wires both ports to the three stages:
//! [`select`], [`split`] and [`Upserter`].

pub use categories::{CategoryMapping, DEFAULT_ALIAS, WILDCARD_CATEGORY};
pub use error::{EngineError, LedgerError};
pub use marker::{MARKER_PREFIX, derive_marker, is_split_marker};
pub use money::Milliunits;
pub use ops::{Engine, EngineBuilder, SharedTransactions, SplitFailure, SplitPreview};
pub use ports::{Ledger, RuleStore};
pub use rules::RuleSet;
pub use select::select;
pub use share::ShareFraction;
pub use split::{SplitGroup, split};
pub use transactions::{
    ClearedState, FlagColor, SubTransaction, Transaction, TransactionDraft, TransactionPatch,
    WriteReceipt,
};
pub use upsert::{UpsertAction, UpsertResult, UpsertStage, Upserter};
pub use users::{DEFAULT_SPLIT_FLAG, User, UserId};
pub use util::{closest_name, normalize_display, normalize_key, same_name};

mod categories;
mod error;
mod marker;
mod money;
mod ops;
mod ports;
mod rules;
mod select;
mod share;
mod split;
mod transactions;
mod upsert;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
