use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{EngineError, FlagColor, ResultEngine, ShareFraction, normalize_key};

/// Flag written on originals once split when the sheet leaves it blank.
pub const DEFAULT_SPLIT_FLAG: FlagColor = FlagColor::Purple;

/// User number as written in the rule sheet (1-based).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A household member and their budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Ledger budget id. Empty until resolved from `budget_name`.
    pub budget_id: String,
    pub budget_name: Option<String>,
    /// Portion of shared expenses this user bears.
    pub share: ShareFraction,
    /// Normalized category keys never shared for this user.
    pub excluded_categories: BTreeSet<String>,
    /// Flag written on an original once its split was applied.
    pub split_flag: FlagColor,
    /// Flag that forces a transaction to be shared regardless of category.
    pub share_flag: Option<FlagColor>,
    /// Account receiving mirrored transactions in this user's budget.
    pub shared_account: String,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, share: ShareFraction) -> Self {
        Self {
            id,
            name: name.into(),
            budget_id: String::new(),
            budget_name: None,
            share,
            excluded_categories: BTreeSet::new(),
            split_flag: DEFAULT_SPLIT_FLAG,
            share_flag: None,
            shared_account: String::new(),
        }
    }

    #[must_use]
    pub fn budget_id(mut self, budget_id: impl Into<String>) -> Self {
        self.budget_id = budget_id.into();
        self
    }

    #[must_use]
    pub fn budget_name(mut self, budget_name: impl Into<String>) -> Self {
        self.budget_name = Some(budget_name.into());
        self
    }

    /// Adds an excluded category; names that normalize to nothing are ignored.
    #[must_use]
    pub fn exclude(mut self, category: &str) -> Self {
        if let Some(key) = normalize_key(category) {
            self.excluded_categories.insert(key);
        }
        self
    }

    #[must_use]
    pub fn split_flag(mut self, flag: FlagColor) -> Self {
        self.split_flag = flag;
        self
    }

    #[must_use]
    pub fn share_flag(mut self, flag: FlagColor) -> Self {
        self.share_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn shared_account(mut self, account: impl Into<String>) -> Self {
        self.shared_account = account.into();
        self
    }

    /// `true` if `category` is on this user's exclusion list.
    #[must_use]
    pub fn excludes(&self, category: &str) -> bool {
        normalize_key(category).is_some_and(|key| self.excluded_categories.contains(&key))
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.budget_id.trim().is_empty() && self.budget_name.is_none() {
            return Err(EngineError::RuleData(format!(
                "user {} has neither a budget id nor a budget name",
                self.id
            )));
        }
        if self.share_flag == Some(self.split_flag) {
            return Err(EngineError::RuleData(format!(
                "user {}: the to-share flag and the shared flag are both {}",
                self.id, self.split_flag
            )));
        }
        Ok(())
    }
}
