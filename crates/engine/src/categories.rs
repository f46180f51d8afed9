use std::collections::BTreeMap;

use crate::{ShareFraction, UserId};

/// Alias that marks the fallback row of the mapping sheet.
pub const DEFAULT_ALIAS: &str = "Default";
/// Category name that marks the fallback row of the mapping sheet.
pub const WILDCARD_CATEGORY: &str = "*";

/// One row of the category mapping sheet: the same expense category as named
/// in each user's budget.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryMapping {
    pub alias: Option<String>,
    pub shared: bool,
    pub categories: BTreeMap<UserId, String>,
    /// Overrides the counterpart's share for this category.
    pub share_override: Option<ShareFraction>,
}

impl CategoryMapping {
    #[must_use]
    pub fn new(shared: bool) -> Self {
        Self {
            shared,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn category(mut self, user: UserId, name: impl Into<String>) -> Self {
        self.categories.insert(user, name.into());
        self
    }

    #[must_use]
    pub fn share_override(mut self, share: ShareFraction) -> Self {
        self.share_override = Some(share);
        self
    }

    /// Category name used by `user`, ignoring blank cells.
    #[must_use]
    pub fn category_for(&self, user: UserId) -> Option<&str> {
        self.categories
            .get(&user)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }

    /// `true` for the fallback row (alias `Default` or a `*` category).
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.alias
            .as_deref()
            .is_some_and(|alias| alias.trim().eq_ignore_ascii_case(DEFAULT_ALIAS))
            || self
                .categories
                .values()
                .any(|name| name.trim() == WILDCARD_CATEGORY)
    }
}
