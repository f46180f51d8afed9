//! Read-only snapshot of the rule sheets for a single run.

use std::collections::{HashMap, HashSet};

use crate::{CategoryMapping, EngineError, ResultEngine, User, UserId, normalize_key};

/// Users and category mappings, indexed for lookup by `(user, category)`.
#[derive(Clone, Debug)]
pub struct RuleSet {
    users: Vec<User>,
    mappings: Vec<CategoryMapping>,
    index: HashMap<(UserId, String), Vec<usize>>,
    default_row: Option<usize>,
}

impl RuleSet {
    /// Validates the sheets and builds the lookup index.
    ///
    /// Fails with [`EngineError::RuleData`] on duplicate user numbers,
    /// invalid users or more than one default row.
    pub fn new(users: Vec<User>, mappings: Vec<CategoryMapping>) -> ResultEngine<Self> {
        if users.is_empty() {
            return Err(EngineError::RuleData("no users configured".to_string()));
        }

        let mut seen = HashSet::new();
        for user in &users {
            if !seen.insert(user.id) {
                return Err(EngineError::RuleData(format!(
                    "user number {} appears more than once",
                    user.id
                )));
            }
            user.validate()?;
        }

        let mut index: HashMap<(UserId, String), Vec<usize>> = HashMap::new();
        let mut default_row = None;
        for (position, row) in mappings.iter().enumerate() {
            if row.is_default() {
                if default_row.replace(position).is_some() {
                    return Err(EngineError::RuleData(
                        "more than one default category mapping row".to_string(),
                    ));
                }
                continue;
            }
            for (user, name) in &row.categories {
                if let Some(key) = normalize_key(name) {
                    index.entry((*user, key)).or_default().push(position);
                }
            }
        }

        Ok(Self {
            users,
            mappings,
            index,
            default_row,
        })
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    #[must_use]
    pub fn mappings(&self) -> &[CategoryMapping] {
        &self.mappings
    }

    #[must_use]
    pub fn default_row(&self) -> Option<&CategoryMapping> {
        self.default_row.map(|position| &self.mappings[position])
    }

    /// The row naming `category` for `user`, if any.
    ///
    /// More than one matching row is a data error: the sheet would be
    /// ambiguous about whether and where the category is mirrored.
    pub fn row_for(&self, user: UserId, category: &str) -> ResultEngine<Option<&CategoryMapping>> {
        let Some(key) = normalize_key(category) else {
            return Ok(None);
        };
        match self.index.get(&(user, key)).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([position]) => Ok(Some(&self.mappings[*position])),
            Some(rows) => Err(EngineError::RuleData(format!(
                "category \"{category}\" of user {user} appears in {} mapping rows",
                rows.len()
            ))),
        }
    }

    /// Like [`row_for`](Self::row_for) but falls back to the default row.
    pub fn resolve(&self, user: UserId, category: &str) -> ResultEngine<&CategoryMapping> {
        if let Some(row) = self.row_for(user, category)? {
            return Ok(row);
        }
        self.default_row().ok_or_else(|| {
            EngineError::RuleData(format!(
                "category \"{category}\" of user {user} has no mapping and there is no default row"
            ))
        })
    }

    pub(crate) fn users_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.iter_mut()
    }
}
