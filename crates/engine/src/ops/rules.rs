use tracing::{debug, warn};

use crate::{EngineError, Ledger, LedgerError, ResultEngine, RuleSet, RuleStore};

use super::Engine;

impl<R: RuleStore, L: Ledger> Engine<R, L> {
    /// Reads both rule sheets and resolves budget names into budget ids.
    ///
    /// A budget name that matches no budget leaves the user without a budget
    /// id; such users are skipped by the later stages.
    pub async fn load_rules(&self) -> ResultEngine<RuleSet> {
        let users = self.rule_store.get_users().await?;
        let mappings = self.rule_store.get_category_mappings().await?;
        debug!(
            "loaded {} users and {} category mappings",
            users.len(),
            mappings.len()
        );

        let mut rules = RuleSet::new(users, mappings)?;
        for user in rules.users_mut() {
            if !user.budget_id.trim().is_empty() {
                continue;
            }
            let Some(name) = user.budget_name.clone() else {
                continue;
            };
            match self.ledger.find_budget_id(&name).await {
                Ok(budget_id) => {
                    debug!("user {}: budget \"{name}\" resolved to {budget_id}", user.id);
                    user.budget_id = budget_id;
                }
                Err(LedgerError::NotFound(_)) => {
                    warn!("user {}: no budget matches \"{name}\"", user.id);
                }
                Err(err) => return Err(EngineError::Ledger(err)),
            }
        }
        Ok(rules)
    }
}
