use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    EngineError, Ledger, LedgerError, ResultEngine, RuleSet, RuleStore, Transaction, UserId,
    select,
};

use super::Engine;

/// Shared transactions of one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedTransactions {
    pub user: UserId,
    pub budget_id: String,
    pub transactions: Vec<Transaction>,
}

impl<R: RuleStore, L: Ledger> Engine<R, L> {
    /// Shared transactions of every user since `since` (default: the
    /// configured lookback).
    ///
    /// Users whose budget cannot be found are skipped; rule data and ledger
    /// credential errors abort.
    pub async fn get_shared(&self, since: Option<NaiveDate>) -> ResultEngine<Vec<SharedTransactions>> {
        let rules = self.load_rules().await?;
        self.shared_with(&rules, self.since_or_default(since)).await
    }

    pub(super) async fn shared_with(
        &self,
        rules: &RuleSet,
        since: NaiveDate,
    ) -> ResultEngine<Vec<SharedTransactions>> {
        let mut out = Vec::with_capacity(rules.users().len());
        for user in rules.users() {
            if user.budget_id.trim().is_empty() {
                warn!("user {} has no resolved budget, skipping", user.id);
                continue;
            }
            let transactions = match self
                .ledger
                .get_transactions(&user.budget_id, Some(since))
                .await
            {
                Ok(transactions) => transactions,
                Err(LedgerError::NotFound(what)) => {
                    warn!("user {}: {what} not found, skipping", user.id);
                    continue;
                }
                Err(err) => return Err(EngineError::Ledger(err)),
            };

            let transactions = select(&transactions, user, rules)?;
            info!(
                "user {}: {} shared transactions since {since}",
                user.id,
                transactions.len()
            );
            out.push(SharedTransactions {
                user: user.id,
                budget_id: user.budget_id.clone(),
                transactions,
            });
        }
        Ok(out)
    }
}
