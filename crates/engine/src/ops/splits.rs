use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    EngineError, Ledger, ResultEngine, RuleSet, RuleStore, SplitGroup, Transaction,
    UpsertResult, Upserter, User, UserId, split,
};

use super::{Engine, SharedTransactions};

/// A transaction that could not be split towards one counterpart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitFailure {
    pub transaction: Transaction,
    pub source_user: UserId,
    pub target_user: UserId,
    pub error: String,
}

/// Every split that would be written, plus the ones that could not be
/// computed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitPreview {
    pub groups: Vec<SplitGroup>,
    pub failures: Vec<SplitFailure>,
}

impl SplitPreview {
    /// Splits the shared transactions of every entry of `shared` towards
    /// every other user of `rules` with a resolved budget.
    ///
    /// Counterparts come from the rule set, so entries may be pruned from
    /// `shared` without losing their users as targets. Mapping, share and
    /// unsplittable errors are recorded as failures; rule data errors abort.
    pub fn build(shared: &[SharedTransactions], rules: &RuleSet) -> ResultEngine<Self> {
        let sources = shared
            .iter()
            .map(|entry| participant(entry, rules))
            .collect::<ResultEngine<Vec<User>>>()?;
        let targets: Vec<User> = rules
            .users()
            .iter()
            .filter(|user| !user.budget_id.trim().is_empty())
            .map(|user| {
                sources
                    .iter()
                    .find(|source| source.id == user.id)
                    .unwrap_or(user)
                    .clone()
            })
            .collect();
        Self::build_for(shared, &sources, &targets, rules)
    }

    fn build_for(
        shared: &[SharedTransactions],
        sources: &[User],
        targets: &[User],
        rules: &RuleSet,
    ) -> ResultEngine<Self> {
        let mut preview = SplitPreview::default();
        for (entry, source) in shared.iter().zip(sources) {
            for target in targets.iter().filter(|target| target.id != source.id) {
                for tx in &entry.transactions {
                    match split(tx, source, target, rules) {
                        Ok(group) => preview.groups.push(group),
                        Err(
                            err @ (EngineError::Mapping { .. }
                            | EngineError::InvalidShare(_)
                            | EngineError::Unsplittable { .. }),
                        ) => {
                            warn!(
                                "transaction {} (user {} -> user {}): {err}",
                                tx.id, source.id, target.id
                            );
                            preview.failures.push(SplitFailure {
                                transaction: tx.clone(),
                                source_user: source.id,
                                target_user: target.id,
                                error: err.to_string(),
                            });
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(preview)
    }
}

/// The rule-sheet user behind `entry`, with the budget id `entry` was read
/// from.
fn participant(entry: &SharedTransactions, rules: &RuleSet) -> ResultEngine<User> {
    let mut user = rules.user(entry.user).cloned().ok_or_else(|| {
        EngineError::RuleData(format!("user {} is not in the users sheet", entry.user))
    })?;
    if !entry.budget_id.trim().is_empty() {
        user.budget_id = entry.budget_id.clone();
    }
    Ok(user)
}

impl<R: RuleStore, L: Ledger> Engine<R, L> {
    /// Computes the splits of `shared`, or of freshly fetched shared
    /// transactions since `since` when `shared` is `None`. Nothing is written.
    pub async fn preview_split(
        &self,
        shared: Option<Vec<SharedTransactions>>,
        since: Option<NaiveDate>,
    ) -> ResultEngine<SplitPreview> {
        let rules = self.load_rules().await?;
        let preview = match shared {
            Some(shared) => SplitPreview::build(&shared, &rules)?,
            None => {
                // Users whose budget could not be read are neither sources
                // nor targets.
                let shared = self.shared_with(&rules, self.since_or_default(since)).await?;
                let users = shared
                    .iter()
                    .map(|entry| participant(entry, &rules))
                    .collect::<ResultEngine<Vec<User>>>()?;
                SplitPreview::build_for(&shared, &users, &users, &rules)?
            }
        };
        info!(
            "split preview: {} groups, {} failures",
            preview.groups.len(),
            preview.failures.len()
        );
        Ok(preview)
    }

    /// Writes `groups`, or a freshly computed preview when `groups` is `None`.
    ///
    /// Splits that could not be computed are reported as failed results of
    /// the split stage, ahead of the write results.
    pub async fn apply_split(
        &self,
        groups: Option<Vec<SplitGroup>>,
        since: Option<NaiveDate>,
    ) -> ResultEngine<Vec<UpsertResult>> {
        let upserter = Upserter::new(&self.ledger);
        match groups {
            Some(groups) => Ok(upserter.upsert(&groups).await),
            None => {
                let preview = self.preview_split(None, since).await?;
                let mut results: Vec<UpsertResult> = preview
                    .failures
                    .iter()
                    .map(|failure| {
                        UpsertResult::split_failed(
                            &failure.transaction,
                            failure.source_user,
                            failure.target_user,
                            &failure.error,
                        )
                    })
                    .collect();
                results.extend(upserter.upsert(&preview.groups).await);
                Ok(results)
            }
        }
    }
}
