//! Idempotent write-back of split groups.
//!
//! Every mirror is looked up by its marker before being written, so running
//! the same groups twice creates nothing the second time. Writes are issued
//! strictly one after the other.

use std::{collections::HashMap, fmt};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    LedgerError, Milliunits, SplitGroup, Transaction, TransactionPatch, UserId, WriteReceipt,
    ports::Ledger, same_name,
};

/// Which side of a split a result refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpsertStage {
    /// The split itself could not be computed.
    Split,
    /// The mirror in the counterpart's budget.
    Target,
    /// The original in the owner's budget.
    Source,
}

impl UpsertStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertStage::Split => "split",
            UpsertStage::Target => "target",
            UpsertStage::Source => "source",
        }
    }
}

impl fmt::Display for UpsertStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpsertAction {
    Created,
    Updated,
    Skipped,
    Failed,
}

impl UpsertAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertAction::Created => "created",
            UpsertAction::Updated => "updated",
            UpsertAction::Skipped => "skipped",
            UpsertAction::Failed => "failed",
        }
    }
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one write (or skipped write).
#[derive(Clone, Debug, PartialEq)]
pub struct UpsertResult {
    pub stage: UpsertStage,
    pub action: UpsertAction,
    pub budget_id: String,
    pub transaction_id: Option<String>,
    pub original_id: String,
    pub source_user: UserId,
    pub target_user: Option<UserId>,
    /// Raw ledger response of the write, if one was issued.
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl UpsertResult {
    fn new(stage: UpsertStage, action: UpsertAction, budget_id: &str, group: &SplitGroup) -> Self {
        Self {
            stage,
            action,
            budget_id: budget_id.to_string(),
            transaction_id: None,
            original_id: group.original.id.clone(),
            source_user: group.source_user,
            target_user: (stage != UpsertStage::Source).then_some(group.target_user),
            response: None,
            error: None,
        }
    }

    fn receipt(mut self, receipt: WriteReceipt) -> Self {
        self.transaction_id = Some(receipt.transaction_id);
        self.response = Some(receipt.raw);
        self
    }

    fn transaction(mut self, id: &str) -> Self {
        self.transaction_id = Some(id.to_string());
        self
    }

    fn error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Result for a transaction whose split could not be computed.
    #[must_use]
    pub fn split_failed(
        original: &Transaction,
        source_user: UserId,
        target_user: UserId,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            stage: UpsertStage::Split,
            action: UpsertAction::Failed,
            budget_id: original.budget_id.clone(),
            transaction_id: Some(original.id.clone()),
            original_id: original.id.clone(),
            source_user,
            target_user: Some(target_user),
            response: None,
            error: Some(error.to_string()),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.action == UpsertAction::Failed
    }
}

/// State of a mirror once its write went through (or did not).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mirror {
    /// The counterpart's budget holds the mirror.
    Live,
    /// Not written, or deleted by its owner.
    Missing,
}

/// Writes split groups through a [`Ledger`].
pub struct Upserter<'a, L> {
    ledger: &'a L,
}

impl<'a, L: Ledger> Upserter<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Upserts `groups` and reports one result per write.
    ///
    /// Groups of the same original are handled together: all mirrors first,
    /// then the original once, reduced by the amounts of the mirrors that are
    /// live in the ledger. A mirror its owner deleted holds nothing, so when
    /// no live mirror remains the original is left untouched. A failure never
    /// stops later groups.
    pub async fn upsert(&self, groups: &[SplitGroup]) -> Vec<UpsertResult> {
        let mut results = Vec::new();
        for batch in by_original(groups) {
            let mut mirrored = Milliunits::ZERO;
            let mut any_live = false;
            let mut all_failed = true;
            for group in &batch {
                let (result, mirror) = self.upsert_target(group).await;
                if mirror == Mirror::Live {
                    mirrored += group.target.amount;
                    any_live = true;
                }
                all_failed &= result.is_failure();
                results.push(result);
            }

            let first = batch[0];
            let source = || {
                UpsertResult::new(
                    UpsertStage::Source,
                    UpsertAction::Skipped,
                    &first.original.budget_id,
                    first,
                )
                .transaction(&first.original.id)
            };
            if all_failed {
                warn!(
                    "transaction {}: every mirror failed, original left untouched",
                    first.original.id
                );
                results.push(UpsertResult {
                    action: UpsertAction::Failed,
                    ..source()
                }
                .error("not attempted: no mirror was written"));
            } else if first.keeps_original() {
                debug!("transaction {} is mirrored whole, original kept", first.original.id);
                results.push(source());
            } else if !any_live {
                debug!(
                    "transaction {}: every mirror was deleted, original left untouched",
                    first.original.id
                );
                results.push(source());
            } else {
                results.push(self.upsert_source(first, mirrored).await);
            }
        }

        let failed = results.iter().filter(|r| r.is_failure()).count();
        info!(
            "upserted {} groups: {} writes reported, {} failed",
            groups.len(),
            results.len(),
            failed
        );
        results
    }

    async fn upsert_target(&self, group: &SplitGroup) -> (UpsertResult, Mirror) {
        let draft = &group.target;
        let budget_id = draft.budget_id.as_str();
        let result = UpsertResult::new(UpsertStage::Target, UpsertAction::Failed, budget_id, group);

        let existing = match self.ledger.find_by_marker(budget_id, &draft.import_id).await {
            Ok(existing) => existing,
            Err(err) => return (failed(result, group, err), Mirror::Missing),
        };

        match existing {
            None => match self.ledger.create_transaction(budget_id, draft).await {
                Ok(receipt) => {
                    debug!(
                        "created mirror {} of {} in budget {budget_id}",
                        receipt.transaction_id, group.original.id
                    );
                    let result = UpsertResult {
                        action: UpsertAction::Created,
                        ..result
                    };
                    (result.receipt(receipt), Mirror::Live)
                }
                Err(err) => (failed(result, group, err), Mirror::Missing),
            },
            Some(existing) if existing.deleted => {
                debug!(
                    "mirror {} of {} was deleted by its owner, leaving it",
                    existing.id, group.original.id
                );
                let result = UpsertResult {
                    action: UpsertAction::Skipped,
                    ..result
                };
                (result.transaction(&existing.id), Mirror::Missing)
            }
            Some(existing) if mirror_matches(&existing, group) => {
                let result = UpsertResult {
                    action: UpsertAction::Skipped,
                    ..result
                };
                (result.transaction(&existing.id), Mirror::Live)
            }
            Some(existing) if !draft.subtransactions.is_empty() => {
                let err = LedgerError::Rejected(format!(
                    "mirror {} is split across categories and cannot be updated",
                    existing.id
                ));
                (failed(result.transaction(&existing.id), group, err), Mirror::Missing)
            }
            Some(existing) => {
                let mut patch = TransactionPatch::new(budget_id, &existing.id).amount(draft.amount);
                if let Some(category) = &draft.category {
                    patch = patch.category(category);
                }
                match self
                    .ledger
                    .update_transaction(budget_id, &existing.id, &patch)
                    .await
                {
                    Ok(receipt) => {
                        let result = UpsertResult {
                            action: UpsertAction::Updated,
                            ..result
                        };
                        (result.receipt(receipt), Mirror::Live)
                    }
                    Err(err) => (
                        failed(result.transaction(&existing.id), group, err),
                        Mirror::Missing,
                    ),
                }
            }
        }
    }

    async fn upsert_source(&self, group: &SplitGroup, mirrored: Milliunits) -> UpsertResult {
        let original = &group.original;
        let budget_id = original.budget_id.as_str();
        let result = UpsertResult::new(UpsertStage::Source, UpsertAction::Failed, budget_id, group)
            .transaction(&original.id);

        let Some(desired) = original.amount.checked_sub(mirrored) else {
            return result.error("source amount overflows");
        };
        let flag = group.source_update.flag;

        let current = match self.ledger.get_transaction(budget_id, &original.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return failed(
                    result,
                    group,
                    LedgerError::NotFound(format!("transaction {}", original.id)),
                );
            }
            Err(err) => return failed(result, group, err),
        };

        if current.amount == desired && (flag.is_none() || current.flag == flag) {
            return UpsertResult {
                action: UpsertAction::Skipped,
                ..result
            };
        }

        let mut patch = TransactionPatch::new(budget_id, &original.id).amount(desired);
        if let Some(flag) = flag {
            patch = patch.flag(flag);
        }
        match self
            .ledger
            .update_transaction(budget_id, &original.id, &patch)
            .await
        {
            Ok(receipt) => UpsertResult {
                action: UpsertAction::Updated,
                ..result
            }
            .receipt(receipt),
            Err(err) => failed(result, group, err),
        }
    }
}

fn failed(result: UpsertResult, group: &SplitGroup, err: LedgerError) -> UpsertResult {
    warn!(
        "{} write of transaction {} (user {} -> user {}) failed: {err}",
        result.stage, group.original.id, group.source_user, group.target_user
    );
    result.error(err)
}

/// Same amount and categories; a split mirror is compared line by line.
fn mirror_matches(existing: &Transaction, group: &SplitGroup) -> bool {
    let wanted = &group.target;
    let categories_match = if wanted.subtransactions.is_empty() {
        same_category(existing.category.as_deref(), wanted.category.as_deref())
    } else {
        existing.subtransactions.len() == wanted.subtransactions.len()
            && existing
                .subtransactions
                .iter()
                .zip(&wanted.subtransactions)
                .all(|(current, wanted)| {
                    current.amount == wanted.amount
                        && same_category(current.category.as_deref(), wanted.category.as_deref())
                })
    };
    existing.amount == wanted.amount && categories_match
}

fn same_category(current: Option<&str>, wanted: Option<&str>) -> bool {
    match (current, wanted) {
        (Some(current), Some(wanted)) => same_name(current, wanted),
        (None, None) => true,
        _ => false,
    }
}

/// Groups sharing an original, in order of first appearance.
fn by_original(groups: &[SplitGroup]) -> Vec<Vec<&SplitGroup>> {
    let mut batches: Vec<Vec<&SplitGroup>> = Vec::new();
    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
    for group in groups {
        let key = (group.original.budget_id.as_str(), group.original.id.as_str());
        match positions.get(&key) {
            Some(&position) => batches[position].push(group),
            None => {
                positions.insert(key, batches.len());
                batches.push(vec![group]);
            }
        }
    }
    batches
}
