//! Shared-transaction selection.

use tracing::debug;

use crate::{ResultEngine, RuleSet, Transaction, User, is_split_marker, normalize_key};

/// Synthetic category names the ledger uses for transactions without a real
/// category.
const SYNTHETIC_CATEGORIES: [&str; 2] = ["split", "uncategorized"];

/// Returns the shared transactions of `user`, in input order.
///
/// A transaction is shared when it carries the user's to-share flag, or when
/// its category maps to a shared row. A split parent is shared when any of
/// its lines is. Mirrors (split marker), already split originals (split
/// flag), deleted transactions and excluded categories are never shared.
/// Transactions recorded in the user's shared account are only shared when
/// they carry the to-share flag.
///
/// Fails with [`EngineError::RuleData`](crate::EngineError::RuleData) if a
/// category has no mapping row and the sheet has no default row, or if it
/// appears in more than one row.
pub fn select(
    transactions: &[Transaction],
    user: &User,
    rules: &RuleSet,
) -> ResultEngine<Vec<Transaction>> {
    let mut shared = Vec::new();
    for tx in transactions {
        if is_shared(tx, user, rules)? {
            shared.push(tx.clone());
        }
    }
    debug!(
        "user {}: {} of {} transactions are shared",
        user.id,
        shared.len(),
        transactions.len()
    );
    Ok(shared)
}

fn is_shared(tx: &Transaction, user: &User, rules: &RuleSet) -> ResultEngine<bool> {
    if tx.import_id.as_deref().is_some_and(is_split_marker) {
        debug!("transaction {} is a mirror, skipping", tx.id);
        return Ok(false);
    }
    if tx.deleted {
        return Ok(false);
    }
    if tx.flag == Some(user.split_flag) {
        debug!("transaction {} already split, skipping", tx.id);
        return Ok(false);
    }

    let share_flagged = user.share_flag.is_some() && tx.flag == user.share_flag;
    if !share_flagged && in_shared_account(tx, user) {
        debug!("transaction {} sits in the shared account, skipping", tx.id);
        return Ok(false);
    }

    let categories = categories(tx);
    if !categories.is_empty() && categories.iter().all(|category| user.excludes(category)) {
        return Ok(false);
    }
    if share_flagged {
        return Ok(true);
    }

    let mut shared = false;
    for category in categories.iter().filter(|category| !user.excludes(category)) {
        shared |= rules.resolve(user.id, category)?.shared;
    }
    Ok(shared)
}

/// `true` when `tx` was recorded in `user`'s shared account.
pub(crate) fn in_shared_account(tx: &Transaction, user: &User) -> bool {
    match (
        normalize_key(&tx.account_name),
        normalize_key(&user.shared_account),
    ) {
        (Some(account), Some(shared)) => account.contains(shared.as_str()),
        _ => false,
    }
}

/// The transaction's category unless it is blank or synthetic.
pub(crate) fn real_category(tx: &Transaction) -> Option<&str> {
    real_name(tx.category.as_deref())
}

/// Real categories of `tx`: its own, or the ones of its lines.
fn categories(tx: &Transaction) -> Vec<&str> {
    match real_category(tx) {
        Some(category) => vec![category],
        None => tx
            .subtransactions
            .iter()
            .filter_map(|line| real_name(line.category.as_deref()))
            .collect(),
    }
}

pub(crate) fn real_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| {
            !SYNTHETIC_CATEGORIES
                .iter()
                .any(|synthetic| name.eq_ignore_ascii_case(synthetic))
        })
}
