//! Splitting a shared transaction between its owner and one counterpart.

use crate::{
    CategoryMapping, ClearedState, EngineError, Milliunits, ResultEngine, RuleSet, SubTransaction,
    Transaction, TransactionDraft, TransactionPatch, User, UserId, derive_marker,
    select::{in_shared_account, real_category, real_name},
};

/// One shared transaction split towards one counterpart.
///
/// `source_update.amount + target.amount == original.amount` holds for every
/// group that reduces its original. A group built from a transaction of the
/// owner's shared account leaves the original as is, see
/// [`keeps_original`](Self::keeps_original).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitGroup {
    pub original: Transaction,
    pub source_user: UserId,
    pub target_user: UserId,
    /// Reduced amount and split flag for the original.
    pub source_update: TransactionPatch,
    /// Mirror to create in the counterpart's budget.
    pub target: TransactionDraft,
}

impl SplitGroup {
    /// Amount kept by the source user.
    #[must_use]
    pub fn source_amount(&self) -> Milliunits {
        self.source_update.amount.unwrap_or(self.original.amount)
    }

    /// `true` when only the mirror is written and the original stays as is.
    #[must_use]
    pub fn keeps_original(&self) -> bool {
        self.source_update.amount.is_none()
    }
}

/// Splits `tx` (owned by `source`) towards `target`.
///
/// The counterpart's portion is `amount * f` rounded half away from zero,
/// where `f` is the mapping row's share override or else `target.share`. The
/// source keeps the remainder.
///
/// A transaction of the source's shared account was paid with common money:
/// the counterpart gets the whole amount with its sign flipped and the
/// original is not touched. Split parents are mirrored line by line in that
/// case; anywhere else they fail with [`EngineError::Unsplittable`] because
/// the ledger cannot reduce a split parent.
///
/// Fails with [`EngineError::Mapping`] when no category can be found for the
/// counterpart, and with [`EngineError::RuleData`] when the counterpart has no
/// shared account to receive the mirror.
pub fn split(
    tx: &Transaction,
    source: &User,
    target: &User,
    rules: &RuleSet,
) -> ResultEngine<SplitGroup> {
    if source.id == target.id {
        return Err(EngineError::RuleData(format!(
            "cannot split transaction {} of user {} with themselves",
            tx.id, source.id
        )));
    }
    if target.shared_account.trim().is_empty() {
        return Err(EngineError::RuleData(format!(
            "user {} has no shared account to receive transaction {}",
            target.id, tx.id
        )));
    }

    let mirror_only = in_shared_account(tx, source);
    if tx.is_split_parent() && !mirror_only {
        return Err(EngineError::Unsplittable {
            transaction: tx.id.clone(),
            reason: "the ledger cannot reduce a transaction split across categories".to_string(),
        });
    }

    let source_category = real_category(tx);
    let row = match source_category {
        Some(category) => rules.row_for(source.id, category)?,
        None => None,
    };

    let (target_amount, source_update) = if mirror_only {
        let flipped = tx.amount.checked_neg().ok_or_else(|| {
            EngineError::InvalidShare(format!("{} overflows for transaction {}", tx.amount, tx.id))
        })?;
        (flipped, TransactionPatch::new(&tx.budget_id, &tx.id))
    } else {
        let fraction = row
            .and_then(|row| row.share_override)
            .unwrap_or(target.share);
        let portion = fraction.portion(tx.amount).ok_or_else(|| {
            EngineError::InvalidShare(format!(
                "{fraction} of {} overflows for transaction {}",
                tx.amount, tx.id
            ))
        })?;
        let update = TransactionPatch::new(&tx.budget_id, &tx.id)
            .amount(tx.amount - portion)
            .flag(source.split_flag);
        (portion, update)
    };

    let (target_category, lines) = if tx.subtransactions.len() > 1 {
        let lines = tx
            .subtransactions
            .iter()
            .map(|line| mirror_line(line, source, target, rules))
            .collect::<ResultEngine<Vec<_>>>()?;
        (None, lines)
    } else {
        let category = counterpart_category(row, source_category, target, rules)?;
        (Some(category.to_string()), Vec::new())
    };

    let target_draft = TransactionDraft {
        budget_id: target.budget_id.clone(),
        account_name: target.shared_account.clone(),
        date: tx.date,
        payee: tx.payee.clone(),
        amount: target_amount,
        category: target_category,
        memo: tx.memo.clone(),
        cleared: ClearedState::Uncleared,
        approved: false,
        flag: None,
        import_id: derive_marker(&tx.id, target.id),
        subtransactions: lines,
    };

    Ok(SplitGroup {
        original: tx.clone(),
        source_user: source.id,
        target_user: target.id,
        source_update,
        target: target_draft,
    })
}

/// Counterpart category of `row`, falling back to the default row.
fn counterpart_category<'r>(
    row: Option<&'r CategoryMapping>,
    source_category: Option<&str>,
    target: &User,
    rules: &'r RuleSet,
) -> ResultEngine<&'r str> {
    row.and_then(|row| row.category_for(target.id))
        .or_else(|| rules.default_row().and_then(|row| row.category_for(target.id)))
        .ok_or_else(|| EngineError::Mapping {
            category: source_category.unwrap_or_default().to_string(),
            target_user: target.id,
        })
}

/// One line of a mirrored split parent: the full line amount, flipped.
fn mirror_line(
    line: &SubTransaction,
    source: &User,
    target: &User,
    rules: &RuleSet,
) -> ResultEngine<SubTransaction> {
    let category = real_name(line.category.as_deref());
    let row = match category {
        Some(category) => rules.row_for(source.id, category)?,
        None => None,
    };
    let mapped = counterpart_category(row, category, target, rules)?;
    let amount = line.amount.checked_neg().ok_or_else(|| {
        EngineError::InvalidShare(format!("line amount {} overflows", line.amount))
    })?;
    Ok(SubTransaction {
        amount,
        category: Some(mapped.to_string()),
        memo: line.memo.clone(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{FlagColor, ShareFraction};

    fn share(raw: &str) -> ShareFraction {
        raw.parse().unwrap()
    }

    fn users() -> (User, User) {
        let alice = User::new(UserId(1), "Alice", share("0.5"))
            .budget_id("budget-a")
            .shared_account("Shared A");
        let bob = User::new(UserId(2), "Bob", share("0.5"))
            .budget_id("budget-b")
            .shared_account("Shared B");
        (alice, bob)
    }

    fn rules(rows: Vec<CategoryMapping>) -> RuleSet {
        let (alice, bob) = users();
        RuleSet::new(vec![alice, bob], rows).unwrap()
    }

    fn rent_row() -> CategoryMapping {
        CategoryMapping::new(true)
            .category(UserId(1), "Rent")
            .category(UserId(2), "Rent-Split")
    }

    fn tx(amount: i64, category: &str) -> Transaction {
        Transaction::new(
            "t1",
            "budget-a",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            Milliunits::new(amount),
        )
        .payee("Landlord")
        .memo("March")
        .category(category)
    }

    #[test]
    fn rent_is_split_in_half() {
        let (alice, bob) = users();
        let group = split(&tx(-10_000, "Rent"), &alice, &bob, &rules(vec![rent_row()])).unwrap();

        assert_eq!(group.target.amount, Milliunits::new(-5_000));
        assert_eq!(group.source_update.amount, Some(Milliunits::new(-5_000)));
        assert_eq!(group.source_update.flag, Some(FlagColor::Purple));
        assert_eq!(group.target.category.as_deref(), Some("Rent-Split"));
        assert_eq!(group.target.budget_id, "budget-b");
        assert_eq!(group.target.account_name, "Shared B");
        assert_eq!(group.target.payee, "Landlord");
        assert_eq!(group.target.import_id, derive_marker("t1", UserId(2)));
    }

    #[test]
    fn odd_amounts_round_towards_the_target() {
        let (alice, bob) = users();
        let group = split(&tx(101, "Rent"), &alice, &bob, &rules(vec![rent_row()])).unwrap();
        assert_eq!(group.target.amount, Milliunits::new(51));
        assert_eq!(group.source_amount(), Milliunits::new(50));
    }

    #[test]
    fn zero_amount_splits_to_zero() {
        let (alice, bob) = users();
        let group = split(&tx(0, "Rent"), &alice, &bob, &rules(vec![rent_row()])).unwrap();
        assert!(group.target.amount.is_zero());
        assert!(group.source_amount().is_zero());
    }

    #[test]
    fn share_override_wins_over_user_share() {
        let (alice, bob) = users();
        let row = rent_row().share_override(share("0.3"));
        let group = split(&tx(-10_000, "Rent"), &alice, &bob, &rules(vec![row])).unwrap();
        assert_eq!(group.target.amount, Milliunits::new(-3_000));
        assert_eq!(group.source_amount(), Milliunits::new(-7_000));
    }

    #[test]
    fn missing_target_category_falls_back_to_default_row() {
        let (alice, bob) = users();
        let rows = vec![
            CategoryMapping::new(true).category(UserId(1), "Utilities"),
            CategoryMapping::new(false)
                .alias("Default")
                .category(UserId(2), "Shared expenses"),
        ];
        let group = split(&tx(-2_000, "Utilities"), &alice, &bob, &rules(rows)).unwrap();
        assert_eq!(group.target.category.as_deref(), Some("Shared expenses"));
    }

    #[test]
    fn missing_target_category_is_mapping_error() {
        let (alice, bob) = users();
        let rows = vec![CategoryMapping::new(true).category(UserId(1), "Utilities")];
        let err = split(&tx(-2_000, "Utilities"), &alice, &bob, &rules(rows)).unwrap_err();
        assert_eq!(
            err,
            EngineError::Mapping {
                category: "Utilities".to_string(),
                target_user: UserId(2),
            }
        );
    }

    #[test]
    fn shared_account_transaction_is_mirrored_whole() {
        let (alice, bob) = users();
        let tx = tx(-10_000, "Rent").account("Shared A").flag(FlagColor::Blue);
        let group = split(&tx, &alice, &bob, &rules(vec![rent_row()])).unwrap();

        assert_eq!(group.target.amount, Milliunits::new(10_000));
        assert_eq!(group.target.category.as_deref(), Some("Rent-Split"));
        assert!(group.keeps_original());
        assert_eq!(group.source_update.flag, None);
        assert_eq!(group.source_amount(), Milliunits::new(-10_000));
    }

    fn split_parent(account: &str) -> Transaction {
        let mut parent = tx(-3_000, "Split").account(account);
        parent.category = None;
        parent.subtransactions(vec![
            SubTransaction::new(Milliunits::new(-2_000), "Rent"),
            SubTransaction::new(Milliunits::new(-1_000), "Utilities"),
        ])
    }

    #[test]
    fn split_parent_outside_the_shared_account_is_unsplittable() {
        let (alice, bob) = users();
        let err = split(&split_parent("Checking"), &alice, &bob, &rules(vec![rent_row()]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Unsplittable { transaction, .. } if transaction == "t1"));
    }

    #[test]
    fn split_parent_in_the_shared_account_is_mirrored_by_line() {
        let (alice, bob) = users();
        let rows = vec![
            rent_row(),
            CategoryMapping::new(true)
                .category(UserId(1), "Utilities")
                .category(UserId(2), "Bills"),
        ];
        let group = split(&split_parent("Shared A"), &alice, &bob, &rules(rows)).unwrap();

        assert_eq!(group.target.amount, Milliunits::new(3_000));
        assert_eq!(group.target.category, None);
        assert_eq!(
            group.target.subtransactions,
            [
                SubTransaction::new(Milliunits::new(2_000), "Rent-Split"),
                SubTransaction::new(Milliunits::new(1_000), "Bills"),
            ]
        );
        assert!(group.keeps_original());
    }

    #[test]
    fn counterpart_without_shared_account_is_rule_data_error() {
        let (alice, bob) = users();
        let bob = User {
            shared_account: String::new(),
            ..bob
        };
        let err = split(&tx(-2_000, "Rent"), &alice, &bob, &rules(vec![rent_row()])).unwrap_err();
        assert!(matches!(err, EngineError::RuleData(_)));
    }
}
