use std::sync::Arc;

use engine::{
    CategoryMapping, EngineError, FlagColor, Milliunits, SubTransaction, Transaction,
    UpsertAction, UpsertStage, UserId, derive_marker,
};

mod support;

use support::{MemoryLedger, alice, bob, date, engine, purple, rent_row, tx, user};

fn household_ledger() -> Arc<MemoryLedger> {
    Arc::new(
        MemoryLedger::default()
            .with_budget(
                "budget-alice",
                vec![
                    tx("t1", "budget-alice", -10_000, "Rent"),
                    tx("t2", "budget-alice", -2_500, "Fun money"),
                ],
            )
            .with_budget("budget-bob", vec![]),
    )
}

fn household_rows() -> Vec<CategoryMapping> {
    vec![
        rent_row(),
        CategoryMapping::new(false)
            .category(UserId(1), "Fun money")
            .category(UserId(2), "Fun money"),
    ]
}

#[tokio::test]
async fn get_shared_selects_rent_only() {
    let engine = engine(vec![alice(), bob()], household_rows(), household_ledger());

    let shared = engine.get_shared(Some(date(1))).await.unwrap();

    assert_eq!(shared.len(), 2);
    assert_eq!(shared[0].user, UserId(1));
    assert_eq!(shared[0].budget_id, "budget-alice");
    let ids: Vec<&str> = shared[0].transactions.iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, ["t1"]);
    assert!(shared[1].transactions.is_empty());
}

#[tokio::test]
async fn since_date_filters_older_transactions() {
    let engine = engine(vec![alice(), bob()], household_rows(), household_ledger());

    let shared = engine.get_shared(Some(date(11))).await.unwrap();

    assert!(shared.iter().all(|entry| entry.transactions.is_empty()));
}

#[tokio::test]
async fn preview_splits_rent_in_half() {
    let engine = engine(vec![alice(), bob()], household_rows(), household_ledger());

    let preview = engine.preview_split(None, Some(date(1))).await.unwrap();

    assert!(preview.failures.is_empty());
    assert_eq!(preview.groups.len(), 1);
    let group = &preview.groups[0];
    assert_eq!(group.source_user, UserId(1));
    assert_eq!(group.target_user, UserId(2));
    assert_eq!(group.target.amount, Milliunits::new(-5_000));
    assert_eq!(group.source_update.amount, Some(Milliunits::new(-5_000)));
    assert_eq!(group.target.category.as_deref(), Some("Rent-Split"));
    assert_eq!(group.target.budget_id, "budget-bob");
    assert_eq!(group.target.import_id, derive_marker("t1", UserId(2)));
}

#[tokio::test]
async fn apply_creates_mirror_and_reduces_original() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].stage, UpsertStage::Target);
    assert_eq!(results[0].action, UpsertAction::Created);
    assert_eq!(results[0].budget_id, "budget-bob");
    assert!(results[0].response.is_some());
    assert_eq!(results[1].stage, UpsertStage::Source);
    assert_eq!(results[1].action, UpsertAction::Updated);
    assert_eq!(results[1].transaction_id.as_deref(), Some("t1"));

    let original = ledger.find("budget-alice", "t1");
    assert_eq!(original.amount, Milliunits::new(-5_000));
    assert_eq!(original.flag, purple());

    let mirrors = ledger.transactions("budget-bob");
    assert_eq!(mirrors.len(), 1);
    assert_eq!(mirrors[0].amount, Milliunits::new(-5_000));
    assert_eq!(mirrors[0].category.as_deref(), Some("Rent-Split"));
    assert_eq!(mirrors[0].account_name, "Shared Bob");
    assert_eq!(
        mirrors[0].import_id.as_deref(),
        Some(derive_marker("t1", UserId(2)).as_str())
    );
}

#[tokio::test]
async fn applying_the_same_preview_twice_only_skips() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());
    let preview = engine.preview_split(None, Some(date(1))).await.unwrap();

    let first = engine
        .apply_split(Some(preview.groups.clone()), None)
        .await
        .unwrap();
    assert!(first.iter().all(|r| r.action != UpsertAction::Skipped));
    let writes = ledger.write_count();

    let bob_after_first = ledger.transactions("budget-bob");
    let alice_after_first = ledger.transactions("budget-alice");

    let second = engine
        .apply_split(Some(preview.groups.clone()), None)
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|r| r.action == UpsertAction::Skipped));
    assert_eq!(ledger.write_count(), writes);
    assert_eq!(bob_after_first.len(), 1);
    assert_eq!(ledger.transactions("budget-bob"), bob_after_first);
    assert_eq!(ledger.transactions("budget-alice"), alice_after_first);
}

#[tokio::test]
async fn split_transactions_are_not_selected_again() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());
    engine.apply_split(None, Some(date(1))).await.unwrap();

    let preview = engine.preview_split(None, Some(date(1))).await.unwrap();
    assert!(preview.groups.is_empty());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(ledger.transactions("budget-bob").len(), 1);
}

#[tokio::test]
async fn odd_amount_rounds_towards_counterpart() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", 101, "Rent")])
            .with_budget("budget-bob", vec![]),
    );
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());

    engine.apply_split(None, Some(date(1))).await.unwrap();

    assert_eq!(ledger.transactions("budget-bob")[0].amount, Milliunits::new(51));
    assert_eq!(ledger.find("budget-alice", "t1").amount, Milliunits::new(50));
}

#[tokio::test]
async fn unmapped_category_without_default_aborts() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", -800, "Misc")])
            .with_budget("budget-bob", vec![]),
    );
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());

    let err = engine.get_shared(Some(date(1))).await.unwrap_err();
    assert!(matches!(err, EngineError::RuleData(_)));

    let err = engine.apply_split(None, Some(date(1))).await.unwrap_err();
    assert!(matches!(err, EngineError::RuleData(_)));
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn mapping_error_is_isolated_to_its_transaction() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget(
                "budget-alice",
                vec![
                    tx("t1", "budget-alice", -3_000, "Utilities"),
                    tx("t2", "budget-alice", -10_000, "Rent"),
                ],
            )
            .with_budget("budget-bob", vec![]),
    );
    let rows = vec![
        rent_row(),
        CategoryMapping::new(true).category(UserId(1), "Utilities"),
    ];
    let engine = engine(vec![alice(), bob()], rows, ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].stage, UpsertStage::Split);
    assert_eq!(results[0].action, UpsertAction::Failed);
    assert_eq!(results[0].original_id, "t1");
    assert!(results[0].error.as_deref().unwrap().contains("Utilities"));
    assert_eq!(results[1].action, UpsertAction::Created);
    assert_eq!(results[2].action, UpsertAction::Updated);
    assert_eq!(ledger.find("budget-alice", "t1").amount, Milliunits::new(-3_000));
}

#[tokio::test]
async fn failed_mirror_leaves_original_untouched() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", -10_000, "Rent")])
            .with_budget("budget-bob", vec![])
            .failing("budget-bob"),
    );
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].stage, UpsertStage::Target);
    assert_eq!(results[0].action, UpsertAction::Failed);
    assert!(results[0].error.is_some());
    assert_eq!(results[1].stage, UpsertStage::Source);
    assert_eq!(results[1].action, UpsertAction::Failed);

    let original = ledger.find("budget-alice", "t1");
    assert_eq!(original.amount, Milliunits::new(-10_000));
    assert_eq!(original.flag, None);
}

#[tokio::test]
async fn three_way_split_reduces_original_by_written_mirrors() {
    let carol = user(3, "Carol", "0.25");
    let bob = user(2, "Bob", "0.25");
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", -10_000, "Rent")])
            .with_budget("budget-bob", vec![])
            .with_budget("budget-carol", vec![])
            .failing("budget-bob"),
    );
    let engine = engine(vec![alice(), bob, carol], vec![rent_row()], ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    let actions: Vec<(UpsertStage, UpsertAction)> =
        results.iter().map(|r| (r.stage, r.action)).collect();
    assert_eq!(
        actions,
        [
            (UpsertStage::Target, UpsertAction::Failed),
            (UpsertStage::Target, UpsertAction::Created),
            (UpsertStage::Source, UpsertAction::Updated),
        ]
    );
    assert_eq!(
        ledger.transactions("budget-carol")[0].amount,
        Milliunits::new(-2_500)
    );
    assert_eq!(ledger.find("budget-alice", "t1").amount, Milliunits::new(-7_500));
}

#[tokio::test]
async fn edited_mirror_is_corrected() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());
    let preview = engine.preview_split(None, Some(date(1))).await.unwrap();
    engine
        .apply_split(Some(preview.groups.clone()), None)
        .await
        .unwrap();

    let mirror_id = ledger.transactions("budget-bob")[0].id.clone();
    ledger.edit("budget-bob", &mirror_id, |tx| {
        tx.amount = Milliunits::new(-4_000);
        tx.category = Some("Groceries".to_string());
    });

    let results = engine
        .apply_split(Some(preview.groups.clone()), None)
        .await
        .unwrap();

    assert_eq!(results[0].action, UpsertAction::Updated);
    assert_eq!(results[1].action, UpsertAction::Skipped);
    let mirror = ledger.find("budget-bob", &mirror_id);
    assert_eq!(mirror.amount, Milliunits::new(-5_000));
    assert_eq!(mirror.category.as_deref(), Some("Rent-Split"));
}

#[tokio::test]
async fn deleted_mirror_is_not_recreated() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());
    let preview = engine.preview_split(None, Some(date(1))).await.unwrap();
    engine
        .apply_split(Some(preview.groups.clone()), None)
        .await
        .unwrap();
    let mirror_id = ledger.transactions("budget-bob")[0].id.clone();
    ledger.edit("budget-bob", &mirror_id, |tx| tx.deleted = true);

    let results = engine
        .apply_split(Some(preview.groups.clone()), None)
        .await
        .unwrap();

    assert_eq!(results[0].action, UpsertAction::Skipped);
    assert_eq!(results[1].stage, UpsertStage::Source);
    assert_eq!(results[1].action, UpsertAction::Skipped);
    assert_eq!(ledger.transactions("budget-bob").len(), 1);
    let original = ledger.find("budget-alice", "t1");
    assert_eq!(original.amount, Milliunits::new(-5_000));
}

#[tokio::test]
async fn deleted_mirror_keeps_the_original_whole() {
    let mirror = tx("m1", "budget-bob", -5_000, "Rent-Split")
        .import_id(derive_marker("t1", UserId(2)))
        .deleted(true);
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", -10_000, "Rent")])
            .with_budget("budget-bob", vec![mirror]),
    );
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    let actions: Vec<(UpsertStage, UpsertAction)> =
        results.iter().map(|r| (r.stage, r.action)).collect();
    assert_eq!(
        actions,
        [
            (UpsertStage::Target, UpsertAction::Skipped),
            (UpsertStage::Source, UpsertAction::Skipped),
        ]
    );
    assert_eq!(ledger.write_count(), 0);
    let original = ledger.find("budget-alice", "t1");
    assert_eq!(original.amount, Milliunits::new(-10_000));
    assert_eq!(original.flag, None);
}

#[tokio::test]
async fn deleted_mirror_is_not_counted_in_a_three_way_split() {
    let carol = user(3, "Carol", "0.25");
    let bob = user(2, "Bob", "0.25");
    let deleted = tx("m1", "budget-bob", -2_500, "Rent-Split")
        .import_id(derive_marker("t1", UserId(2)))
        .deleted(true);
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", -10_000, "Rent")])
            .with_budget("budget-bob", vec![deleted])
            .with_budget("budget-carol", vec![]),
    );
    let engine = engine(vec![alice(), bob, carol], vec![rent_row()], ledger.clone());

    engine.apply_split(None, Some(date(1))).await.unwrap();

    let carol_total: Milliunits = ledger
        .transactions("budget-carol")
        .iter()
        .map(|tx| tx.amount)
        .sum();
    let alice_amount = ledger.find("budget-alice", "t1").amount;
    assert_eq!(carol_total, Milliunits::new(-2_500));
    assert_eq!(alice_amount, Milliunits::new(-7_500));
    assert_eq!(alice_amount + carol_total, Milliunits::new(-10_000));
}

#[tokio::test]
async fn budget_names_are_resolved_through_the_ledger() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("b-123", vec![tx("t1", "b-123", -10_000, "Rent")])
            .with_budget("budget-bob", vec![])
            .named("b-123", "Alice's Budget")
            .named("budget-bob", "Bob's Budget"),
    );
    let mut alice = alice();
    alice.budget_id = String::new();
    let alice = alice.budget_name("alice");
    let engine = engine(vec![alice, bob()], household_rows(), ledger);

    let shared = engine.get_shared(Some(date(1))).await.unwrap();

    assert_eq!(shared[0].budget_id, "b-123");
    assert_eq!(shared[0].transactions.len(), 1);
}

#[tokio::test]
async fn users_with_unknown_budgets_are_skipped() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![tx("t1", "budget-alice", -10_000, "Rent")]),
    );
    let engine = engine(vec![alice(), bob()], household_rows(), ledger);

    let shared = engine.get_shared(Some(date(1))).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].user, UserId(1));

    let preview = engine.preview_split(None, Some(date(1))).await.unwrap();
    assert!(preview.groups.is_empty());
}

#[tokio::test]
async fn preview_accepts_caller_supplied_shared_transactions() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());
    let shared = engine.get_shared(Some(date(1))).await.unwrap();

    let mut edited = shared.clone();
    edited[0].transactions[0].amount = Milliunits::new(-6_000);
    let preview = engine.preview_split(Some(edited), None).await.unwrap();

    assert_eq!(preview.groups[0].target.amount, Milliunits::new(-3_000));
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn pruned_input_still_splits_towards_every_user() {
    let ledger = household_ledger();
    let engine = engine(vec![alice(), bob()], household_rows(), ledger);
    let shared: Vec<_> = engine
        .get_shared(Some(date(1)))
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| !entry.transactions.is_empty())
        .collect();
    assert_eq!(shared.len(), 1);

    let preview = engine.preview_split(Some(shared), None).await.unwrap();

    assert!(preview.failures.is_empty());
    assert_eq!(preview.groups.len(), 1);
    assert_eq!(preview.groups[0].target_user, UserId(2));
    assert_eq!(preview.groups[0].target.budget_id, "budget-bob");
}

#[tokio::test]
async fn unknown_user_in_supplied_input_is_rule_data_error() {
    let engine = engine(vec![alice(), bob()], household_rows(), household_ledger());
    let mut shared = engine.get_shared(Some(date(1))).await.unwrap();
    shared[0].user = UserId(9);

    let err = engine.preview_split(Some(shared), None).await.unwrap_err();
    assert!(matches!(err, EngineError::RuleData(_)));
}

#[tokio::test]
async fn share_flag_marks_uncategorized_transaction() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget(
                "budget-alice",
                vec![
                    Transaction::new("t1", "budget-alice", date(12), Milliunits::new(-900))
                        .flag(FlagColor::Blue),
                ],
            )
            .with_budget("budget-bob", vec![]),
    );
    let rows = vec![
        rent_row(),
        CategoryMapping::new(false)
            .alias("Default")
            .category(UserId(2), "Shared misc"),
    ];
    let alice = alice().share_flag(FlagColor::Blue);
    let engine = engine(vec![alice, bob()], rows, ledger.clone());

    engine.apply_split(None, Some(date(1))).await.unwrap();

    let mirror = &ledger.transactions("budget-bob")[0];
    assert_eq!(mirror.category.as_deref(), Some("Shared misc"));
    assert_eq!(mirror.amount, Milliunits::new(-450));
    let original = ledger.find("budget-alice", "t1");
    assert_eq!(original.flag, purple());
}

#[tokio::test]
async fn shared_account_purchase_is_mirrored_whole() {
    let paid_jointly = tx("t1", "budget-alice", -8_000, "Rent")
        .account("Shared Alice")
        .flag(FlagColor::Blue);
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![paid_jointly])
            .with_budget("budget-bob", vec![]),
    );
    let alice = alice().share_flag(FlagColor::Blue);
    let engine = engine(vec![alice, bob()], household_rows(), ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    let actions: Vec<(UpsertStage, UpsertAction)> =
        results.iter().map(|r| (r.stage, r.action)).collect();
    assert_eq!(
        actions,
        [
            (UpsertStage::Target, UpsertAction::Created),
            (UpsertStage::Source, UpsertAction::Skipped),
        ]
    );
    let mirror = &ledger.transactions("budget-bob")[0];
    assert_eq!(mirror.amount, Milliunits::new(8_000));
    assert_eq!(mirror.category.as_deref(), Some("Rent-Split"));
    let original = ledger.find("budget-alice", "t1");
    assert_eq!(original.amount, Milliunits::new(-8_000));
    assert_eq!(original.flag, Some(FlagColor::Blue));

    let again = engine.apply_split(None, Some(date(1))).await.unwrap();
    assert!(again.iter().all(|r| r.action == UpsertAction::Skipped));
    assert_eq!(ledger.transactions("budget-bob").len(), 1);
}

fn groceries_and_rent(id: &str, account: &str) -> Transaction {
    Transaction::new(id, "budget-alice", date(10), Milliunits::new(-6_000))
        .payee("Market")
        .account(account)
        .flag(FlagColor::Blue)
        .subtransactions(vec![
            SubTransaction::new(Milliunits::new(-4_000), "Rent"),
            SubTransaction::new(Milliunits::new(-2_000), "Fun money"),
        ])
}

#[tokio::test]
async fn split_parent_is_reported_instead_of_patched() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![groceries_and_rent("t1", "Checking")])
            .with_budget("budget-bob", vec![]),
    );
    let engine = engine(vec![alice(), bob()], household_rows(), ledger.clone());

    let results = engine.apply_split(None, Some(date(1))).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].stage, UpsertStage::Split);
    assert_eq!(results[0].action, UpsertAction::Failed);
    assert!(results[0].error.as_deref().unwrap().contains("t1"));
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn split_parent_paid_jointly_is_mirrored_by_line() {
    let ledger = Arc::new(
        MemoryLedger::default()
            .with_budget("budget-alice", vec![groceries_and_rent("t1", "Shared Alice")])
            .with_budget("budget-bob", vec![]),
    );
    let alice = alice().share_flag(FlagColor::Blue);
    let engine = engine(vec![alice, bob()], household_rows(), ledger.clone());

    engine.apply_split(None, Some(date(1))).await.unwrap();
    let mirrors = ledger.transactions("budget-bob");

    assert_eq!(mirrors.len(), 1);
    assert_eq!(mirrors[0].amount, Milliunits::new(6_000));
    assert_eq!(mirrors[0].category, None);
    assert_eq!(
        mirrors[0].subtransactions,
        [
            SubTransaction::new(Milliunits::new(4_000), "Rent-Split"),
            SubTransaction::new(Milliunits::new(2_000), "Fun money"),
        ]
    );
    assert_eq!(ledger.find("budget-alice", "t1").amount, Milliunits::new(-6_000));

    let again = engine.apply_split(None, Some(date(1))).await.unwrap();
    assert!(again.iter().all(|r| r.action == UpsertAction::Skipped));
    assert_eq!(ledger.transactions("budget-bob"), mirrors);
}
