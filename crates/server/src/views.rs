//! Conversions between engine values and their JSON views.

use api_types::{
    shared::{SharedTransactionsView, UserSummary},
    split::{
        MirrorView, SourceUpdateView, SplitFailureView, SplitGroupView, SplitPreviewView,
        UpsertAction as ApiAction, UpsertResultView, UpsertStage as ApiStage,
    },
    transaction::{SubTransactionView, TransactionView},
};
use engine::{
    ClearedState, FlagColor, Milliunits, SharedTransactions, SplitFailure, SplitGroup,
    SplitPreview, SubTransaction, Transaction, TransactionDraft, TransactionPatch, UpsertAction,
    UpsertResult, UpsertStage, UserId, derive_marker, is_split_marker,
};

use crate::ServerError;

fn map_flag(flag: FlagColor) -> api_types::FlagColor {
    match flag {
        FlagColor::Red => api_types::FlagColor::Red,
        FlagColor::Orange => api_types::FlagColor::Orange,
        FlagColor::Yellow => api_types::FlagColor::Yellow,
        FlagColor::Green => api_types::FlagColor::Green,
        FlagColor::Blue => api_types::FlagColor::Blue,
        FlagColor::Purple => api_types::FlagColor::Purple,
    }
}

fn flag_from_view(flag: api_types::FlagColor) -> FlagColor {
    match flag {
        api_types::FlagColor::Red => FlagColor::Red,
        api_types::FlagColor::Orange => FlagColor::Orange,
        api_types::FlagColor::Yellow => FlagColor::Yellow,
        api_types::FlagColor::Green => FlagColor::Green,
        api_types::FlagColor::Blue => FlagColor::Blue,
        api_types::FlagColor::Purple => FlagColor::Purple,
    }
}

fn map_cleared(cleared: ClearedState) -> api_types::ClearedState {
    match cleared {
        ClearedState::Cleared => api_types::ClearedState::Cleared,
        ClearedState::Uncleared => api_types::ClearedState::Uncleared,
        ClearedState::Reconciled => api_types::ClearedState::Reconciled,
    }
}

fn cleared_from_view(cleared: api_types::ClearedState) -> ClearedState {
    match cleared {
        api_types::ClearedState::Cleared => ClearedState::Cleared,
        api_types::ClearedState::Uncleared => ClearedState::Uncleared,
        api_types::ClearedState::Reconciled => ClearedState::Reconciled,
    }
}

fn map_stage(stage: UpsertStage) -> ApiStage {
    match stage {
        UpsertStage::Split => ApiStage::Split,
        UpsertStage::Target => ApiStage::Target,
        UpsertStage::Source => ApiStage::Source,
    }
}

fn map_action(action: UpsertAction) -> ApiAction {
    match action {
        UpsertAction::Created => ApiAction::Created,
        UpsertAction::Updated => ApiAction::Updated,
        UpsertAction::Skipped => ApiAction::Skipped,
        UpsertAction::Failed => ApiAction::Failed,
    }
}

fn line_view(line: SubTransaction) -> SubTransactionView {
    SubTransactionView {
        amount: line.amount.value(),
        category_name: line.category,
        memo: line.memo,
    }
}

fn line_from_view(view: SubTransactionView) -> SubTransaction {
    SubTransaction {
        amount: Milliunits::new(view.amount),
        category: view.category_name,
        memo: view.memo,
    }
}

pub fn transaction_view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        budget_id: tx.budget_id,
        date: tx.date,
        payee_name: tx.payee,
        amount: tx.amount.value(),
        category_name: tx.category,
        memo: tx.memo,
        cleared: map_cleared(tx.cleared),
        approved: tx.approved,
        flag_color: tx.flag.map(map_flag),
        account_name: tx.account_name,
        account_id: tx.account_id,
        import_id: tx.import_id,
        deleted: tx.deleted,
        subtransactions: tx.subtransactions.into_iter().map(line_view).collect(),
    }
}

pub fn transaction_from_view(view: TransactionView) -> Transaction {
    Transaction {
        id: view.id,
        budget_id: view.budget_id,
        date: view.date,
        payee: view.payee_name,
        amount: Milliunits::new(view.amount),
        category: view.category_name,
        memo: view.memo,
        cleared: cleared_from_view(view.cleared),
        approved: view.approved,
        flag: view.flag_color.map(flag_from_view),
        account_name: view.account_name,
        account_id: view.account_id,
        import_id: view.import_id,
        deleted: view.deleted,
        subtransactions: view
            .subtransactions
            .into_iter()
            .map(line_from_view)
            .collect(),
    }
}

pub fn shared_view(shared: SharedTransactions) -> SharedTransactionsView {
    SharedTransactionsView {
        user: UserSummary {
            user_num: shared.user.0,
            budget_id: shared.budget_id,
        },
        shared_transactions: shared.transactions.into_iter().map(transaction_view).collect(),
    }
}

pub fn shared_from_view(view: SharedTransactionsView) -> SharedTransactions {
    SharedTransactions {
        user: UserId(view.user.user_num),
        budget_id: view.user.budget_id,
        transactions: view
            .shared_transactions
            .into_iter()
            .map(transaction_from_view)
            .collect(),
    }
}

fn group_view(group: SplitGroup) -> SplitGroupView {
    let source = group.source_update;
    let target = group.target;
    SplitGroupView {
        original: transaction_view(group.original),
        source_user: group.source_user.0,
        target_user: group.target_user.0,
        source: SourceUpdateView {
            budget_id: source.budget_id,
            transaction_id: source.id,
            amount: source.amount.map(Milliunits::value),
            category_name: source.category,
            flag_color: source.flag.map(map_flag),
        },
        target: MirrorView {
            budget_id: target.budget_id,
            account_name: target.account_name,
            date: target.date,
            payee_name: target.payee,
            amount: target.amount.value(),
            category_name: target.category,
            memo: target.memo,
            cleared: map_cleared(target.cleared),
            approved: target.approved,
            flag_color: target.flag.map(map_flag),
            import_id: target.import_id,
            subtransactions: target.subtransactions.into_iter().map(line_view).collect(),
        },
    }
}

/// Rebuilds a split group posted by a caller.
///
/// The mirror must carry the marker derived from its original and target
/// user, and the source update must target the original transaction.
pub fn group_from_view(view: SplitGroupView) -> Result<SplitGroup, ServerError> {
    if !is_split_marker(&view.target.import_id) {
        return Err(ServerError::Generic(format!(
            "\"{}\" is not a split marker",
            view.target.import_id
        )));
    }
    if view.target.import_id != derive_marker(&view.original.id, UserId(view.target_user)) {
        return Err(ServerError::Generic(format!(
            "marker \"{}\" does not belong to transaction {} and user {}",
            view.target.import_id, view.original.id, view.target_user
        )));
    }
    if view.source.transaction_id != view.original.id
        || view.source.budget_id != view.original.budget_id
    {
        return Err(ServerError::Generic(format!(
            "source update does not target transaction {}",
            view.original.id
        )));
    }

    let source = view.source;
    let target = view.target;
    Ok(SplitGroup {
        original: transaction_from_view(view.original),
        source_user: UserId(view.source_user),
        target_user: UserId(view.target_user),
        source_update: TransactionPatch {
            id: source.transaction_id,
            budget_id: source.budget_id,
            amount: source.amount.map(Milliunits::new),
            category: source.category_name,
            flag: source.flag_color.map(flag_from_view),
        },
        target: TransactionDraft {
            budget_id: target.budget_id,
            account_name: target.account_name,
            date: target.date,
            payee: target.payee_name,
            amount: Milliunits::new(target.amount),
            category: target.category_name,
            memo: target.memo,
            cleared: cleared_from_view(target.cleared),
            approved: target.approved,
            flag: target.flag_color.map(flag_from_view),
            import_id: target.import_id,
            subtransactions: target
                .subtransactions
                .into_iter()
                .map(line_from_view)
                .collect(),
        },
    })
}

fn failure_view(failure: SplitFailure) -> SplitFailureView {
    SplitFailureView {
        transaction: transaction_view(failure.transaction),
        source_user: failure.source_user.0,
        target_user: failure.target_user.0,
        error: failure.error,
    }
}

pub fn preview_view(preview: SplitPreview) -> SplitPreviewView {
    SplitPreviewView {
        groups: preview.groups.into_iter().map(group_view).collect(),
        failures: preview.failures.into_iter().map(failure_view).collect(),
    }
}

pub fn upsert_view(result: UpsertResult) -> UpsertResultView {
    UpsertResultView {
        stage: map_stage(result.stage),
        action: map_action(result.action),
        budget_id: result.budget_id,
        transaction_id: result.transaction_id,
        original_id: result.original_id,
        source_user: result.source_user.0,
        target_user: result.target_user.map(|user| user.0),
        response: result.response,
        error: result.error,
    }
}
