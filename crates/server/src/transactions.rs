//! Shared transactions API endpoints

use api_types::{
    shared::SharedTransactionsView,
    split::{SplitGroupView, SplitPreviewView, UpsertResultView},
    transaction::SinceQuery,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use engine::{Ledger, RuleStore};
use serde::de::DeserializeOwned;

use crate::{ServerError, server::ServerState, views};

fn since(query: Result<Query<SinceQuery>, QueryRejection>) -> Result<Option<NaiveDate>, ServerError> {
    match query {
        Ok(Query(query)) => Ok(query.since_date),
        Err(err) => Err(ServerError::Generic(err.body_text())),
    }
}

/// An empty body means "compute it yourself".
fn optional_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<Vec<T>>, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map_err(|err| ServerError::Generic(format!("invalid body: {err}")))
}

/// Handle requests listing every user's shared transactions
pub async fn shared<R: RuleStore, L: Ledger>(
    State(state): State<ServerState<R, L>>,
    query: Result<Query<SinceQuery>, QueryRejection>,
) -> Result<Json<Vec<SharedTransactionsView>>, ServerError> {
    let since = since(query)?;
    let shared = state.engine.get_shared(since).await?;

    Ok(Json(shared.into_iter().map(views::shared_view).collect()))
}

/// Handle requests computing splits without writing them
pub async fn preview<R: RuleStore, L: Ledger>(
    State(state): State<ServerState<R, L>>,
    query: Result<Query<SinceQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<SplitPreviewView>, ServerError> {
    let since = since(query)?;
    let shared = optional_body::<SharedTransactionsView>(&body)?
        .map(|shared| shared.into_iter().map(views::shared_from_view).collect());

    let preview = state.engine.preview_split(shared, since).await?;

    Ok(Json(views::preview_view(preview)))
}

/// Handle requests writing splits to the ledger
pub async fn apply<R: RuleStore, L: Ledger>(
    State(state): State<ServerState<R, L>>,
    query: Result<Query<SinceQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Vec<UpsertResultView>>, ServerError> {
    let since = since(query)?;
    let groups = optional_body::<SplitGroupView>(&body)?
        .map(|groups| {
            groups
                .into_iter()
                .map(views::group_from_view)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let results = state.engine.apply_split(groups, since).await?;
    let failed = results.iter().filter(|result| result.is_failure()).count();
    if failed > 0 {
        tracing::warn!("split applied with {failed} failed writes");
    }

    Ok(Json(results.into_iter().map(views::upsert_view).collect()))
}
