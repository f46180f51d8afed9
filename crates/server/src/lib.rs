use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, LedgerError};

use serde::Serialize;
pub use server::{API_KEY_HEADER, ServerState, router, run, run_with_listener, spawn_with_listener};

mod server;
mod transactions;
pub mod views;

pub mod types {
    pub mod health {
        pub use api_types::health::Health;
    }

    pub mod shared {
        pub use api_types::shared::{SharedTransactionsView, UserSummary};
        pub use api_types::transaction::{SinceQuery, TransactionView};
    }

    pub mod split {
        pub use api_types::split::{
            MirrorView, SourceUpdateView, SplitFailureView, SplitGroupView, SplitPreviewView,
            UpsertAction, UpsertResultView, UpsertStage,
        };
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::RuleData(_) | EngineError::Ledger(LedgerError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        EngineError::Ledger(LedgerError::Auth(_)) => StatusCode::UNAUTHORIZED,
        EngineError::Mapping { .. }
        | EngineError::InvalidShare(_)
        | EngineError::Unsplittable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Ledger(LedgerError::Rejected(_) | LedgerError::Transport(_)) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Ledger(LedgerError::Transport(msg)) => {
            tracing::error!("upstream transport error: {msg}");
            "upstream service unavailable".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
