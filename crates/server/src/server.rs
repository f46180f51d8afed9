use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::{net::SocketAddr, sync::Arc};

use crate::transactions;
use api_types::health::Health;
use engine::{Engine, Ledger, RuleStore};

pub static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

pub struct ServerState<R, L> {
    pub engine: Arc<Engine<R, L>>,
    pub api_key: Arc<str>,
}

impl<R, L> Clone for ServerState<R, L> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            api_key: Arc::clone(&self.api_key),
        }
    }
}

/// `TypedHeader` for the shared secret
///
/// Every request but the health check must carry it in "x-api-key".
#[derive(Debug)]
struct ApiKeyHeader(String);

impl Header for ApiKeyHeader {
    fn name() -> &'static HeaderName {
        &API_KEY_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };

        Ok(ApiKeyHeader(value.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-api-key header"),
        }
    }
}

async fn auth<R, L>(
    api_key: Option<TypedHeader<ApiKeyHeader>>,
    State(state): State<ServerState<R, L>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(ApiKeyHeader(key))) = api_key else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if state.api_key.is_empty() || key != *state.api_key {
        tracing::debug!("rejected request with a wrong api key");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "Ok".to_string(),
    })
}

pub fn router<R, L>(state: ServerState<R, L>) -> Router
where
    R: RuleStore + 'static,
    L: Ledger + 'static,
{
    let protected = Router::new()
        .route("/transactions/shared", get(transactions::shared::<R, L>))
        .route(
            "/transactions/split/preview",
            post(transactions::preview::<R, L>),
        )
        .route("/transactions/split", post(transactions::apply::<R, L>))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::<R, L>));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

pub async fn run<R, L>(engine: Engine<R, L>, api_key: String, addr: SocketAddr)
where
    R: RuleStore + 'static,
    L: Ledger + 'static,
{
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, api_key, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener<R, L>(
    engine: Engine<R, L>,
    api_key: String,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error>
where
    R: RuleStore + 'static,
    L: Ledger + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        api_key: Arc::from(api_key),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener<R, L>(
    engine: Engine<R, L>,
    api_key: String,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error>
where
    R: RuleStore + 'static,
    L: Ledger + 'static,
{
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, api_key, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
