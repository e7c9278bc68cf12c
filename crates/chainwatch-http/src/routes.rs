//! Route handlers.
//!
//! | Method | Path                       | Response                          |
//! |--------|----------------------------|-----------------------------------|
//! | GET    | `/current-block`           | `{current_block}`                 |
//! | POST   | `/subscribe`               | `{address, isSubscribed}`         |
//! | GET    | `/transactions/{address}`  | `{address, transactions}`         |
//! | GET    | `/status`                  | engine counters and store sizes   |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use chainwatch_core::{Address, QueryFacade, Transaction, WatchStatus};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentBlockResponse {
    pub current_block: u64,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub address: Address,
    pub is_subscribed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub address: Address,
    pub transactions: Vec<Transaction>,
}

/// Build the API router over `facade`.
pub fn router(facade: QueryFacade) -> Router {
    Router::new()
        .route("/current-block", get(current_block))
        .route("/subscribe", post(subscribe))
        .route("/transactions/", get(missing_address))
        .route("/transactions/:address", get(transactions))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(facade)
}

async fn current_block(State(facade): State<QueryFacade>) -> Json<CurrentBlockResponse> {
    Json(CurrentBlockResponse {
        current_block: facade.current_height().await,
    })
}

async fn subscribe(
    State(facade): State<QueryFacade>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let Json(req) = payload?;
    let address = Address::parse(&req.address)?;
    let is_subscribed = facade.subscribe(address.clone()).await;
    Ok(Json(SubscribeResponse {
        address,
        is_subscribed,
    }))
}

async fn missing_address() -> ApiError {
    ApiError::BadRequest("address is required".into())
}

async fn transactions(
    State(facade): State<QueryFacade>,
    Path(raw): Path<String>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let address = Address::parse(&raw)?;
    let transactions = facade
        .transactions_for(&address)
        .await
        .filter(|txs| !txs.is_empty())
        .ok_or_else(|| {
            ApiError::NotFound("no transactions found for the provided address".into())
        })?;
    Ok(Json(TransactionsResponse {
        address,
        transactions,
    }))
}

async fn status(State(facade): State<QueryFacade>) -> Json<WatchStatus> {
    Json(facade.status().await)
}
