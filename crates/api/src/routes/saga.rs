//! Order saga trigger endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use saga::{OrderSagaController, PlaceOrderRequest, SagaResult};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub controller: OrderSagaController,
}

impl AppState {
    pub fn new(controller: OrderSagaController) -> Arc<Self> {
        Arc::new(Self { controller })
    }
}

/// POST /saga/order — runs one order saga.
///
/// A completed saga answers 200, a cancelled or failed one 500; both carry
/// the saga result. An invalid request answers 400 and starts no saga.
#[tracing::instrument(skip(state, payload))]
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SagaResult>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let result = state.controller.run(req).await?;

    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(result)))
}
