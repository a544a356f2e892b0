//! Builder API routes.
//!
//! | Method | Path | Body | OK |
//! |--------|------|------|----|
//! | GET | `/eth/v1/builder/status` | - | 200 |
//! | POST | `/eth/v1/builder/validators` | `SignedValidatorRegistration` | 200 |
//! | GET | `/eth/v1/builder/header/:slot/:parent_hash/:pubkey` | - | 200 + bid |
//! | POST | `/eth/v1/builder/blinded_blocks` | `SignedBlindedBeaconBlock` | 200 + payload |
//!
//! Errors are plain text: 400 for anything the caller got wrong, 500 for
//! response encoding failures.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use shared_types::{SignedBlindedBeaconBlock, SignedValidatorRegistration};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::warn;

use super::cors::create_cors_layer;
use super::tracing::RequestTracingLayer;
use crate::domain::RelayError;
use crate::service::RelayService;

pub const PATH_STATUS: &str = "/eth/v1/builder/status";
pub const PATH_REGISTER_VALIDATOR: &str = "/eth/v1/builder/validators";
pub const PATH_GET_HEADER: &str = "/eth/v1/builder/header/:slot/:parent_hash/:pubkey";
pub const PATH_GET_PAYLOAD: &str = "/eth/v1/builder/blinded_blocks";

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, self.to_string()).into_response()
    }
}

pub fn build_router(relay: Arc<RelayService>, cors: &[String], request_timeout: Duration) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(cors))
        .layer(RequestTracingLayer::new())
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route(PATH_STATUS, get(handle_status))
        .route(PATH_REGISTER_VALIDATOR, post(handle_register_validator))
        .route(PATH_GET_HEADER, get(handle_get_header))
        .route(PATH_GET_PAYLOAD, post(handle_get_payload))
        .layer(middleware)
        .with_state(relay)
}

async fn handle_status() -> StatusCode {
    StatusCode::OK
}

async fn handle_register_validator(
    State(relay): State<Arc<RelayService>>,
    body: Bytes,
) -> Result<StatusCode, RelayError> {
    let registration: SignedValidatorRegistration = decode_body(&body)?;
    relay.register_validator(&registration)?;
    Ok(StatusCode::OK)
}

async fn handle_get_header(
    State(relay): State<Arc<RelayService>>,
    Path((slot, parent_hash, pubkey)): Path<(String, String, String)>,
) -> Result<Response, RelayError> {
    let bid = relay.get_header(&slot, &parent_hash, &pubkey)?;
    Ok(Json(bid).into_response())
}

async fn handle_get_payload(
    State(relay): State<Arc<RelayService>>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let block: SignedBlindedBeaconBlock = decode_body(&body)?;
    let payload = relay.get_payload(&block)?;
    Ok(Json(payload).into_response())
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RelayError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(err = %e, "Cannot decode request body");
        RelayError::Decode(e.to_string())
    })
}
