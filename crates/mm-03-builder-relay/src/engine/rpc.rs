//! Engine JSON-RPC endpoint.
//!
//! A single `POST /` route. Positional params are decoded as tuples so a
//! missing or malformed argument becomes `-32602` instead of a panic.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_types::{
    ExecutionPayloadV1, ForkchoiceStateV1, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    PayloadAttributesV1, PayloadId, ENGINE_FORKCHOICE_UPDATED_V1, ENGINE_GET_PAYLOAD_V1,
    ENGINE_NEW_PAYLOAD_V1,
};
use tracing::debug;

use super::auth::{JwtLayer, JwtVerifier};
use super::MockEngine;

/// Router for the engine listener; every request passes the JWT check first.
pub fn engine_router(engine: Arc<MockEngine>, verifier: JwtVerifier) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .layer(JwtLayer::new(verifier))
        .with_state(engine)
}

async fn handle_rpc(State(engine): State<Arc<MockEngine>>, body: Bytes) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::PARSE_ERROR,
                e.to_string(),
            ))
        }
    };
    debug!(method = %request.method, "Engine request");

    let id = request.id.clone();
    let response = match route_method(&engine, &request.method, request.params) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error.code, error.message),
    };
    Json(response)
}

fn route_method(engine: &MockEngine, method: &str, params: Value) -> Result<Value, JsonRpcError> {
    match method {
        ENGINE_NEW_PAYLOAD_V1 => {
            let (payload,): (ExecutionPayloadV1,) = parse_params(params)?;
            to_result(engine.new_payload(&payload))
        }
        ENGINE_FORKCHOICE_UPDATED_V1 => {
            let (state, attributes): (ForkchoiceStateV1, Option<PayloadAttributesV1>) =
                parse_params(params)?;
            let result = engine
                .forkchoice_updated(&state, attributes.as_ref())
                .map_err(|e| rpc_error(e.code(), e.to_string()))?;
            to_result(result)
        }
        ENGINE_GET_PAYLOAD_V1 => {
            let (id,): (PayloadId,) = parse_params(params)?;
            let payload = engine
                .get_payload(&id)
                .map_err(|e| rpc_error(e.code(), e.to_string()))?;
            to_result(payload)
        }
        _ => Err(rpc_error(
            JsonRpcError::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )),
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params).map_err(|e| rpc_error(JsonRpcError::INVALID_PARAMS, e.to_string()))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| rpc_error(JsonRpcError::INTERNAL_ERROR, e.to_string()))
}

fn rpc_error(code: i64, message: String) -> JsonRpcError {
    JsonRpcError { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PayloadCache;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use mm_02_mock_chain::{GenesisSpec, MockChain};
    use serde_json::json;
    use shared_crypto::JwtSecret;
    use shared_types::{ExecutionStatus, ForkchoiceUpdatedResult, Hash};
    use tower::ServiceExt;

    fn setup() -> (Router, JwtSecret, Hash) {
        let secret = JwtSecret::random();
        let chain = MockChain::new(GenesisSpec::default());
        let genesis = chain.head_hash();
        let engine = Arc::new(MockEngine::new(chain, Arc::new(PayloadCache::default())));
        let router = engine_router(engine, JwtVerifier::new(secret.clone()));
        (router, secret, genesis)
    }

    async fn call(router: Router, secret: &JwtSecret, body: Value) -> JsonRpcResponse {
        let token = secret.issue_token().unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_forkchoice_then_get_payload() {
        let (router, secret, genesis) = setup();
        let fcu = json!({
            "jsonrpc": "2.0", "id": 1, "method": ENGINE_FORKCHOICE_UPDATED_V1,
            "params": [
                {"headBlockHash": genesis, "safeBlockHash": genesis, "finalizedBlockHash": Hash::zero()},
                {"timestamp": "0xc", "prevRandao": Hash::zero(), "suggestedFeeRecipient": "0x0000000000000000000000000000000000001337"}
            ]
        });
        let response = call(router.clone(), &secret, fcu).await;
        let result: ForkchoiceUpdatedResult =
            serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.payload_status.status, ExecutionStatus::Valid);
        let id = result.payload_id.unwrap();

        let get = json!({"jsonrpc": "2.0", "id": 2, "method": ENGINE_GET_PAYLOAD_V1, "params": [id]});
        let response = call(router, &secret, get).await;
        let payload: ExecutionPayloadV1 =
            serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(payload.parent_hash, genesis);
        assert_eq!(payload.block_number, 1);
        assert_eq!(response.id, json!(2));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let (router, secret, _) = setup();

        let unknown = json!({"jsonrpc": "2.0", "id": 1, "method": ENGINE_GET_PAYLOAD_V1, "params": ["0x0000000000000099"]});
        let response = call(router.clone(), &secret, unknown).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::UNKNOWN_PAYLOAD);

        let bad_params = json!({"jsonrpc": "2.0", "id": 1, "method": ENGINE_NEW_PAYLOAD_V1, "params": []});
        let response = call(router.clone(), &secret, bad_params).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);

        let missing = json!({"jsonrpc": "2.0", "id": 1, "method": "engine_exchangeCapabilities", "params": []});
        let response = call(router, &secret, missing).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unauthenticated_request_rejected() {
        let (router, _, _) = setup();
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("{}"))
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
