//! Engine API authentication.
//!
//! Every engine request must carry `Authorization: Bearer <token>` signed with
//! the shared secret. Anything else is answered `401` before the JSON-RPC
//! handler runs.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use shared_crypto::JwtSecret;
use tower::{Layer, Service};
use tracing::warn;

#[derive(Clone)]
pub struct JwtVerifier {
    secret: Arc<JwtSecret>,
}

impl JwtVerifier {
    pub fn new(secret: JwtSecret) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }

    /// Validate the bearer token on `req`.
    pub fn check<B>(&self, req: &Request<B>) -> Result<(), String> {
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| "missing bearer token".to_string())?;
        self.secret
            .verify_token(token.trim())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Clone)]
pub struct JwtLayer {
    verifier: JwtVerifier,
}

impl JwtLayer {
    pub fn new(verifier: JwtVerifier) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for JwtLayer {
    type Service = JwtService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtService {
            inner,
            verifier: self.verifier.clone(),
        }
    }
}

#[derive(Clone)]
pub struct JwtService<S> {
    inner: S,
    verifier: JwtVerifier,
}

impl<S> Service<Request<Body>> for JwtService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let verdict = self.verifier.check(&req);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if let Err(reason) = verdict {
                warn!(%reason, "Engine request rejected");
                return Ok((StatusCode::UNAUTHORIZED, reason).into_response());
            }
            inner.call(req).await
        })
    }
}
