//! # Relay Server
//!
//! Binds the builder REST listener and the co-hosted engine listener, then
//! serves both until the shutdown signal flips. Either listener may be bound
//! to port 0; the resolved addresses are available before serving starts.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use mm_02_mock_chain::{ChainError, GenesisSpec, MockChain};
use shared_crypto::{BlsKeyPair, CryptoError, JwtSecret};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::build_router;
use crate::domain::{ConfigError, PayloadCache, RelayConfig};
use crate::engine::{engine_router, JwtVerifier, MockEngine};
use crate::service::RelayService;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid relay configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("engine chain: {0}")]
    Chain(#[from] ChainError),

    #[error("engine secret: {0}")]
    Secret(#[from] CryptoError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct RelayServer {
    relay: Arc<RelayService>,
    engine: Arc<MockEngine>,
    relay_listener: TcpListener,
    engine_listener: TcpListener,
    relay_router: Router,
    engine_router: Router,
}

impl RelayServer {
    /// Load the engine chain and secret named by `config` and bind both
    /// listeners.
    pub async fn bind(config: &RelayConfig, keypair: BlsKeyPair) -> Result<Self, ServerError> {
        config.validate()?;

        let genesis = match &config.genesis_path {
            Some(path) => GenesisSpec::load(path)?,
            None => GenesisSpec::default(),
        };
        let chain = MockChain::open(genesis, config.datadir.as_deref())?;

        let secret = match &config.jwt_secret_path {
            Some(path) => JwtSecret::load(path)?,
            None => {
                let secret = JwtSecret::random();
                warn!(secret = %secret.to_hex(), "No engine secret configured, generated one");
                secret
            }
        };

        Self::bind_with(config, keypair, chain, secret).await
    }

    /// Bind with an explicit chain and secret.
    pub async fn bind_with(
        config: &RelayConfig,
        keypair: BlsKeyPair,
        chain: MockChain,
        secret: JwtSecret,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let cache = Arc::new(PayloadCache::new(config.cache_capacity));
        let relay = Arc::new(RelayService::new(keypair, config, Arc::clone(&cache)));
        let engine = Arc::new(MockEngine::new(chain, cache));

        let relay_router = build_router(Arc::clone(&relay), &config.cors, config.request_timeout);
        let engine_router = engine_router(Arc::clone(&engine), JwtVerifier::new(secret));

        let relay_listener = bind_listener(config.listen_addr).await?;
        let engine_listener = bind_listener(config.engine_listen_addr).await?;

        Ok(Self {
            relay,
            engine,
            relay_listener,
            engine_listener,
            relay_router,
            engine_router,
        })
    }

    pub fn relay_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.relay_listener.local_addr()?)
    }

    pub fn engine_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.engine_listener.local_addr()?)
    }

    pub fn relay(&self) -> &Arc<RelayService> {
        &self.relay
    }

    pub fn engine(&self) -> &Arc<MockEngine> {
        &self.engine
    }

    /// Serve until `shutdown` becomes `true`, then persist the engine chain.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        info!(
            relay = ?self.relay_listener.local_addr().ok(),
            engine = ?self.engine_listener.local_addr().ok(),
            builder_pubkey = %self.relay.public_key(),
            "Relay listening"
        );

        let relay = axum::serve(self.relay_listener, self.relay_router)
            .with_graceful_shutdown(wait_for(shutdown.clone()));
        let engine = axum::serve(self.engine_listener, self.engine_router)
            .with_graceful_shutdown(wait_for(shutdown));

        let served = tokio::try_join!(
            async { relay.await },
            async { engine.await }
        );

        if let Err(err) = self.engine.close() {
            error!(%err, "Cannot persist engine chain");
        }
        served?;
        info!(
            registrations = self.relay.registrations(),
            "Relay stopped"
        );
        Ok(())
    }
}

async fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn ephemeral() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn test_binds_ephemeral_ports_and_stops() {
        let config = RelayConfig {
            listen_addr: ephemeral(),
            engine_listen_addr: ephemeral(),
            ..RelayConfig::default()
        };
        let server = RelayServer::bind_with(
            &config,
            BlsKeyPair::from_ikm(&[5u8; 32]).unwrap(),
            MockChain::new(GenesisSpec::default()),
            JwtSecret::random(),
        )
        .await
        .unwrap();
        let relay_addr = server.relay_addr().unwrap();
        let engine_addr = server.engine_addr().unwrap();
        assert_ne!(relay_addr.port(), 0);
        assert_ne!(relay_addr, engine_addr);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(server.serve(rx));
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = RelayConfig {
            cache_capacity: 0,
            ..RelayConfig::default()
        };
        let result = RelayServer::bind(&config, BlsKeyPair::from_ikm(&[5u8; 32]).unwrap()).await;
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
