//! Relay harness shared by the integration flows.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mm_02_mock_chain::{GenesisSpec, MockChain};
use mm_03_builder_relay::{MockEngine, RelayConfig, RelayServer, RelayService, ServerError};
use mm_04_consensus_driver::adapters::{HttpBuilderClient, HttpEngineClient};
use shared_crypto::{BlsKeyPair, JwtSecret};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A relay serving on ephemeral ports until [`RunningRelay::stop`].
pub struct RunningRelay {
    pub relay_url: String,
    pub engine_url: String,
    pub relay: Arc<RelayService>,
    pub engine: Arc<MockEngine>,
    pub secret: JwtSecret,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Result<(), ServerError>>,
}

fn ephemeral() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
}

pub async fn start_relay() -> RunningRelay {
    start_relay_with(None).await
}

/// Start a relay whose engine chain is snapshotted to `datadir` on stop.
pub async fn start_relay_with(datadir: Option<PathBuf>) -> RunningRelay {
    let config = RelayConfig {
        listen_addr: ephemeral(),
        engine_listen_addr: ephemeral(),
        datadir: datadir.clone(),
        ..RelayConfig::default()
    };
    let chain = MockChain::open(GenesisSpec::default(), datadir.as_deref()).unwrap();
    let secret = JwtSecret::random();
    let server = RelayServer::bind_with(
        &config,
        BlsKeyPair::from_ikm(&[11u8; 32]).unwrap(),
        chain,
        secret.clone(),
    )
    .await
    .unwrap();

    let relay_url = format!("http://{}", server.relay_addr().unwrap());
    let engine_url = format!("http://{}", server.engine_addr().unwrap());
    let relay = Arc::clone(server.relay());
    let engine = Arc::clone(server.engine());

    let (shutdown, rx) = watch::channel(false);
    let handle = tokio::spawn(server.serve(rx));

    RunningRelay {
        relay_url,
        engine_url,
        relay,
        engine,
        secret,
        shutdown,
        handle,
    }
}

impl RunningRelay {
    pub fn engine_client(&self) -> HttpEngineClient {
        HttpEngineClient::new(self.engine_url.clone(), self.secret.clone(), CLIENT_TIMEOUT).unwrap()
    }

    pub fn builder_client(&self) -> HttpBuilderClient {
        HttpBuilderClient::new(self.relay_url.clone(), CLIENT_TIMEOUT).unwrap()
    }

    /// Signal shutdown and wait for the server to persist and exit.
    pub async fn stop(self) {
        self.shutdown.send(true).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}
