//! Legacy peer connection used during the proof-of-work prologue.
//!
//! Messages are newline-delimited JSON objects tagged by `type`:
//!
//! | Message    | Direction | Purpose                                  |
//! |------------|-----------|------------------------------------------|
//! | `status`   | both      | Handshake: chain id, genesis, head, TD   |
//! | `new_block`| out       | Announce a freshly mined block with TD   |
//! | `ping`     | in        | Keep-alive probe, answered with `pong`   |
//! | `pong`     | out       | Keep-alive reply                         |
//!
//! Peer addresses use the enode form `enode://<128 hex node id>@host:port`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mm_02_mock_chain::{Block, Header};
use serde::{Deserialize, Serialize};
use shared_types::{Hash, U256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::ports::LegacyPeer;

const NODE_ID_HEX_LEN: usize = 128;

/// A parsed enode address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddress {
    pub node_id: [u8; 64],
    pub addr: SocketAddr,
}

impl std::str::FromStr for PeerAddress {
    type Err = ClientError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ClientError::Peer(format!("malformed enode {text:?}: {reason}"));

        let rest = text
            .strip_prefix("enode://")
            .ok_or_else(|| malformed("missing enode:// scheme"))?;
        let (id, host) = rest
            .split_once('@')
            .ok_or_else(|| malformed("missing @host:port"))?;
        if id.len() != NODE_ID_HEX_LEN {
            return Err(malformed("node id must be 64 bytes"));
        }
        let bytes = hex::decode(id).map_err(|e| malformed(&e.to_string()))?;
        let mut node_id = [0u8; 64];
        node_id.copy_from_slice(&bytes);

        // Discovery query parameters are accepted and ignored.
        let host = host.split('?').next().unwrap_or(host);
        let addr = host
            .parse::<SocketAddr>()
            .map_err(|e| malformed(&e.to_string()))?;
        Ok(Self { node_id, addr })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    Status {
        chain_id: u64,
        genesis_hash: Hash,
        head_hash: Hash,
        total_difficulty: U256,
    },
    NewBlock {
        block: Block,
        total_difficulty: U256,
    },
    Ping,
    Pong,
}

/// What we tell the peer about ourselves in the handshake.
#[derive(Debug, Clone)]
pub struct LocalStatus {
    pub chain_id: u64,
    pub genesis_hash: Hash,
    pub head: Header,
    pub total_difficulty: U256,
}

pub struct TcpLegacyPeer {
    address: PeerAddress,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    keep_alive: JoinHandle<()>,
}

impl TcpLegacyPeer {
    /// Dial, exchange status messages, and start answering keep-alives.
    pub async fn connect(
        address: PeerAddress,
        local: LocalStatus,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address.addr))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::Peer(format!("unable to connect to {}: {e}", address.addr)))?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let writer = Arc::new(Mutex::new(write_half));

        send(
            &writer,
            &PeerMessage::Status {
                chain_id: local.chain_id,
                genesis_hash: local.genesis_hash,
                head_hash: local.head.hash(),
                total_difficulty: local.total_difficulty,
            },
        )
        .await?;

        let reply = tokio::time::timeout(timeout, read_message(&mut reader))
            .await
            .map_err(|_| ClientError::Timeout)??;
        match reply {
            Some(PeerMessage::Status {
                chain_id,
                genesis_hash,
                total_difficulty,
                ..
            }) => {
                if chain_id != local.chain_id || genesis_hash != local.genesis_hash {
                    return Err(ClientError::Peer(format!(
                        "peer is on chain {chain_id} with genesis {genesis_hash:?}, \
                         we are on chain {} with genesis {:?}",
                        local.chain_id, local.genesis_hash
                    )));
                }
                info!(peer = %address.addr, %total_difficulty, "Peered with legacy client");
            }
            Some(other) => {
                return Err(ClientError::Peer(format!(
                    "expected status handshake, got {other:?}"
                )))
            }
            None => return Err(ClientError::Peer("peer closed during handshake".into())),
        }

        let keep_alive = tokio::spawn(keep_alive(reader, Arc::clone(&writer)));
        Ok(Self {
            address,
            writer,
            keep_alive,
        })
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }
}

impl Drop for TcpLegacyPeer {
    fn drop(&mut self) {
        self.keep_alive.abort();
    }
}

#[async_trait]
impl LegacyPeer for TcpLegacyPeer {
    async fn announce_block(
        &mut self,
        block: &Block,
        total_difficulty: U256,
    ) -> Result<(), ClientError> {
        send(
            &self.writer,
            &PeerMessage::NewBlock {
                block: block.clone(),
                total_difficulty,
            },
        )
        .await?;
        debug!(number = block.number(), block_hash = ?block.hash(), %total_difficulty, "Announced block to peer");
        Ok(())
    }
}

async fn send(writer: &Mutex<OwnedWriteHalf>, message: &PeerMessage) -> Result<(), ClientError> {
    let mut line =
        serde_json::to_vec(message).map_err(|e| ClientError::Decode(e.to_string()))?;
    line.push(b'\n');
    let mut writer = writer.lock().await;
    writer
        .write_all(&line)
        .await
        .map_err(|e| ClientError::Peer(format!("failed to message peer: {e}")))
}

/// Next message, or `None` once the peer hung up.
async fn read_message(
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<Option<PeerMessage>, ClientError> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| ClientError::Peer(e.to_string()))?;
    if read == 0 {
        return Ok(None);
    }
    serde_json::from_str(line.trim_end())
        .map(Some)
        .map_err(|e| ClientError::Decode(format!("peer message: {e}")))
}

async fn keep_alive(mut reader: BufReader<OwnedReadHalf>, writer: Arc<Mutex<OwnedWriteHalf>>) {
    loop {
        match read_message(&mut reader).await {
            Ok(Some(PeerMessage::Ping)) => {
                if let Err(err) = send(&writer, &PeerMessage::Pong).await {
                    warn!(%err, "Failed to answer peer keep-alive");
                    return;
                }
            }
            Ok(Some(message)) => debug!(?message, "Ignoring peer message"),
            Ok(None) => {
                debug!("Legacy peer closed the connection");
                return;
            }
            Err(err) => warn!(%err, "Unreadable peer message"),
        }
    }
}
