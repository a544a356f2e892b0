//! Adapters (driven side)
//!
//! | Adapter            | Port          | Transport                      |
//! |--------------------|---------------|--------------------------------|
//! | `MockChain`        | `ChainBackend`| in-process                     |
//! | `HttpEngineClient` | `EngineApi`   | JSON-RPC over HTTP, JWT bearer |
//! | `HttpBuilderClient`| `BuilderApi`  | REST over HTTP                 |
//! | `TcpLegacyPeer`    | `LegacyPeer`  | line-delimited JSON over TCP   |

pub mod builder_client;
pub mod chain;
pub mod engine_client;
pub mod peer;

pub use builder_client::HttpBuilderClient;
pub use engine_client::HttpEngineClient;
pub use peer::{LocalStatus, PeerAddress, PeerMessage, TcpLegacyPeer};
