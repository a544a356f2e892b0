//! # Background Slot Steps
//!
//! Work a slot hands off so the slot loop never waits on the engine:
//!
//! | Step              | Engine / builder calls                              |
//! |-------------------|-----------------------------------------------------|
//! | [`execute_block`] | `newPayload`, then `forkchoiceUpdated` (+attributes)|
//! | [`submit_invalid`]| `newPayload` of a wrong-hash payload                |
//! | [`propose`]       | builder `getHeader`/`getPayload` or engine `getPayload`, local import, `newPayload` |
//!
//! Every step runs under the configured request timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mm_02_mock_chain::Block;
use shared_crypto::BlsKeyPair;
use shared_types::{
    BlindedBeaconBlock, BlindedBeaconBlockBody, BlsPublicKeyBytes, Domain, ExecutionPayloadV1,
    ExecutionStatus, ForkchoiceStateV1, HexBytes, PayloadAttributesV1, PayloadId,
    SignedBlindedBeaconBlock,
};
use tracing::{debug, error, info, warn};

use crate::domain::SlotClock;
use crate::error::{ClientError, DriverError, Result};
use crate::ports::{BuilderApi, EngineApi, SharedChain};

/// Collaborators shared by every background step.
#[derive(Clone)]
pub struct PipelineContext {
    pub engine: Arc<dyn EngineApi>,
    pub builder: Option<Arc<dyn BuilderApi>>,
    pub chain: SharedChain,
    pub proposer: Arc<BlsKeyPair>,
    pub proposer_domain: Domain,
    pub clock: SlotClock,
    pub timeout: Duration,
}

async fn bounded<T>(timeout: Duration, step: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, step)
        .await
        .map_err(|_| DriverError::Client(ClientError::Timeout))?
}

// =============================================================================
// EXTERNAL BLOCKS
// =============================================================================

/// Push a locally mined block to the engine and move its forkchoice there.
///
/// Returns the payload id when `attributes` asked the engine to build.
pub async fn execute_block(
    ctx: PipelineContext,
    payload: ExecutionPayloadV1,
    state: ForkchoiceStateV1,
    attributes: Option<PayloadAttributesV1>,
) -> Result<Option<PayloadId>> {
    bounded(ctx.timeout, async {
        // The engine's verdict on our own block is informational; forkchoice
        // is what must hold.
        match ctx.engine.new_payload(&payload).await {
            Ok(status) => debug!(
                block_hash = ?payload.block_hash,
                status = %status.status,
                "Engine executed external block"
            ),
            Err(err) => warn!(block_hash = ?payload.block_hash, %err, "Failed to execute external block"),
        }

        let result = ctx.engine.forkchoice_updated(state, attributes).await?;
        if result.payload_status.status != ExecutionStatus::Valid {
            error!(
                head = ?state.head_block_hash,
                status = %result.payload_status.status,
                validation_error = ?result.payload_status.validation_error,
                "Update not considered valid"
            );
            return Err(DriverError::Consistency(format!(
                "forkchoice update to {:?} returned {}",
                state.head_block_hash, result.payload_status.status
            )));
        }
        debug!(head = ?state.head_block_hash, payload_id = ?result.payload_id, "Forkchoice updated");
        Ok(result.payload_id)
    })
    .await
}

/// Send a payload the engine must refuse. Any answer is acceptable.
pub async fn submit_invalid(ctx: PipelineContext, payload: ExecutionPayloadV1) -> Result<()> {
    bounded(ctx.timeout, async {
        match ctx.engine.new_payload(&payload).await {
            Ok(status) => debug!(status = %status.status, "Engine answered invalid-hash payload"),
            Err(err) => warn!(%err, "Invalid-hash payload not delivered"),
        }
        Ok(())
    })
    .await
}

// =============================================================================
// PROPOSALS
// =============================================================================

/// Obtain the block built for `slot`, import it locally, and have the engine
/// execute it.
pub async fn propose(ctx: PipelineContext, payload_id: PayloadId, slot: u64) -> Result<Block> {
    bounded(ctx.timeout, async {
        let payload = fetch_proposal(&ctx, payload_id, slot).await?;
        ctx.clock
            .validate_timestamp(payload.timestamp, slot)
            .map_err(|e| DriverError::Consistency(format!("payload has bad timestamp: {e}")))?;

        let block = ctx.chain.lock().process_payload(&payload)?;
        debug!(slot, block_hash = ?block.hash(), "Processed payload in consensus mock world");

        let status = ctx.engine.new_payload(&payload).await?;
        match status.status {
            ExecutionStatus::Valid => {
                debug!(slot, block_hash = ?block.hash(), "Processed payload in engine");
                Ok(block)
            }
            ExecutionStatus::Invalid => Err(DriverError::Consistency(format!(
                "engine produced payload {:?} and failed to execute it after",
                block.hash()
            ))),
            other => Err(DriverError::Consistency(format!(
                "unrecognized execution status {other} for payload {:?}",
                block.hash()
            ))),
        }
    })
    .await
}

async fn fetch_proposal(
    ctx: &PipelineContext,
    payload_id: PayloadId,
    slot: u64,
) -> Result<ExecutionPayloadV1> {
    let Some(builder) = &ctx.builder else {
        return Ok(ctx.engine.get_payload(payload_id).await?);
    };

    let parent_hash = ctx.chain.lock().current_header().hash();
    let pubkey = BlsPublicKeyBytes(ctx.proposer.public_key().to_bytes());
    let bid = builder.get_header(slot, parent_hash, pubkey).await?;

    let message = BlindedBeaconBlock {
        slot,
        proposer_index: 1,
        body: BlindedBeaconBlockBody {
            execution_payload_header: bid.message.header,
            ..Default::default()
        },
        ..Default::default()
    };
    let signature = mm_01_signing::sign(&ctx.proposer, &message, ctx.proposer_domain)?;
    let signed = SignedBlindedBeaconBlock {
        message,
        signature: HexBytes(signature.0.to_vec()),
    };

    let payload = builder.get_payload(&signed).await?;
    info!(slot, block_hash = ?payload.block_hash, "Received payload from builder");
    Ok(payload)
}
