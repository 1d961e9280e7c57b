//! Request transport to the engine process
//!
//! `EngineTransport` is the seam between the timeline and whatever carries
//! requests across the process boundary. `ChannelTransport` is the in-process
//! implementation: each call is an `EngineCall` on an mpsc queue with a
//! oneshot for the reply.

use std::future::Future;

use tokio::sync::{mpsc, oneshot};

use crate::error::{BridgeError, BridgeResult};
use crate::requests::{EngineReply, EngineRequest};

/// Engine request queue depth
pub const ENGINE_QUEUE_SIZE: usize = 64;

/// Carries a request to the engine and resolves with its reply
pub trait EngineTransport: Send + Sync {
    fn call(&self, request: EngineRequest)
    -> impl Future<Output = BridgeResult<EngineReply>> + Send;
}

/// A request waiting for the engine, as seen from the engine side
#[derive(Debug)]
pub struct EngineCall {
    pub request: EngineRequest,
    reply: oneshot::Sender<Result<EngineReply, String>>,
}

impl EngineCall {
    /// Answer the call. Returns false when the caller stopped waiting.
    pub fn respond(self, result: Result<EngineReply, String>) -> bool {
        self.reply.send(result).is_ok()
    }

    pub fn ack(self) -> bool {
        self.respond(Ok(EngineReply::Ack))
    }

    pub fn reject(self, reason: impl Into<String>) -> bool {
        self.respond(Err(reason.into()))
    }
}

/// mpsc-backed transport
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<EngineCall>,
}

impl ChannelTransport {
    /// Create the transport and the receiver the engine serves from
    pub fn channel() -> (Self, mpsc::Receiver<EngineCall>) {
        Self::with_capacity(ENGINE_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<EngineCall>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EngineTransport for ChannelTransport {
    fn call(
        &self,
        request: EngineRequest,
    ) -> impl Future<Output = BridgeResult<EngineReply>> + Send {
        let tx = self.tx.clone();
        async move {
            let command = request.command();
            let (reply_tx, reply_rx) = oneshot::channel();

            tx.send(EngineCall {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| BridgeError::EngineUnavailable)?;

            match reply_rx.await {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(reason)) => Err(BridgeError::Rejected { command, reason }),
                Err(_) => Err(BridgeError::ChannelClosed(command)),
            }
        }
    }
}
