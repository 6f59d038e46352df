//! Outbound Pipeline (§4.F): build-validate-send-await for a Call, buffering
//! while the transport is down and flushing once registration completes
//! Accepted after a reconnect.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cache::{CacheEntry, CacheResolution, RequestCache};
use crate::error::OcppError;
use crate::session::state::{is_admitted, RegistrationState};
use crate::transport::StationTransport;
use crate::validator::SchemaValidator;
use crate::wire::Frame;

/// Default per-send timeout (§4.F step 4).
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    pub skip_buffering_on_error: bool,
    pub trigger_message: bool,
}

/// Deduplicated set of encoded frames awaiting transport-open, preserving
/// insertion order for FIFO flush (§3, §8 property 5).
#[derive(Default)]
pub struct MessageBuffer {
    frames: Vec<String>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: String) {
        if !self.frames.contains(&frame) {
            self.frames.push(frame);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Drain frames in FIFO order, handing each to `send_fn` immediately
    /// after removing it from the buffer.
    pub async fn flush<F, Fut>(&mut self, mut send_fn: F)
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<(), OcppError>>,
    {
        let pending: Vec<String> = self.frames.drain(..).collect();
        for frame in pending {
            if let Err(e) = send_fn(frame).await {
                warn!(error = %e, "failed to send buffered frame");
            }
        }
    }
}

pub struct OutboundPipeline;

impl OutboundPipeline {
    /// Attempt to send a Call. Performs admission and schema checks
    /// synchronously; the returned receiver resolves once the matching
    /// CallResult/CallError arrives, the per-send timeout elapses, or the
    /// station stops.
    #[allow(clippy::too_many_arguments)]
    pub async fn send<T: StationTransport>(
        state: RegistrationState,
        strict_compliance: bool,
        validator: &SchemaValidator,
        transport: &mut T,
        cache: &mut RequestCache,
        buffer: &mut MessageBuffer,
        command: &'static str,
        payload: Value,
        options: SendOptions,
        timeout: Duration,
    ) -> Result<oneshot::Receiver<CacheResolution>, OcppError> {
        if !is_admitted(state, command, false, options.trigger_message, strict_compliance) {
            return Err(OcppError::NotAdmitted {
                command,
                state: state.to_string(),
            });
        }

        if let Err(violation) = validator.validate_request(command, &payload) {
            return Err(OcppError::Rejected {
                command,
                error_type: violation.error_type,
                description: violation.message,
            });
        }

        let frame = Frame::call(command, payload.clone());
        let message_id = frame.message_id().to_string();
        let encoded = frame.encode_to_string()?;

        let (entry, receiver) = CacheEntry::new(command, payload, timeout);
        cache.insert(message_id.clone(), entry)?;

        if transport.is_open() {
            if let Err(e) = transport.send_text(encoded.clone()).await {
                if options.skip_buffering_on_error {
                    cache.take(&message_id);
                    return Err(OcppError::Transport(e.to_string()));
                }
                // Leave the cache entry pending: the buffered frame carries
                // the same MessageId, so a later flush still correlates with
                // this receiver (§4.F step 5).
                info!(%command, "send failed, buffering frame for retry after reconnect");
                buffer.push(encoded);
            }
        } else if !options.skip_buffering_on_error {
            buffer.push(encoded);
        } else {
            cache.take(&message_id);
            return Err(OcppError::Transport("transport not open".into()));
        }

        Ok(receiver)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn buffer_dedups_identical_frames() {
        let mut buffer = MessageBuffer::new();
        buffer.push("frame-a".into());
        buffer.push("frame-a".into());
        buffer.push("frame-b".into());
        assert_eq!(buffer.len(), 2);
    }

    #[tokio::test]
    async fn buffer_flushes_in_fifo_order() {
        let mut buffer = MessageBuffer::new();
        buffer.push("first".into());
        buffer.push("second".into());

        let mut order = Vec::new();
        buffer
            .flush(|frame| {
                order.push(frame);
                async { Ok(()) }
            })
            .await;

        assert_eq!(order, vec!["first", "second"]);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn send_denied_by_admission_law_does_not_touch_cache() {
        let mut cache = RequestCache::new();
        let mut buffer = MessageBuffer::new();
        let validator = SchemaValidator::new(true);

        let result = OutboundPipeline::send(
            RegistrationState::Unknown,
            true,
            &validator,
            &mut Transport::new(crate::transport::TransportConfig {
                supervision_url: "ws://localhost".into(),
                station_id: "CP-1".into(),
                subprotocol: "ocpp1.6".into(),
                basic_auth: None,
                handshake_timeout: Duration::from_secs(30),
                auto_reconnect_max_retries: -1,
                reconnect_exponential_delay: false,
            }),
            &mut cache,
            &mut buffer,
            "Heartbeat",
            json!({}),
            SendOptions::default(),
            DEFAULT_SEND_TIMEOUT,
        )
        .await;

        assert!(matches!(result, Err(OcppError::NotAdmitted { .. })));
        assert_eq!(cache.size(), 0);
    }
}
