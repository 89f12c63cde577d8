// The send pipeline: rate gate → moderation → transport.
//
// A flagged message is never transmitted as typed. The rejection carries a
// PendingMessage holding only the masked rendition; sending it requires an
// explicit `confirm_masked` call. When masking changes nothing (the remote
// classifier flagged text the local lexicon can't locate) there is nothing
// safe to send, so no PendingMessage is offered and the user must edit.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use super::transport::{MessageTransport, OutgoingMessage};
use crate::moderation::{ModerationReport, Moderator};
use crate::output::truncate_chars;
use crate::ratelimit::{RateDecision, RateLimiter, SendStatus};

/// A masked message waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    identity: String,
    masked_text: String,
}

impl PendingMessage {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn masked_text(&self) -> &str {
        &self.masked_text
    }
}

/// Why a submission didn't go out.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("sending too fast, try again in {cooldown_seconds}s")]
    RateLimited {
        cooldown_seconds: u64,
        retry_after: Duration,
    },

    #[error("message failed moderation (severity {})", .report.severity)]
    ModerationRejected {
        report: ModerationReport,
        /// The masked version, if masking left something safe to send
        pending: Option<PendingMessage>,
    },

    #[error("message transport failed: {0:#}")]
    Transport(anyhow::Error),
}

/// Gates, moderates and dispatches outgoing messages.
pub struct SendPipeline<T> {
    limiter: RateLimiter,
    moderator: Moderator,
    transport: T,
}

impl<T: MessageTransport> SendPipeline<T> {
    pub fn new(limiter: RateLimiter, moderator: Moderator, transport: T) -> Self {
        Self {
            limiter,
            moderator,
            transport,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn moderator(&self) -> &Moderator {
        &self.moderator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit a message typed by `identity`.
    pub async fn submit(&self, identity: &str, text: &str) -> Result<OutgoingMessage, SendError> {
        self.gate(identity)?;

        let report = self.moderator.review(text).await;
        if !report.is_clean {
            let pending = (report.masked_text != text).then(|| PendingMessage {
                identity: identity.to_string(),
                masked_text: report.masked_text.clone(),
            });
            debug!(
                identity,
                severity = %report.severity,
                source = %report.source,
                maskable = pending.is_some(),
                "Submission held for confirmation"
            );
            return Err(SendError::ModerationRejected { report, pending });
        }

        self.dispatch(identity, text).await
    }

    /// The user explicitly accepted the masked version.
    pub async fn confirm_masked(
        &self,
        pending: PendingMessage,
    ) -> Result<OutgoingMessage, SendError> {
        self.gate(&pending.identity)?;
        self.dispatch(&pending.identity, &pending.masked_text).await
    }

    pub fn status(&self, identity: &str) -> SendStatus {
        self.limiter.status(identity, Instant::now())
    }

    pub fn reset(&self, identity: &str) {
        self.limiter.reset(identity);
    }

    fn gate(&self, identity: &str) -> Result<(), SendError> {
        match self.limiter.check_send_now(identity) {
            RateDecision::Allowed => Ok(()),
            decision @ RateDecision::Blocked { retry_after } => Err(SendError::RateLimited {
                cooldown_seconds: decision.cooldown_seconds(),
                retry_after,
            }),
        }
    }

    async fn dispatch(&self, identity: &str, text: &str) -> Result<OutgoingMessage, SendError> {
        let message = self
            .transport
            .send(identity, text)
            .await
            .map_err(SendError::Transport)?;
        info!(
            identity,
            text_preview = %truncate_chars(text, 40),
            "Message dispatched"
        );
        Ok(message)
    }
}
