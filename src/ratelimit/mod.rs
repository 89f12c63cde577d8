// Per-sender send gate.
//
// Tracks each identity's recent send instants in memory and blocks bursts
// of rapid-fire messages. State is process-local and not durable: a restart
// clears it, which is acceptable for a soft anti-spam defense.

pub mod sender;

pub use sender::{
    RateDecision, RateLimitPolicy, RateLimiter, SendStatus, SenderRateState, MAX_POLICY_DURATION,
};
