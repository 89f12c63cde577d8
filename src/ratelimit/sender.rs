// Rapid-burst rate limiter keyed by sender identity.
//
// Every send attempt is checked against the previous send by the same
// identity. Attempts closer together than `min_interval` count as "rapid";
// once `max_burst_messages` rapid attempts land inside one rapid window, the
// identity is blocked for `cooldown`. Normal-paced messages reset the burst.
//
// Callers pass the current instant explicitly so the policy can be driven
// by synthetic clocks in tests and simulations. The identity map sits behind
// a Mutex so one limiter can be shared across tasks via Arc<RateLimiter>;
// individual identities are independent of each other.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

/// Upper bound on every policy duration. Longer values are clamped so block
/// deadlines stay far inside `Instant`'s range.
pub const MAX_POLICY_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Tunable constants for the send gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitPolicy {
    /// Rapid hits allowed inside one rapid window before blocking (default 10)
    pub max_burst_messages: u32,
    /// Rapid hits after which the sender is considered in "rapid mode" (default 3)
    pub rapid_threshold: u32,
    /// How long a rapid burst window stays open (default 15s)
    pub rapid_window: Duration,
    /// Sends closer together than this count as rapid (default 1s)
    pub min_interval: Duration,
    /// Length of the block once the burst limit is hit (default 15s)
    pub cooldown: Duration,
    /// How far back send instants are retained (default 30s)
    pub history_window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_burst_messages: 10,
            rapid_threshold: 3,
            rapid_window: Duration::from_millis(15_000),
            min_interval: Duration::from_millis(1_000),
            cooldown: Duration::from_millis(15_000),
            history_window: Duration::from_secs(30),
        }
    }
}

/// Ephemeral per-identity state. Created on the first send attempt.
#[derive(Debug, Clone, Default)]
pub struct SenderRateState {
    /// Send instants inside the trailing history window, oldest first
    pub message_timestamps: VecDeque<Instant>,
    /// Rapid hits since `rapid_window_start`
    pub rapid_count: u32,
    /// When the current rapid burst began
    pub rapid_window_start: Option<Instant>,
    /// Sending is refused until this instant
    pub blocked_until: Option<Instant>,
}

impl SenderRateState {
    fn block_remaining(&self, now: Instant) -> Option<Duration> {
        self.blocked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }
}

/// The gate's answer for one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Blocked {
        /// Time left until the identity may send again
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }

    /// Whole seconds left on the block, rounded up (0 when allowed).
    pub fn cooldown_seconds(&self) -> u64 {
        match self {
            RateDecision::Allowed => 0,
            RateDecision::Blocked { retry_after } => ceil_secs(*retry_after),
        }
    }
}

/// Read-only projection of an identity's state, for UI polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SendStatus {
    pub can_send: bool,
    /// Rapid sends left before the burst block kicks in
    pub remaining: u32,
    pub cooldown_seconds: u64,
    /// True once the identity has crossed the rapid threshold
    pub rapid: bool,
}

/// In-memory send gate. Never fails; it only returns decisions.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    senders: Mutex<HashMap<String, SenderRateState>>,
}

impl RateLimiter {
    pub fn new(mut policy: RateLimitPolicy) -> Self {
        for (name, duration) in [
            ("rapid_window", &mut policy.rapid_window),
            ("min_interval", &mut policy.min_interval),
            ("cooldown", &mut policy.cooldown),
            ("history_window", &mut policy.history_window),
        ] {
            if *duration > MAX_POLICY_DURATION {
                warn!(
                    name,
                    requested_ms = duration.as_millis() as u64,
                    "Rate limit duration too long, clamping to one day"
                );
                *duration = MAX_POLICY_DURATION;
            }
        }

        Self {
            policy,
            senders: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Decide whether `identity` may send at `now`, recording the attempt.
    pub fn check_send(&self, identity: &str, now: Instant) -> RateDecision {
        let mut senders = self.lock();
        let state = senders.entry(identity.to_string()).or_default();

        if let Some(retry_after) = state.block_remaining(now) {
            debug!(
                identity,
                retry_after_ms = retry_after.as_millis() as u64,
                "Send refused: identity is cooling down"
            );
            return RateDecision::Blocked { retry_after };
        }

        if state.blocked_until.take().is_some() {
            // The block has run out; the next burst starts from scratch
            state.rapid_count = 0;
            state.rapid_window_start = None;
        }

        let previous = state.message_timestamps.back().copied();
        let is_rapid = previous
            .is_some_and(|last| now.saturating_duration_since(last) < self.policy.min_interval);

        if is_rapid {
            if let Some(start) = state.rapid_window_start {
                if now.saturating_duration_since(start) > self.policy.rapid_window {
                    state.rapid_count = 0;
                    state.rapid_window_start = None;
                }
            }

            state.rapid_count += 1;
            if state.rapid_window_start.is_none() {
                state.rapid_window_start = Some(now);
            }

            if state.rapid_count == self.policy.rapid_threshold {
                warn!(
                    identity,
                    rapid_count = state.rapid_count,
                    "Sender entered rapid mode"
                );
            }

            if state.rapid_count >= self.policy.max_burst_messages {
                state.blocked_until = now.checked_add(self.policy.cooldown);
                info!(
                    identity,
                    rapid_count = state.rapid_count,
                    cooldown_ms = self.policy.cooldown.as_millis() as u64,
                    "Burst limit reached, blocking sender"
                );
                return RateDecision::Blocked {
                    retry_after: self.policy.cooldown,
                };
            }
        } else {
            state.rapid_count = 0;
            state.rapid_window_start = None;
        }

        state.message_timestamps.push_back(now);
        prune_history(&mut state.message_timestamps, now, self.policy.history_window);

        RateDecision::Allowed
    }

    /// `check_send` against the real clock.
    pub fn check_send_now(&self, identity: &str) -> RateDecision {
        self.check_send(identity, Instant::now())
    }

    /// Project an identity's state without mutating it.
    pub fn status(&self, identity: &str, now: Instant) -> SendStatus {
        let senders = self.lock();
        let max = self.policy.max_burst_messages;

        let Some(state) = senders.get(identity) else {
            return SendStatus {
                can_send: true,
                remaining: max,
                cooldown_seconds: 0,
                rapid: false,
            };
        };

        if let Some(left) = state.block_remaining(now) {
            return SendStatus {
                can_send: false,
                remaining: 0,
                cooldown_seconds: ceil_secs(left),
                rapid: true,
            };
        }

        // An expired block or a lapsed rapid window no longer counts
        let window = self.policy.rapid_window;
        let burst_live = state.blocked_until.is_none()
            && state
                .rapid_window_start
                .is_some_and(|start| now.saturating_duration_since(start) <= window);
        let rapid_count = if burst_live { state.rapid_count } else { 0 };

        SendStatus {
            can_send: true,
            remaining: max.saturating_sub(rapid_count),
            cooldown_seconds: 0,
            rapid: rapid_count >= self.policy.rapid_threshold,
        }
    }

    /// Forget everything about an identity (administrative escape hatch).
    pub fn reset(&self, identity: &str) {
        if self.lock().remove(identity).is_some() {
            info!(identity, "Rate state reset");
        }
    }

    /// Number of identities with live state.
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SenderRateState>> {
        // The map holds plain data; a panicked holder can't leave it torn
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

/// Drop send instants that have aged out of the history window.
fn prune_history(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) > window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_send_is_allowed() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.check_send("alice", Instant::now()), RateDecision::Allowed);
        assert_eq!(limiter.tracked_identities(), 1);
    }

    #[test]
    fn test_normal_pace_resets_rapid_count() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        limiter.check_send("bob", t0);
        limiter.check_send("bob", t0 + ms(100));
        limiter.check_send("bob", t0 + ms(200));
        {
            let senders = limiter.lock();
            assert_eq!(senders["bob"].rapid_count, 2);
            assert_eq!(senders["bob"].rapid_window_start, Some(t0 + ms(100)));
        }

        limiter.check_send("bob", t0 + ms(5_000));
        let senders = limiter.lock();
        assert_eq!(senders["bob"].rapid_count, 0);
        assert!(senders["bob"].rapid_window_start.is_none());
    }

    #[test]
    fn test_history_is_pruned_to_window() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        limiter.check_send("carol", t0);
        limiter.check_send("carol", t0 + ms(10_000));
        limiter.check_send("carol", t0 + ms(35_000));
        let senders = limiter.lock();
        assert_eq!(senders["carol"].message_timestamps.len(), 2);
    }

    #[test]
    fn test_blocked_check_has_no_side_effects() {
        let policy = RateLimitPolicy {
            max_burst_messages: 2,
            ..RateLimitPolicy::default()
        };
        let limiter = RateLimiter::new(policy);
        let t0 = Instant::now();
        limiter.check_send("dave", t0);
        limiter.check_send("dave", t0 + ms(100));
        let blocked = limiter.check_send("dave", t0 + ms(200));
        assert!(!blocked.is_allowed());

        let before = limiter.lock()["dave"].message_timestamps.len();
        let again = limiter.check_send("dave", t0 + ms(300));
        assert!(!again.is_allowed());
        assert_eq!(limiter.lock()["dave"].message_timestamps.len(), before);
    }

    #[test]
    fn test_rapid_window_expiry_restarts_count() {
        let policy = RateLimitPolicy {
            rapid_window: ms(2_000),
            min_interval: ms(1_000),
            ..RateLimitPolicy::default()
        };
        let limiter = RateLimiter::new(policy);
        let t0 = Instant::now();
        // 900ms apart: always rapid, but the window lapses after 2s
        for i in 0..5 {
            limiter.check_send("erin", t0 + ms(900 * i));
        }
        let senders = limiter.lock();
        assert!(senders["erin"].rapid_count < 4);
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::ZERO), 0);
        assert_eq!(ceil_secs(ms(1)), 1);
        assert_eq!(ceil_secs(ms(14_500)), 15);
        assert_eq!(ceil_secs(ms(15_000)), 15);
    }
}
