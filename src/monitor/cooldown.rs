use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::monitor::roundup::is_valid_round_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Reject(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CoolingDown,
    InvalidRoundUp,
}

/// At-most-one-per-window gate for round-up events.
///
/// Rejected candidates are dropped, never queued. `admit` takes `&mut self`,
/// so the check and the timestamp update cannot interleave.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    window: Duration,
    increment: Decimal,
    last_fire: Option<DateTime<Utc>>,
}

impl CooldownGate {
    pub fn new(window: Duration, increment: Decimal) -> Self {
        Self {
            window,
            increment,
            last_fire: None,
        }
    }

    pub fn admit(&mut self, round_up: Decimal, now: DateTime<Utc>) -> Admission {
        if !is_valid_round_up(round_up, self.increment) {
            debug!("Round-up {} outside (0, {}), rejected", round_up, self.increment);
            return Admission::Reject(RejectReason::InvalidRoundUp);
        }

        if let Some(last) = self.last_fire {
            if now.signed_duration_since(last) < self.window {
                debug!(
                    "Cooling down: {}ms since last accepted event",
                    now.signed_duration_since(last).num_milliseconds()
                );
                return Admission::Reject(RejectReason::CoolingDown);
            }
        }

        self.last_fire = Some(now);
        Admission::Accept
    }

    #[cfg(test)]
    pub fn last_fire(&self) -> Option<DateTime<Utc>> {
        self.last_fire
    }
}
