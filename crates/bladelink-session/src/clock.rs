use std::time::Duration;

use tokio::time::Instant;

/// Heartbeat bookkeeping for one connected session.
///
/// Only inbound traffic moves the deadline forward. Sending a heartbeat is
/// recorded but never extends it, so our own writes cannot hide a silent peer.
#[derive(Debug, Clone)]
pub struct HeartbeatClock {
    interval: Duration,
    timeout: Duration,
    last_heartbeat_sent: Option<Instant>,
    last_inbound: Option<Instant>,
    deadline: Instant,
}

impl HeartbeatClock {
    /// Start the clock at `now`. The first deadline is `now + timeout`.
    pub fn start(interval: Duration, timeout: Duration, now: Instant) -> Self {
        Self {
            interval,
            timeout,
            last_heartbeat_sent: None,
            last_inbound: None,
            deadline: now + timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Instant at which the link is considered dead.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn last_heartbeat_sent(&self) -> Option<Instant> {
        self.last_heartbeat_sent
    }

    pub fn last_inbound(&self) -> Option<Instant> {
        self.last_inbound
    }

    /// Any inbound byte, valid frame or not.
    pub fn record_inbound(&mut self, now: Instant) {
        self.last_inbound = Some(now);
        self.deadline = now + self.timeout;
    }

    pub fn record_heartbeat_sent(&mut self, now: Instant) {
        self.last_heartbeat_sent = Some(now);
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(1);
    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn first_deadline_counts_from_start() {
        let start = Instant::now();
        let clock = HeartbeatClock::start(INTERVAL, TIMEOUT, start);
        assert_eq!(clock.deadline(), start + TIMEOUT);
        assert!(!clock.is_expired(start + Duration::from_secs(9)));
        assert!(clock.is_expired(start + TIMEOUT));
    }

    #[test]
    fn inbound_traffic_extends_deadline() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::start(INTERVAL, TIMEOUT, start);

        let later = start + Duration::from_secs(8);
        clock.record_inbound(later);
        assert_eq!(clock.last_inbound(), Some(later));
        assert_eq!(clock.deadline(), later + TIMEOUT);
        assert!(!clock.is_expired(start + Duration::from_secs(12)));
    }

    #[test]
    fn sending_heartbeat_does_not_extend_deadline() {
        let start = Instant::now();
        let mut clock = HeartbeatClock::start(INTERVAL, TIMEOUT, start);

        for secs in 1..=9 {
            clock.record_heartbeat_sent(start + Duration::from_secs(secs));
        }
        assert_eq!(
            clock.last_heartbeat_sent(),
            Some(start + Duration::from_secs(9))
        );
        assert_eq!(clock.deadline(), start + TIMEOUT);
        assert!(clock.is_expired(start + TIMEOUT));
    }
}
