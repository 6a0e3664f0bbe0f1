//! Client session state.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Sliding one-second window of accepted inputs.
#[derive(Debug)]
pub struct RateWindow {
    limit: u32,
    accepted: VecDeque<Instant>,
}

impl RateWindow {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            accepted: VecDeque::with_capacity(limit as usize),
        }
    }

    /// Record an input at `now` if the window still has room.
    pub fn allow(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.accepted.front() {
            if now.saturating_duration_since(oldest) >= Self::WINDOW {
                self.accepted.pop_front();
            } else {
                break;
            }
        }
        if self.accepted.len() >= self.limit as usize {
            return false;
        }
        self.accepted.push_back(now);
        true
    }
}

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Unique client ID.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    /// Player entity while joined.
    pub player_id: Option<u32>,
    /// Ledger account given at join; `None` for guests.
    pub user_id: Option<String>,
    pub inputs: RateWindow,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: u32, addr: SocketAddr, max_input_rate: u32) -> Self {
        Self {
            id,
            addr,
            player_id: None,
            user_id: None,
            inputs: RateWindow::new(max_input_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_window_limits_per_second() {
        let mut window = RateWindow::new(3);
        let t0 = Instant::now();
        assert!(window.allow(t0));
        assert!(window.allow(t0 + Duration::from_millis(100)));
        assert!(window.allow(t0 + Duration::from_millis(200)));
        assert!(!window.allow(t0 + Duration::from_millis(300)));
        // The first entry has left the window.
        assert!(window.allow(t0 + Duration::from_millis(1000)));
        assert!(!window.allow(t0 + Duration::from_millis(1050)));
    }

    #[test]
    fn test_rejected_inputs_do_not_count() {
        let mut window = RateWindow::new(1);
        let t0 = Instant::now();
        assert!(window.allow(t0));
        for ms in [10, 20, 30] {
            assert!(!window.allow(t0 + Duration::from_millis(ms)));
        }
        assert!(window.allow(t0 + Duration::from_millis(1000)));
    }
}
