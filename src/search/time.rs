//! Search limits and the polled time manager.
//!
//! The search never blocks on a timer: it polls `SearchControl::should_stop`
//! on a node-count interval and at iteration boundaries. `stop` and
//! `ponderhit` act from the command thread through the same object, the
//! former via an atomic flag, the latter by swapping the manager behind the
//! mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::board::Color;

/// Milliseconds kept in reserve so a move always leaves the clock positive.
const SAFETY_MARGIN_MS: u64 = 50;
const MIN_THINK_MS: u64 = 5;
/// Assumed horizon when the GUI sends no `movestogo`.
const DEFAULT_MOVES_TO_GO: u64 = 40;

/// Everything a `go` command may constrain the search by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Limits {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
    pub ponder: bool,
}

/// Stop condition polled by the search. A `None` deadline never fires.
#[derive(Debug, Clone)]
pub struct TimeManager {
    deadline: Option<Instant>,
    node_limit: Option<u64>,
}

impl TimeManager {
    pub fn infinite() -> TimeManager {
        TimeManager {
            deadline: None,
            node_limit: None,
        }
    }

    pub fn fixed(duration: Duration) -> TimeManager {
        TimeManager {
            deadline: Some(Instant::now() + duration),
            node_limit: None,
        }
    }

    /// Derive the stop condition from `go` arguments. The clock budget is
    /// `remaining / divisor(movestogo)` plus most of the increment, hard
    /// capped so the safety margin is never spent.
    pub fn from_limits(limits: &Limits, side_to_move: Color) -> TimeManager {
        let node_limit = limits.nodes;
        if limits.infinite || limits.ponder {
            return TimeManager {
                deadline: None,
                node_limit,
            };
        }
        if let Some(ms) = limits.movetime {
            return TimeManager {
                deadline: Some(Instant::now() + Duration::from_millis(ms)),
                node_limit,
            };
        }

        let (time, inc) = match side_to_move {
            Color::White => (limits.wtime, limits.winc),
            Color::Black => (limits.btime, limits.binc),
        };
        let Some(remaining) = time else {
            return TimeManager {
                deadline: None,
                node_limit,
            };
        };

        let divisor = limits
            .movestogo
            .map(|m| u64::from(m).clamp(2, 50))
            .unwrap_or(DEFAULT_MOVES_TO_GO);
        let mut budget = remaining / divisor + inc.unwrap_or(0) * 3 / 4;
        let hard_cap = remaining.saturating_sub(SAFETY_MARGIN_MS);
        budget = budget.min(hard_cap).max(MIN_THINK_MS);

        TimeManager {
            deadline: Some(Instant::now() + Duration::from_millis(budget)),
            node_limit,
        }
    }

    pub fn should_stop(&self, nodes: u64) -> bool {
        if let Some(limit) = self.node_limit {
            if nodes >= limit {
                return true;
            }
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// Shared between the command thread and the search thread.
pub struct SearchControl {
    stop: AtomicBool,
    running: AtomicBool,
    manager: Mutex<TimeManager>,
}

impl SearchControl {
    pub fn new(manager: TimeManager) -> SearchControl {
        SearchControl {
            stop: AtomicBool::new(false),
            running: AtomicBool::new(false),
            manager: Mutex::new(manager),
        }
    }

    /// Cooperative cancellation; observed at the next poll point. Also
    /// cancels a search whose thread has not reached its first node yet.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// True from the search thread's first instruction to its last; the
    /// `ponderhit` handler spins on this before swapping limits.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Atomically replace the stop condition; this is how a ponder search
    /// acquires its real limits on `ponderhit`.
    pub fn replace_manager(&self, manager: TimeManager) {
        *self.manager.lock() = manager;
    }

    pub fn should_stop(&self, nodes: u64) -> bool {
        self.stop_requested() || self.manager.lock().should_stop(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_never_stops() {
        let tm = TimeManager::infinite();
        assert!(!tm.should_stop(u64::MAX - 1));
    }

    #[test]
    fn node_limit_fires() {
        let limits = Limits {
            nodes: Some(1000),
            infinite: true,
            ..Limits::default()
        };
        let tm = TimeManager::from_limits(&limits, Color::White);
        assert!(!tm.should_stop(999));
        assert!(tm.should_stop(1000));
    }

    #[test]
    fn movetime_deadline_passes() {
        let tm = TimeManager::fixed(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(tm.should_stop(0));
    }

    #[test]
    fn clock_budget_is_a_fraction_of_remaining() {
        let limits = Limits {
            wtime: Some(60_000),
            btime: Some(60_000),
            ..Limits::default()
        };
        let tm = TimeManager::from_limits(&limits, Color::White);
        let deadline = tm.deadline.expect("clock limits produce a deadline");
        let budget = deadline - Instant::now();
        assert!(budget <= Duration::from_millis(60_000 / 40 + 1));
        assert!(budget > Duration::from_millis(100));
    }

    #[test]
    fn stop_flag_wins_over_manager() {
        let control = SearchControl::new(TimeManager::infinite());
        assert!(!control.should_stop(0));
        control.request_stop();
        assert!(control.should_stop(0));
    }

    #[test]
    fn ponderhit_swaps_manager() {
        let control = SearchControl::new(TimeManager::infinite());
        assert!(!control.should_stop(1_000_000));
        control.replace_manager(TimeManager::fixed(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(2));
        assert!(control.should_stop(0));
    }
}
