use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

struct State {
    processed: usize,
    last_emit: Option<Instant>,
}

/// Rate-limits progress callbacks from many workers. The count is bumped under
/// the same lock that decides whether to emit, so callbacks arrive in order and
/// the one for the last file is never skipped.
pub struct ProgressThrottle<'a> {
    total: usize,
    interval: Duration,
    state: Mutex<State>,
    on_progress: &'a (dyn Fn(Progress) + Send + Sync),
}

impl<'a> ProgressThrottle<'a> {
    pub fn new(total: usize, interval: Duration, on_progress: &'a (dyn Fn(Progress) + Send + Sync)) -> Self {
        Self {
            total,
            interval,
            state: Mutex::new(State {
                processed: 0,
                last_emit: None,
            }),
            on_progress,
        }
    }

    /// Report the starting point, `0 / total`.
    pub fn start(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.emit(&mut state, true);
    }

    /// Count one more finished file.
    pub fn advance(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.processed += 1;
        let force = state.processed >= self.total;
        self.emit(&mut state, force);
    }

    fn emit(&self, state: &mut State, force: bool) {
        let now = Instant::now();
        let due = state
            .last_emit
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if force || due {
            state.last_emit = Some(now);
            (self.on_progress)(Progress {
                processed: state.processed,
                total: self.total,
            });
        }
    }
}
