//! Per-employee attendance debounce.
//!
//! State lives only in memory and is lost on restart, so a restart inside
//! the window lets the next match write again.

use chrono::{DateTime, Local, TimeDelta};
use std::collections::HashMap;

/// Default minimum interval between two attendance writes for one employee.
pub const DEFAULT_COOLDOWN_SECS: i64 = 30;

#[derive(Debug)]
pub struct CooldownTracker {
    window: TimeDelta,
    last_marked: HashMap<i64, DateTime<Local>>,
}

impl CooldownTracker {
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window,
            last_marked: HashMap::new(),
        }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// True when `employee_id` was never marked or its window has elapsed.
    ///
    /// A match exactly `window` after the last mark is still suppressed.
    pub fn is_due(&self, employee_id: i64, now: DateTime<Local>) -> bool {
        match self.last_marked.get(&employee_id) {
            None => true,
            Some(last) => now.signed_duration_since(*last) > self.window,
        }
    }

    /// Record `now` as the last mark for `employee_id`.
    pub fn record(&mut self, employee_id: i64, now: DateTime<Local>) {
        self.last_marked.insert(employee_id, now);
    }

    pub fn last_marked(&self, employee_id: i64) -> Option<DateTime<Local>> {
        self.last_marked.get(&employee_id).copied()
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_COOLDOWN_SECS))
    }
}
