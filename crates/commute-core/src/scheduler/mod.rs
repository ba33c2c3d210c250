//! Periodic recomputation.
//!
//! [`RepeatingTask`] does not own a thread or timer. The caller polls it
//! with the current time and runs the work when it reports due:
//!
//! ```ignore
//! let mut task = RepeatingTask::new(Duration::minutes(5), Utc::now());
//! loop {
//!     if task.poll(Utc::now()) {
//!         engine.estimate_now(&route, weather, &schedule);
//!     }
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//! }
//! ```
//!
//! A late poll fires once and reschedules from the poll time, so missed
//! intervals collapse into one run instead of queueing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Active,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RepeatingTask {
    interval: Duration,
    next_due: DateTime<Utc>,
    state: TaskState,
    runs: u64,
}

impl RepeatingTask {
    /// First run is due at `start`. Intervals shorter than a second are
    /// raised to one second.
    pub fn new(interval: Duration, start: DateTime<Utc>) -> Self {
        Self {
            interval: interval.max(Duration::seconds(1)),
            next_due: start,
            state: TaskState::Active,
            runs: 0,
        }
    }

    /// Returns `true` at most once per call when the task is due.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == TaskState::Cancelled || now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        self.runs += 1;
        true
    }

    pub fn cancel(&mut self) {
        self.state = TaskState::Cancelled;
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == TaskState::Cancelled
    }

    pub fn next_due(&self) -> DateTime<Utc> {
        self.next_due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of times `poll` has fired.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Time until the next run, zero when already due.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.next_due - now).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 8, minute, 0).unwrap()
    }

    #[test]
    fn fires_on_schedule() {
        let mut task = RepeatingTask::new(Duration::minutes(5), t(0));
        assert!(task.poll(t(0)));
        assert!(!task.poll(t(0)));
        assert!(!task.poll(t(4)));
        assert!(task.poll(t(5)));
        assert_eq!(task.next_due(), t(10));
        assert_eq!(task.runs(), 2);
    }

    #[test]
    fn missed_ticks_collapse() {
        let mut task = RepeatingTask::new(Duration::minutes(5), t(0));
        assert!(task.poll(t(0)));
        // 20 minutes late: one run, rescheduled from now
        assert!(task.poll(t(25)));
        assert!(!task.poll(t(26)));
        assert_eq!(task.next_due(), t(30));
        assert_eq!(task.runs(), 2);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut task = RepeatingTask::new(Duration::minutes(5), t(0));
        task.cancel();
        assert!(task.is_cancelled());
        assert!(!task.poll(t(30)));
        assert_eq!(task.runs(), 0);
    }

    #[test]
    fn remaining_is_never_negative() {
        let task = RepeatingTask::new(Duration::minutes(5), t(10));
        assert_eq!(task.remaining(t(7)), Duration::minutes(3));
        assert_eq!(task.remaining(t(12)), Duration::zero());
    }

    #[test]
    fn interval_has_a_floor() {
        let task = RepeatingTask::new(Duration::zero(), t(0));
        assert_eq!(task.interval(), Duration::seconds(1));
    }
}
