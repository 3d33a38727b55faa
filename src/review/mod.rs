//! Review scheduling for the concept graph
//!
//! This module provides:
//! - The level → interval table and due-connect selection
//! - Session ordering of due connects
//! - Review statistics

pub mod priority;
pub mod schedule;
pub mod stats;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::SessionConfig;
use crate::memory::Memory;

pub use priority::{order_session, LevelBucket};
pub use schedule::{due_pending, next_due, IntervalTable, ScheduleError};

/// How much one session may present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_items: usize,
    /// Wall-clock budget, enforced by whoever drives the session
    pub budget: Option<Duration>,
}

impl From<&SessionConfig> for SessionLimits {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_items: config.max_items,
            budget: config
                .budget_minutes
                .map(|minutes| Duration::minutes(minutes as i64)),
        }
    }
}

/// Due connects at `now`, in session order, capped at `limits.max_items`
pub fn plan_session<R: Rng>(
    memory: &Memory,
    table: &IntervalTable,
    now: DateTime<Utc>,
    limits: &SessionLimits,
    rng: &mut R,
) -> schedule::Result<Vec<String>> {
    let due = due_pending(memory, table, now)?;
    let mut keys = order_session(memory, &due, rng)?;
    keys.truncate(limits.max_items);
    Ok(keys)
}
