//! Due-time computation
//!
//! A connect is due once the interval for its current level has elapsed
//! since its last checkpoint. Due-ness is always derived from history and
//! never stored.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::memory::{Connect, Memory, MemoryError};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Level {level} is beyond the interval table (max level {max_level})")]
    LevelBeyondTable { level: u32, max_level: u32 },

    #[error("Invalid interval table: {0}")]
    InvalidTable(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Review interval per level, strictly increasing, starting at zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTable {
    intervals: Vec<Duration>,
}

impl IntervalTable {
    pub fn new(intervals: Vec<Duration>) -> Result<Self> {
        match intervals.first() {
            None => return Err(ScheduleError::InvalidTable("table is empty".into())),
            Some(first) if *first != Duration::zero() => {
                return Err(ScheduleError::InvalidTable(
                    "level 0 must have a zero interval".into(),
                ))
            }
            Some(_) => {}
        }
        if let Some(i) = intervals.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ScheduleError::InvalidTable(format!(
                "interval of level {} does not exceed level {}",
                i + 1,
                i
            )));
        }
        Ok(Self { intervals })
    }

    /// Level 0 is zero; level `n` (1-based) is `unit * base^(n-1)`
    pub fn geometric(unit: Duration, base: f64, steps: u32) -> Result<Self> {
        let unit_ms = unit.num_milliseconds() as f64;
        let mut intervals = vec![Duration::zero()];
        for i in 0..steps {
            let ms = (unit_ms * base.powi(i as i32)).round();
            // `as` saturates; an overflowing table then fails the increasing check
            intervals.push(Duration::milliseconds(ms as i64));
        }
        Self::new(intervals)
    }

    pub fn interval_at(&self, level: u32) -> Result<Duration> {
        self.intervals
            .get(level as usize)
            .copied()
            .ok_or(ScheduleError::LevelBeyondTable {
                level,
                max_level: self.max_level(),
            })
    }

    /// Highest level this table can schedule
    pub fn max_level(&self) -> u32 {
        (self.intervals.len() - 1) as u32
    }
}

/// When a connect next becomes due
pub fn next_due(connect: &Connect, table: &IntervalTable) -> Result<DateTime<Utc>> {
    let last = connect
        .last_checkpoint()
        .ok_or_else(|| MemoryError::EmptyHistory(connect.key()))?;
    let interval = table.interval_at(last.level)?;
    Ok(last
        .time
        .checked_add_signed(interval)
        .unwrap_or(DateTime::<Utc>::MAX_UTC))
}

/// Every connect that is due at `now` and has a usable prompt
pub fn due_pending<'m>(
    memory: &'m Memory,
    table: &IntervalTable,
    now: DateTime<Utc>,
) -> Result<Vec<&'m Connect>> {
    let mut due = Vec::new();
    for connect in memory.connects() {
        let from = memory.concept(&connect.from)?;
        if !from.is_usable_prompt() {
            continue;
        }
        if next_due(connect, table)? > now {
            continue;
        }
        due.push(connect);
    }
    log::debug!("{} of {} connects due", due.len(), memory.connect_count());
    Ok(due)
}
