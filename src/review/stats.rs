//! Review statistics and reporting helpers

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use super::priority::LevelBucket;
use super::schedule::{due_pending, IntervalTable, Result};
use crate::memory::{ConceptKind, Memory};

/// Counts over the whole memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub audio_concepts: usize,
    pub word_concepts: usize,
    pub sentence_concepts: usize,
    pub incomplete_concepts: usize,
    pub total_connects: usize,
    pub new_connects: usize,
    pub low_review_connects: usize,
    pub high_review_connects: usize,
    pub due_connects: usize,
    pub checkpoints: usize,
}

pub fn summarize(memory: &Memory, table: &IntervalTable, now: DateTime<Utc>) -> Result<MemoryStats> {
    let mut stats = MemoryStats::default();

    for (_, concept) in memory.concepts() {
        match concept.kind {
            ConceptKind::Audio => stats.audio_concepts += 1,
            ConceptKind::Word => stats.word_concepts += 1,
            ConceptKind::Sentence => stats.sentence_concepts += 1,
        }
        if concept.kind.is_textual() && concept.incomplete {
            stats.incomplete_concepts += 1;
        }
    }

    for connect in memory.connects() {
        stats.total_connects += 1;
        stats.checkpoints += connect.history.len();
        match LevelBucket::of(connect.level()) {
            LevelBucket::New => stats.new_connects += 1,
            LevelBucket::LowReview => stats.low_review_connects += 1,
            LevelBucket::HighReview => stats.high_review_connects += 1,
        }
    }

    stats.due_connects = due_pending(memory, table, now)?.len();
    Ok(stats)
}

/// Number of checkpoints recorded per calendar day in `tz`
pub fn daily_checkpoints<Tz: TimeZone>(memory: &Memory, tz: &Tz) -> BTreeMap<NaiveDate, usize> {
    let mut counter = BTreeMap::new();
    for connect in memory.connects() {
        for checkpoint in &connect.history {
            let day = checkpoint.time.with_timezone(tz).date_naive();
            *counter.entry(day).or_insert(0) += 1;
        }
    }
    counter
}

/// Format an elapsed duration like `2days.3hours.15mins.`
pub fn format_elapsed(duration: Duration) -> String {
    let mut minutes = duration.num_minutes().max(0);
    let (mut hours, mut days, mut years) = (0, 0, 0);
    if minutes >= 60 {
        hours = minutes / 60;
        minutes %= 60;
    }
    if hours >= 24 {
        days = hours / 24;
        hours %= 24;
    }
    if days > 365 {
        years = days / 365;
        days %= 365;
    }

    let mut out = String::new();
    for (value, unit) in [(years, "years"), (days, "days"), (hours, "hours"), (minutes, "mins")] {
        if value > 0 {
            out.push_str(&format!("{}{}.", value, unit));
        }
    }
    if out.is_empty() {
        "now".to_string()
    } else {
        out
    }
}
