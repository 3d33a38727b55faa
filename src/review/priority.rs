//! Session ordering for due connects
//!
//! Reviews come before new material: high-level reviews first, then
//! low-level reviews, then never-reviewed connects. Reviews go weakest
//! level first and earlier lesson first, with ties settled at random so that
//! no lesson is starved. New connects are introduced lesson by lesson,
//! audio→word before audio→sentence before anything else, oldest first.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;

use crate::memory::{Concept, ConceptKind, Connect, Memory, MemoryError};

/// Highest level that still counts as a low review
const LOW_REVIEW_MAX_LEVEL: u32 = 6;

/// Level bucket of a connect, declared in session order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LevelBucket {
    /// Level 7 and up
    HighReview,
    /// Levels 1 to 6
    LowReview,
    /// Level 0: never reviewed, or reset
    New,
}

impl LevelBucket {
    pub fn of(level: u32) -> Self {
        match level {
            0 => Self::New,
            1..=LOW_REVIEW_MAX_LEVEL => Self::LowReview,
            _ => Self::HighReview,
        }
    }
}

fn lesson_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[0-9]+").expect("lesson pattern is valid"))
}

/// First run of digits in an audio file path, extension excluded
pub fn lesson_number(file: &str) -> Option<u64> {
    let stem = Path::new(file).with_extension("");
    let stem = stem.to_string_lossy();
    let lesson = lesson_pattern()
        .find(&stem)
        .and_then(|m| m.as_str().parse().ok());
    lesson
}

/// Introduction rank of a connect direction among new material
pub fn pair_rank(from: ConceptKind, to: ConceptKind) -> u8 {
    match (from, to) {
        (ConceptKind::Audio, ConceptKind::Word) => 1,
        (ConceptKind::Audio, ConceptKind::Sentence) => 2,
        _ => 3,
    }
}

/// The audio endpoint of a connect: the source if it is audio, else the target
fn audio_endpoint<'a>(from: &'a Concept, to: &'a Concept) -> Option<&'a Concept> {
    match (from.kind, to.kind) {
        (ConceptKind::Audio, _) => Some(from),
        (_, ConceptKind::Audio) => Some(to),
        _ => None,
    }
}

/// Everything the comparator needs, resolved once per connect
#[derive(Debug, Clone)]
pub struct Priority {
    pub key: String,
    pub bucket: LevelBucket,
    pub level: u32,
    pub lesson: Option<u64>,
    pub pair_rank: u8,
    pub last_review: DateTime<Utc>,
    tie_break: u64,
}

impl Priority {
    pub fn of(memory: &Memory, connect: &Connect, tie_break: u64) -> Result<Self, MemoryError> {
        let (from, to) = memory.endpoints(connect)?;
        let last = connect
            .last_checkpoint()
            .ok_or_else(|| MemoryError::EmptyHistory(connect.key()))?;

        Ok(Self {
            key: connect.key(),
            bucket: LevelBucket::of(last.level),
            level: last.level,
            lesson: audio_endpoint(from, to).and_then(|audio| lesson_number(&audio.file)),
            pair_rank: pair_rank(from.kind, to.kind),
            last_review: last.time,
            tie_break,
        })
    }
}

/// Numbered lessons first, ascending; unnumbered last
fn compare_lessons(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Session order of two due connects
pub fn compare(a: &Priority, b: &Priority) -> Ordering {
    a.bucket.cmp(&b.bucket).then_with(|| match a.bucket {
        LevelBucket::HighReview | LevelBucket::LowReview => a
            .level
            .cmp(&b.level)
            .then_with(|| compare_lessons(a.lesson, b.lesson))
            .then_with(|| a.tie_break.cmp(&b.tie_break)),
        LevelBucket::New => compare_lessons(a.lesson, b.lesson)
            .then_with(|| a.pair_rank.cmp(&b.pair_rank))
            .then_with(|| a.last_review.cmp(&b.last_review)),
    })
}

/// Sort due connects into session order and return their keys.
///
/// One uniform draw per connect settles review ties, so every arrangement
/// of a tied group is equally likely while the sort still sees a total order.
pub fn order_session<R: Rng>(
    memory: &Memory,
    due: &[&Connect],
    rng: &mut R,
) -> Result<Vec<String>, MemoryError> {
    let mut ranked = due
        .iter()
        .map(|connect| Priority::of(memory, connect, rng.gen()))
        .collect::<Result<Vec<_>, _>>()?;
    ranked.sort_by(compare);
    log::debug!("Ordered {} due connects", ranked.len());
    Ok(ranked.into_iter().map(|p| p.key).collect())
}
