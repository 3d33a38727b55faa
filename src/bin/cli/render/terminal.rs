use chrono::{DateTime, Local, Utc};

use recall_lib::memory::{Concept, ConceptKind, Connect};
use recall_lib::review::stats::format_elapsed;
use recall_lib::review::LevelBucket;

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in `color` when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// One-line description of a concept
pub fn concept_label(concept: &Concept) -> String {
    match concept.kind {
        ConceptKind::Audio => concept.file.clone(),
        ConceptKind::Word | ConceptKind::Sentence if concept.incomplete => {
            format!("({} #{} awaiting text)", concept.kind.name(), concept.serial)
        }
        ConceptKind::Word | ConceptKind::Sentence => concept.text.clone(),
    }
}

pub fn bucket_name(bucket: LevelBucket) -> &'static str {
    match bucket {
        LevelBucket::HighReview => "review",
        LevelBucket::LowReview => "learning",
        LevelBucket::New => "new",
    }
}

pub fn bucket_color(bucket: LevelBucket) -> &'static str {
    match bucket {
        LevelBucket::HighReview => Color::GREEN,
        LevelBucket::LowReview => Color::YELLOW,
        LevelBucket::New => Color::CYAN,
    }
}

/// Review history, newest first, each entry with the gap to the one after it
pub fn history_lines(connect: &Connect, now: DateTime<Utc>, use_color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut later = now;
    for checkpoint in connect.history.iter().rev() {
        let gap = format_elapsed(later - checkpoint.time);
        let stamp = checkpoint.time.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        lines.push(format!(
            "  L{:<2} {}  {}",
            checkpoint.level,
            stamp,
            paint(&format!("+{}", gap), Color::GRAY, use_color)
        ));
        later = checkpoint.time;
    }
    lines
}
