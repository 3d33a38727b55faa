//! Data models for the concept graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::MemoryError;

/// Kind of learnable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptKind {
    /// A recorded audio clip
    Audio,
    /// A single word, transcribed by hand
    Word,
    /// A full sentence, transcribed by hand
    Sentence,
}

impl ConceptKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Word => "word",
            Self::Sentence => "sentence",
        }
    }

    /// Word and sentence concepts carry typed text instead of a file
    pub fn is_textual(&self) -> bool {
        match self {
            Self::Audio => false,
            Self::Word | Self::Sentence => true,
        }
    }
}

/// One learnable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Concept {
    #[serde(rename = "What")]
    pub kind: ConceptKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_hash: String,
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub incomplete: bool,
}

impl Concept {
    /// An audio clip, identified by the hash of its content
    pub fn audio(file: impl Into<String>, file_hash: impl Into<String>) -> Self {
        Self {
            kind: ConceptKind::Audio,
            text: String::new(),
            file: file.into(),
            file_hash: file_hash.into(),
            serial: 0,
            incomplete: false,
        }
    }

    /// A word or sentence awaiting its transcription
    pub fn transcript(kind: ConceptKind, serial: u64) -> Result<Self, MemoryError> {
        if !kind.is_textual() {
            return Err(MemoryError::NotTextual(kind));
        }
        Ok(Self {
            kind,
            text: String::new(),
            file: String::new(),
            file_hash: String::new(),
            serial,
            incomplete: true,
        })
    }

    /// Identity string used as the store key.
    ///
    /// The `text\t<serial>` and `file\t<hash>` layouts are part of the
    /// on-disk format and must not change.
    pub fn key(&self) -> String {
        match self.kind {
            ConceptKind::Word | ConceptKind::Sentence => format!("text\t{}", self.serial),
            ConceptKind::Audio => format!("file\t{}", self.file_hash),
        }
    }

    /// Whether this concept may be shown as the prompt of a review
    pub fn is_usable_prompt(&self) -> bool {
        !(self.kind.is_textual() && self.incomplete)
    }
}

/// One `(level, time)` entry in a connect's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Checkpoint {
    pub level: u32,
    pub time: DateTime<Utc>,
}

/// Result of presenting a connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Recalled: advance one level
    LevelUp,
    /// Forgotten: back to level 0
    Reset,
}

/// A directed, reviewable association between two concepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connect {
    pub from: String,
    pub to: String,
    /// Oldest first, never empty
    #[serde(rename = "Histories")]
    pub history: Vec<Checkpoint>,
}

impl Connect {
    /// A fresh association at level 0
    pub fn new(from: impl Into<String>, to: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            history: vec![Checkpoint { level: 0, time: now }],
        }
    }

    pub fn key(&self) -> String {
        connect_key(&self.from, &self.to)
    }

    /// The most recent checkpoint, if the history has not been corrupted
    pub fn last_checkpoint(&self) -> Option<&Checkpoint> {
        self.history.last()
    }

    /// Current level (level of the last checkpoint)
    pub fn level(&self) -> u32 {
        self.history.last().map(|c| c.level).unwrap_or(0)
    }

    /// Append the checkpoint produced by a review outcome
    pub(crate) fn apply(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Checkpoint {
        let level = match outcome {
            Outcome::LevelUp => self.level() + 1,
            Outcome::Reset => 0,
        };
        let checkpoint = Checkpoint { level, time: now };
        self.history.push(checkpoint);
        checkpoint
    }
}

/// Identity string of the connect from `from` to `to`
pub fn connect_key(from: &str, to: &str) -> String {
    format!("{}\t{}", from, to)
}
