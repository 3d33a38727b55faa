//! The memory aggregate: concept store, connect graph and serial counter

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{Checkpoint, Concept, ConceptKind, Connect, Outcome};

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Concept not found: {0:?}")]
    MissingConcept(String),

    #[error("Connect not found: {0:?}")]
    MissingConnect(String),

    #[error("Connect {connect:?} points at unknown concept {endpoint:?}")]
    DanglingEndpoint { connect: String, endpoint: String },

    #[error("Connect {0:?} has an empty history")]
    EmptyHistory(String),

    #[error("Stored under {stored:?} but identifies as {derived:?}")]
    KeyMismatch { stored: String, derived: String },

    #[error("A {} concept carries no transcription", .0.name())]
    NotTextual(ConceptKind),

    #[error("Transcription text is empty")]
    EmptyText,
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Every concept, every connect, and the next serial number.
///
/// Both maps are ordered so that iteration and the encoded store are
/// deterministic for equal contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Memory {
    #[serde(default)]
    pub(crate) concepts: BTreeMap<String, Concept>,
    #[serde(default)]
    pub(crate) connects: BTreeMap<String, Connect>,
    #[serde(default)]
    pub(crate) serial: u64,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Concept Store ====================

    /// Insert a concept unless its identity is already stored.
    ///
    /// Returns `true` when the identity already existed; nothing is changed
    /// in that case.
    pub fn add_concept(&mut self, concept: Concept) -> bool {
        let key = concept.key();
        if self.concepts.contains_key(&key) {
            return true;
        }
        self.concepts.insert(key, concept);
        false
    }

    /// Look up a concept by identity
    pub fn concept(&self, key: &str) -> Result<&Concept> {
        self.concepts
            .get(key)
            .ok_or_else(|| MemoryError::MissingConcept(key.to_string()))
    }

    pub fn concepts(&self) -> impl Iterator<Item = (&String, &Concept)> {
        self.concepts.iter()
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Allocate the next serial number (1-based, never reused)
    pub fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    /// The last serial handed out
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Fill in the transcription of a word or sentence concept
    pub fn complete_concept(&mut self, key: &str, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MemoryError::EmptyText);
        }
        let concept = self
            .concepts
            .get_mut(key)
            .ok_or_else(|| MemoryError::MissingConcept(key.to_string()))?;
        if !concept.kind.is_textual() {
            return Err(MemoryError::NotTextual(concept.kind));
        }
        concept.text = text.to_string();
        concept.incomplete = false;
        Ok(())
    }

    // ==================== Connect Graph ====================

    /// Insert a connect unless its identity is already stored.
    ///
    /// Both endpoints must already be in the concept store. Returns `true`
    /// when the identity already existed.
    pub fn add_connect(&mut self, connect: Connect) -> Result<bool> {
        let key = connect.key();
        if self.connects.contains_key(&key) {
            return Ok(true);
        }
        for endpoint in [&connect.from, &connect.to] {
            if !self.concepts.contains_key(endpoint) {
                return Err(MemoryError::DanglingEndpoint {
                    connect: key,
                    endpoint: endpoint.clone(),
                });
            }
        }
        if connect.history.is_empty() {
            return Err(MemoryError::EmptyHistory(key));
        }
        self.connects.insert(key, connect);
        Ok(false)
    }

    /// Look up a connect by identity
    pub fn connect(&self, key: &str) -> Result<&Connect> {
        self.connects
            .get(key)
            .ok_or_else(|| MemoryError::MissingConnect(key.to_string()))
    }

    pub fn connects(&self) -> impl Iterator<Item = &Connect> {
        self.connects.values()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.len()
    }

    /// Both endpoints of a connect, resolved through the concept store
    pub fn endpoints(&self, connect: &Connect) -> Result<(&Concept, &Concept)> {
        Ok((self.concept(&connect.from)?, self.concept(&connect.to)?))
    }

    /// Append the checkpoint for a review outcome and return it
    pub fn record_outcome(
        &mut self,
        key: &str,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Result<Checkpoint> {
        let connect = self
            .connects
            .get_mut(key)
            .ok_or_else(|| MemoryError::MissingConnect(key.to_string()))?;
        let checkpoint = connect.apply(outcome, now);
        log::debug!("{:?} -> level {}", key, checkpoint.level);
        Ok(checkpoint)
    }

    /// Check the standing invariants of a decoded graph
    pub fn validate(&self) -> Result<()> {
        for (key, concept) in &self.concepts {
            let derived = concept.key();
            if *key != derived {
                return Err(MemoryError::KeyMismatch {
                    stored: key.clone(),
                    derived,
                });
            }
        }
        for (key, connect) in &self.connects {
            let derived = connect.key();
            if *key != derived {
                return Err(MemoryError::KeyMismatch {
                    stored: key.clone(),
                    derived,
                });
            }
            if connect.history.is_empty() {
                return Err(MemoryError::EmptyHistory(key.clone()));
            }
            for endpoint in [&connect.from, &connect.to] {
                if !self.concepts.contains_key(endpoint) {
                    return Err(MemoryError::DanglingEndpoint {
                        connect: key.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn audio_and_word(memory: &mut Memory) -> (String, String) {
        let audio = Concept::audio("lesson03/011.mp3", "hash-a");
        let word = Concept::transcript(ConceptKind::Word, memory.next_serial()).unwrap();
        let keys = (audio.key(), word.key());
        memory.add_concept(audio);
        memory.add_concept(word);
        keys
    }

    #[test]
    fn test_add_concept_is_idempotent() {
        let mut memory = Memory::new();
        assert!(!memory.add_concept(Concept::audio("a.mp3", "h1")));

        let snapshot = memory.clone();
        let mut renamed = Concept::audio("b.mp3", "h1");
        renamed.text = "different".to_string();
        assert!(memory.add_concept(renamed));
        assert_eq!(memory, snapshot);
        assert_eq!(memory.concept("file\th1").unwrap().file, "a.mp3");
    }

    #[test]
    fn test_add_connect_is_idempotent() {
        let mut memory = Memory::new();
        let (audio, word) = audio_and_word(&mut memory);
        let now = Utc::now();

        assert!(!memory.add_connect(Connect::new(&audio, &word, now)).unwrap());
        let snapshot = memory.clone();
        assert!(memory
            .add_connect(Connect::new(&audio, &word, now + Duration::days(1)))
            .unwrap());
        assert_eq!(memory, snapshot);

        // The reverse direction is a different connect
        assert!(!memory.add_connect(Connect::new(&word, &audio, now)).unwrap());
        assert_eq!(memory.connect_count(), 2);
    }

    #[test]
    fn test_add_connect_rejects_dangling_endpoint() {
        let mut memory = Memory::new();
        let (audio, _) = audio_and_word(&mut memory);

        let err = memory
            .add_connect(Connect::new(&audio, "text\t99", Utc::now()))
            .unwrap_err();
        assert!(matches!(err, MemoryError::DanglingEndpoint { ref endpoint, .. } if endpoint == "text\t99"));
        assert_eq!(memory.connect_count(), 0);
    }

    #[test]
    fn test_next_serial_is_monotonic() {
        let mut memory = Memory::new();
        let serials: Vec<u64> = (0..5).map(|_| memory.next_serial()).collect();
        assert_eq!(serials, vec![1, 2, 3, 4, 5]);
        assert_eq!(memory.serial(), 5);
    }

    #[test]
    fn test_record_outcome_appends() {
        let mut memory = Memory::new();
        let (audio, word) = audio_and_word(&mut memory);
        let start = Utc::now();
        let connect = Connect::new(&audio, &word, start);
        let key = connect.key();
        memory.add_connect(connect).unwrap();

        let up = memory
            .record_outcome(&key, Outcome::LevelUp, start + Duration::hours(1))
            .unwrap();
        assert_eq!(up.level, 1);
        let up = memory
            .record_outcome(&key, Outcome::LevelUp, start + Duration::hours(2))
            .unwrap();
        assert_eq!(up.level, 2);
        assert_eq!(memory.connect(&key).unwrap().history.len(), 3);

        let reset = memory
            .record_outcome(&key, Outcome::Reset, start + Duration::hours(3))
            .unwrap();
        assert_eq!(reset.level, 0);

        let history = &memory.connect(&key).unwrap().history;
        let levels: Vec<u32> = history.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![0, 1, 2, 0]);
        assert!(history.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_record_outcome_unknown_connect() {
        let mut memory = Memory::new();
        let err = memory
            .record_outcome("nope", Outcome::LevelUp, Utc::now())
            .unwrap_err();
        assert!(matches!(err, MemoryError::MissingConnect(_)));
    }

    #[test]
    fn test_complete_concept() {
        let mut memory = Memory::new();
        let (audio, word) = audio_and_word(&mut memory);

        assert!(matches!(
            memory.complete_concept(&word, "   "),
            Err(MemoryError::EmptyText)
        ));
        assert!(matches!(
            memory.complete_concept(&audio, "hello"),
            Err(MemoryError::NotTextual(ConceptKind::Audio))
        ));

        memory.complete_concept(&word, " bonjour ").unwrap();
        let concept = memory.concept(&word).unwrap();
        assert_eq!(concept.text, "bonjour");
        assert!(!concept.incomplete);
    }

    #[test]
    fn test_validate_detects_key_mismatch() {
        let mut memory = Memory::new();
        memory
            .concepts
            .insert("file\twrong".to_string(), Concept::audio("a.mp3", "right"));
        assert!(matches!(
            memory.validate(),
            Err(MemoryError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_detects_dangling_connect() {
        let mut memory = Memory::new();
        let (audio, _) = audio_and_word(&mut memory);
        let connect = Connect::new(&audio, "text\t42", Utc::now());
        memory.connects.insert(connect.key(), connect);
        assert!(matches!(
            memory.validate(),
            Err(MemoryError::DanglingEndpoint { .. })
        ));
    }
}
