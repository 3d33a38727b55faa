//! Registering audio files and completing their transcriptions
//!
//! Each imported clip becomes an audio concept keyed by its content hash,
//! paired with a fresh word or sentence concept awaiting its text. Words
//! are drilled in both directions; sentences only from the audio side.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::memory::{Concept, ConceptKind, Connect, Memory, MemoryError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// What happened to one imported file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ImportOutcome {
    Added { audio: String, transcript: String },
    /// The same audio content is already stored
    Skipped { audio: String },
}

/// Lowercase hex SHA-512 of the file contents
pub fn hash_content(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

/// Path of an audio file as stored: relative to `files_dir` when inside it
pub fn stored_file_name(path: &Path, files_dir: &Path) -> String {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let root = fs::canonicalize(files_dir).unwrap_or_else(|_| files_dir.to_path_buf());
    let relative = resolved.strip_prefix(&root).unwrap_or(&resolved);
    relative.to_string_lossy().to_string()
}

/// Register one audio file as a new card of the given kind
pub fn import_audio(
    memory: &mut Memory,
    files_dir: &Path,
    path: &Path,
    kind: ConceptKind,
    now: DateTime<Utc>,
) -> Result<ImportOutcome> {
    if !kind.is_textual() {
        return Err(MemoryError::NotTextual(kind).into());
    }

    let data = fs::read(path)?;
    let audio = Concept::audio(stored_file_name(path, files_dir), hash_content(&data));
    let audio_key = audio.key();
    if memory.add_concept(audio) {
        log::warn!("Skipping {:?}: content already imported", path);
        return Ok(ImportOutcome::Skipped { audio: audio_key });
    }

    let transcript = Concept::transcript(kind, memory.next_serial())?;
    let transcript_key = transcript.key();
    memory.add_concept(transcript);

    memory.add_connect(Connect::new(&audio_key, &transcript_key, now))?;
    if kind == ConceptKind::Word {
        memory.add_connect(Connect::new(&transcript_key, &audio_key, now))?;
    }

    log::info!("Imported {:?} as {} {:?}", path, kind.name(), transcript_key);
    Ok(ImportOutcome::Added {
        audio: audio_key,
        transcript: transcript_key,
    })
}

/// A word or sentence that still needs its text typed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTranscription {
    pub concept: String,
    pub kind: ConceptKind,
    /// Audio file to play while transcribing
    pub audio_file: String,
}

/// Incomplete transcripts, each paired with an audio clip it is connected to
pub fn pending_transcriptions(memory: &Memory) -> Result<Vec<PendingTranscription>> {
    let mut pending = BTreeMap::new();
    for connect in memory.connects() {
        let (from, to) = memory.endpoints(connect)?;
        let (text, text_key, audio) = match (from.kind, to.kind) {
            (ConceptKind::Audio, ConceptKind::Word | ConceptKind::Sentence) => (to, &connect.to, from),
            (ConceptKind::Word | ConceptKind::Sentence, ConceptKind::Audio) => (from, &connect.from, to),
            _ => continue,
        };
        if !text.incomplete && !text.text.is_empty() {
            continue;
        }
        pending
            .entry(text_key.clone())
            .or_insert_with(|| PendingTranscription {
                concept: text_key.clone(),
                kind: text.kind,
                audio_file: audio.file.clone(),
            });
    }
    Ok(pending.into_values().collect())
}
