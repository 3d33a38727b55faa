//! Durable storage for the memory graph
//!
//! Directory structure:
//! ```text
//! {data_dir}/
//! ├── db            # zlib-compressed JSON: Concepts, Connects, Serial
//! ├── db.{random}   # in-flight temporary file during a save
//! └── files/        # imported audio assets
//! ```
//!
//! A save writes a fresh temporary file, decodes it back and compares entry
//! counts before renaming it over `db`. Saves are serialized by a mutex so
//! two writers never race on the temporary name or the rename.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

use super::graph::{Memory, MemoryError};

const STORE_FILE: &str = "db";
const FILES_DIR: &str = "files";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt store: {0}")]
    Corrupt(#[from] MemoryError),

    #[error(
        "Save verification failed: wrote {expected_concepts} concepts / {expected_connects} connects, read back {found_concepts} / {found_connects}"
    )]
    VerifyMismatch {
        expected_concepts: usize,
        expected_connects: usize,
        found_concepts: usize,
        found_connects: usize,
    },

    #[error("Background saver has stopped")]
    SaverStopped,

    #[error("Background saver panicked")]
    SaverPanicked,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// An encoded memory, ready to be written
pub struct Snapshot {
    bytes: Vec<u8>,
    concepts: usize,
    connects: usize,
}

impl Snapshot {
    pub fn encode(memory: &Memory) -> Result<Self> {
        let json = serde_json::to_vec(memory)?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(Self {
            bytes: encoder.finish()?,
            concepts: memory.concept_count(),
            connects: memory.connect_count(),
        })
    }

}

fn decode(bytes: &[u8]) -> Result<Memory> {
    let mut json = Vec::new();
    ZlibDecoder::new(bytes).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Storage manager for the memory graph
pub struct MemoryStorage {
    /// Base path for the store (e.g., ~/.local/share/recall)
    root: PathBuf,
    save_lock: Mutex<()>,
}

impl MemoryStorage {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            save_lock: Mutex::new(()),
        }
    }

    /// Get the canonical store path
    pub fn store_path(&self) -> PathBuf {
        self.root.join(STORE_FILE)
    }

    /// Get the directory imported audio lives in
    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    /// Initialize storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.files_dir())?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state
        self.save_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the memory, or an empty one if nothing has been saved yet
    pub fn load(&self) -> Result<Memory> {
        let path = self.store_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No store at {:?}, starting empty", path);
                return Ok(Memory::new());
            }
            Err(e) => return Err(e.into()),
        };

        let memory = decode(&bytes)?;
        memory.validate()?;
        log::info!(
            "Loaded {} concepts, {} connects from {:?}",
            memory.concept_count(),
            memory.connect_count(),
            path
        );
        Ok(memory)
    }

    /// Encode, write, verify and install the memory as the canonical store
    pub fn save(&self, memory: &Memory) -> Result<()> {
        let _guard = self.lock();
        let snapshot = Snapshot::encode(memory)?;
        self.commit(&snapshot)
    }

    /// Install a previously encoded snapshot
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.lock();
        self.commit(snapshot)
    }

    /// Must be called with the save lock held
    fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let tmp_path = self
            .root
            .join(format!("{}.{}", STORE_FILE, rand::random::<u64>()));

        let result = self.write_verified(&tmp_path, snapshot);
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
            return result;
        }

        fs::rename(&tmp_path, self.store_path()).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StorageError::Io(e)
        })?;
        log::debug!(
            "Saved {} concepts, {} connects ({} bytes)",
            snapshot.concepts,
            snapshot.connects,
            snapshot.bytes.len()
        );
        Ok(())
    }

    fn write_verified(&self, tmp_path: &Path, snapshot: &Snapshot) -> Result<()> {
        let mut out = File::create(tmp_path)?;
        out.write_all(&snapshot.bytes)?;
        out.sync_all()?;
        drop(out);

        let scratch = decode(&fs::read(tmp_path)?)?;
        if scratch.concept_count() != snapshot.concepts
            || scratch.connect_count() != snapshot.connects
        {
            return Err(StorageError::VerifyMismatch {
                expected_concepts: snapshot.concepts,
                expected_connects: snapshot.connects,
                found_concepts: scratch.concept_count(),
                found_connects: scratch.connect_count(),
            });
        }
        Ok(())
    }
}

/// Saves memory snapshots on a worker thread, in submission order.
///
/// Each snapshot is encoded on the caller's thread while it holds the
/// memory, so the worker never sees a graph mid-mutation. The worker stops
/// at the first failure; `finish` reports it.
pub struct BackgroundSaver {
    sender: Option<mpsc::Sender<Snapshot>>,
    worker: Option<JoinHandle<Result<usize>>>,
    failed: Arc<AtomicBool>,
}

impl BackgroundSaver {
    pub fn spawn(storage: Arc<MemoryStorage>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Snapshot>();
        let failed = Arc::new(AtomicBool::new(false));
        let worker_failed = Arc::clone(&failed);
        let worker = thread::Builder::new()
            .name("recall-saver".to_string())
            .spawn(move || {
                let mut saved = 0;
                for snapshot in rx {
                    if let Err(e) = storage.save_snapshot(&snapshot) {
                        log::error!("Background save failed: {}", e);
                        worker_failed.store(true, Ordering::SeqCst);
                        return Err(e);
                    }
                    saved += 1;
                }
                Ok(saved)
            })?;

        Ok(Self {
            sender: Some(tx),
            worker: Some(worker),
            failed,
        })
    }

    /// Fails once any queued save has failed; the cause is reported by `finish`
    pub fn check(&self) -> Result<()> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(StorageError::SaverStopped);
        }
        Ok(())
    }

    /// Queue a save of the memory as it is right now
    pub fn submit(&self, memory: &Memory) -> Result<()> {
        self.check()?;
        let snapshot = Snapshot::encode(memory)?;
        self.sender
            .as_ref()
            .ok_or(StorageError::SaverStopped)?
            .send(snapshot)
            .map_err(|_| StorageError::SaverStopped)
    }

    /// Wait for every queued save; returns how many were written
    pub fn finish(mut self) -> Result<usize> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<usize> {
        drop(self.sender.take());
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| StorageError::SaverPanicked)?,
            None => Ok(0),
        }
    }
}

impl Drop for BackgroundSaver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Pending saves lost: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Concept, ConceptKind, Connect, Outcome};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_test_storage() -> (MemoryStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = MemoryStorage::new(temp_dir.path().to_path_buf());
        storage.init().unwrap();
        (storage, temp_dir)
    }

    fn populated_memory() -> Memory {
        let mut memory = Memory::new();
        let now = Utc::now();
        for i in 0..3 {
            let audio = Concept::audio(format!("lesson{:02}/001.mp3", i), format!("hash{}", i));
            let mut word = Concept::transcript(ConceptKind::Word, memory.next_serial()).unwrap();
            word.text = format!("word {}", i);
            word.incomplete = false;
            let (a, w) = (audio.key(), word.key());
            memory.add_concept(audio);
            memory.add_concept(word);
            memory.add_connect(Connect::new(&a, &w, now)).unwrap();
            memory.add_connect(Connect::new(&w, &a, now)).unwrap();
            memory
                .record_outcome(&format!("{}\t{}", a, w), Outcome::LevelUp, now + Duration::hours(i))
                .unwrap();
        }
        memory
    }

    fn dir_entries(temp: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_load_missing_store_is_empty() {
        let (storage, _temp) = create_test_storage();
        let memory = storage.load().unwrap();
        assert_eq!(memory.concept_count(), 0);
        assert_eq!(memory.connect_count(), 0);
        assert_eq!(memory.serial(), 0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (storage, temp) = create_test_storage();
        let memory = populated_memory();

        storage.save(&memory).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, memory);
        assert_eq!(dir_entries(&temp), vec!["db".to_string(), "files".to_string()]);
    }

    #[test]
    fn test_serial_survives_reload() {
        let (storage, _temp) = create_test_storage();
        let mut memory = Memory::new();
        assert_eq!(memory.next_serial(), 1);
        assert_eq!(memory.next_serial(), 2);
        storage.save(&memory).unwrap();

        let mut reloaded = storage.load().unwrap();
        assert_eq!(reloaded.next_serial(), 3);
    }

    #[test]
    fn test_save_replaces_previous_store() {
        let (storage, _temp) = create_test_storage();
        storage.save(&Memory::new()).unwrap();

        let memory = populated_memory();
        storage.save(&memory).unwrap();
        assert_eq!(storage.load().unwrap().connect_count(), 6);
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let (storage, _temp) = create_test_storage();
        fs::write(storage.store_path(), b"definitely not zlib").unwrap();
        assert!(storage.load().is_err());
    }

    #[test]
    fn test_dangling_connect_in_store_is_rejected() {
        let (storage, _temp) = create_test_storage();
        let json = br#"{"Concepts":{},"Connects":{"a\tb":{"From":"a","To":"b","Histories":[{"Level":0,"Time":"2024-01-01T00:00:00Z"}]}},"Serial":0}"#;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json).unwrap();
        fs::write(storage.store_path(), encoder.finish().unwrap()).unwrap();

        assert!(matches!(
            storage.load(),
            Err(StorageError::Corrupt(MemoryError::DanglingEndpoint { .. }))
        ));
    }

    #[test]
    fn test_concurrent_saves_are_serialized() {
        let (storage, temp) = create_test_storage();
        let storage = Arc::new(storage);
        let memory = Arc::new(populated_memory());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                let memory = Arc::clone(&memory);
                thread::spawn(move || storage.save(&memory))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(storage.load().unwrap(), *memory);
        assert_eq!(dir_entries(&temp), vec!["db".to_string(), "files".to_string()]);
    }

    #[test]
    fn test_background_saver_keeps_order() {
        let (storage, _temp) = create_test_storage();
        let storage = Arc::new(storage);
        let saver = BackgroundSaver::spawn(Arc::clone(&storage)).unwrap();

        let mut memory = Memory::new();
        for _ in 0..5 {
            memory.next_serial();
            saver.submit(&memory).unwrap();
        }
        assert_eq!(saver.finish().unwrap(), 5);
        assert_eq!(storage.load().unwrap().serial(), 5);
    }

    #[test]
    fn test_background_saver_drop_flushes() {
        let (storage, _temp) = create_test_storage();
        let storage = Arc::new(storage);
        let memory = populated_memory();
        {
            let saver = BackgroundSaver::spawn(Arc::clone(&storage)).unwrap();
            saver.submit(&memory).unwrap();
        }
        assert_eq!(storage.load().unwrap(), memory);
    }

    #[test]
    fn test_background_saver_reports_failure() {
        let temp = TempDir::new().unwrap();
        // A regular file where the store directory should be
        let blocked = temp.path().join("blocked");
        fs::write(&blocked, b"").unwrap();
        let storage = Arc::new(MemoryStorage::new(blocked));

        let saver = BackgroundSaver::spawn(storage).unwrap();
        saver.submit(&Memory::new()).unwrap();
        assert!(matches!(saver.finish(), Err(StorageError::Io(_))));
    }

    /// Saver whose first queued save has already failed
    fn failed_saver(temp: &TempDir) -> BackgroundSaver {
        let blocked = temp.path().join("blocked");
        fs::write(&blocked, b"").unwrap();
        let saver = BackgroundSaver::spawn(Arc::new(MemoryStorage::new(blocked))).unwrap();
        saver.submit(&Memory::new()).unwrap();
        for _ in 0..500 {
            if saver.check().is_err() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        saver
    }

    #[test]
    fn test_background_saver_rejects_submit_after_failure() {
        let temp = TempDir::new().unwrap();
        let saver = failed_saver(&temp);

        assert!(matches!(saver.check(), Err(StorageError::SaverStopped)));
        assert!(matches!(
            saver.submit(&populated_memory()),
            Err(StorageError::SaverStopped)
        ));
        assert!(matches!(saver.finish(), Err(StorageError::Io(_))));
    }

    #[test]
    fn test_failed_save_keeps_previous_store() {
        let (storage, temp) = create_test_storage();
        let previous = populated_memory();
        storage.save(&previous).unwrap();
        let before = fs::read(storage.store_path()).unwrap();

        // Counts that cannot match what decodes back from the written file
        let mut bad = Snapshot::encode(&Memory::new()).unwrap();
        bad.concepts = 99;
        assert!(matches!(
            storage.save_snapshot(&bad),
            Err(StorageError::VerifyMismatch { expected_concepts: 99, found_concepts: 0, .. })
        ));

        assert_eq!(fs::read(storage.store_path()).unwrap(), before);
        assert_eq!(storage.load().unwrap(), previous);
        // No temporary db.<n> file is left behind
        assert_eq!(dir_entries(&temp), vec!["db".to_string(), "files".to_string()]);
    }

    #[test]
    fn test_failed_first_save_leaves_no_store() {
        let (storage, temp) = create_test_storage();
        let mut bad = Snapshot::encode(&populated_memory()).unwrap();
        bad.connects += 1;

        assert!(storage.save_snapshot(&bad).is_err());
        assert_eq!(dir_entries(&temp), vec!["files".to_string()]);
        assert_eq!(storage.load().unwrap(), Memory::new());
    }
}
