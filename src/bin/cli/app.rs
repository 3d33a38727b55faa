use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use recall_lib::config::Config;
use recall_lib::memory::{Memory, MemoryStorage};
use recall_lib::review::{IntervalTable, SessionLimits};

use crate::player::Player;

/// Shared application state for CLI commands
pub struct App {
    pub config: Config,
    pub storage: Arc<MemoryStorage>,
    pub memory: Memory,
    pub table: IntervalTable,
}

impl App {
    /// Load configuration and the store from `data_dir` (or the default location)
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => Config::default_data_dir().context("Failed to get data directory")?,
        };

        let config = Config::load(&data_dir)
            .with_context(|| format!("Failed to load configuration from {}", data_dir.display()))?;
        let table = config
            .intervals
            .table()
            .context("Failed to build interval table")?;

        let storage = MemoryStorage::new(config.data_dir.clone());
        storage.init().context("Failed to initialize storage")?;
        let memory = storage.load().context("Failed to load memory")?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            memory,
            table,
        })
    }

    /// Persist the memory, blocking until the store is verified on disk
    pub fn save(&self) -> Result<()> {
        self.storage.save(&self.memory).context("Failed to save memory")
    }

    pub fn limits(&self) -> SessionLimits {
        SessionLimits::from(&self.config.session)
    }

    pub fn player(&self) -> Player {
        Player::new(&self.config.player, self.storage.files_dir())
    }
}
