use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use recall_lib::config::PlayerConfig;

/// Something that can play an audio file stored under `files/`
pub trait Playback {
    fn play(&mut self, file: &str) -> Result<()>;
}

/// Plays clips by running an external player to completion
pub struct Player {
    command: String,
    args: Vec<String>,
    files_dir: PathBuf,
}

impl Player {
    pub fn new(config: &PlayerConfig, files_dir: PathBuf) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            files_dir,
        }
    }

    /// Stored names are relative to `files/`; absolute ones are used as is
    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.files_dir.join(path)
        }
    }
}

impl Playback for Player {
    fn play(&mut self, file: &str) -> Result<()> {
        let path = self.resolve(file);
        log::debug!("Playing {:?} with {}", path, self.command);
        let status = Command::new(&self.command)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run player '{}'", self.command))?;
        if !status.success() {
            bail!("Player '{}' exited with {} for {}", self.command, status, path.display());
        }
        Ok(())
    }
}
