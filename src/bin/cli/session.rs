//! Line-oriented review session
//!
//! Each connect moves through Prompt → AwaitResponse ⇄ Replay → Commit.
//! Commit records the outcome and queues a background save before the next
//! connect is prompted.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use recall_lib::memory::{BackgroundSaver, Concept, ConceptKind, Memory, Outcome};

use crate::player::Playback;
use crate::render::terminal::{concept_label, history_lines, paint, Color};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prompt,
    AwaitResponse { revealed: bool },
    Replay { revealed: bool },
    Commit(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Response {
    Reveal,
    LevelUp,
    Reset,
    Replay,
    Quit,
}

impl Response {
    fn parse(line: &str) -> Option<Self> {
        if line == " " {
            return Some(Self::Replay);
        }
        match line.trim().to_lowercase().as_str() {
            "" | "a" => Some(Self::Reveal),
            "g" => Some(Self::LevelUp),
            "t" => Some(Self::Reset),
            "r" => Some(Self::Replay),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Tally of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub planned: usize,
    pub presented: usize,
    pub leveled_up: usize,
    pub reset: usize,
    pub out_of_time: bool,
}

pub struct Session<'a, P, R, W> {
    memory: &'a mut Memory,
    saver: &'a BackgroundSaver,
    player: &'a mut P,
    input: R,
    output: W,
    use_color: bool,
}

impl<'a, P: Playback, R: BufRead, W: Write> Session<'a, P, R, W> {
    pub fn new(
        memory: &'a mut Memory,
        saver: &'a BackgroundSaver,
        player: &'a mut P,
        input: R,
        output: W,
        use_color: bool,
    ) -> Self {
        Self {
            memory,
            saver,
            player,
            input,
            output,
            use_color,
        }
    }

    /// Review `keys` in order until done, quit, or past `deadline`
    pub fn run(&mut self, keys: &[String], deadline: Option<DateTime<Utc>>) -> Result<SessionSummary> {
        let mut summary = SessionSummary {
            planned: keys.len(),
            ..Default::default()
        };

        for (i, key) in keys.iter().enumerate() {
            // Stop once a queued save has failed
            self.saver.check().context("A previous save failed")?;
            if deadline.map_or(false, |d| Utc::now() >= d) {
                writeln!(self.output, "{}", paint("Time budget reached", Color::YELLOW, self.use_color))?;
                summary.out_of_time = true;
                break;
            }

            writeln!(
                self.output,
                "\n{}",
                paint(&format!("[{}/{}]", i + 1, keys.len()), Color::BOLD, self.use_color)
            )?;
            summary.presented += 1;
            match self.review(key)? {
                Some(Outcome::LevelUp) => summary.leveled_up += 1,
                Some(Outcome::Reset) => summary.reset += 1,
                None => {
                    summary.presented -= 1;
                    break;
                }
            }
        }
        Ok(summary)
    }

    /// Drive one connect through the state machine; `None` means quit
    fn review(&mut self, key: &str) -> Result<Option<Outcome>> {
        let connect = self.memory.connect(key)?.clone();
        let (from, to) = self.memory.endpoints(&connect)?;
        let (from, to) = (from.clone(), to.clone());

        let mut state = State::Prompt;
        loop {
            state = match state {
                State::Prompt => {
                    for line in history_lines(&connect, Utc::now(), self.use_color) {
                        writeln!(self.output, "{}", line)?;
                    }
                    self.present(&from)?;
                    State::AwaitResponse { revealed: false }
                }
                State::AwaitResponse { revealed } => {
                    let hint = if revealed {
                        "g: level up  t: reset  r: replay  q: quit"
                    } else {
                        "enter: answer  g: level up  t: reset  r: replay  q: quit"
                    };
                    write!(self.output, "{} > ", paint(hint, Color::DIM, self.use_color))?;
                    self.output.flush()?;

                    match self.read_response()? {
                        None | Some(Response::Quit) => return Ok(None),
                        Some(Response::LevelUp) => State::Commit(Outcome::LevelUp),
                        Some(Response::Reset) => State::Commit(Outcome::Reset),
                        Some(Response::Replay) => State::Replay { revealed },
                        Some(Response::Reveal) => {
                            if !revealed {
                                self.present(&to)?;
                            }
                            State::AwaitResponse { revealed: true }
                        }
                    }
                }
                State::Replay { revealed } => {
                    let audio = if from.kind == ConceptKind::Audio { &from } else { &to };
                    self.present(audio)?;
                    State::AwaitResponse { revealed }
                }
                State::Commit(outcome) => {
                    let checkpoint = self.memory.record_outcome(key, outcome, Utc::now())?;
                    self.saver.submit(&*self.memory).context("Failed to queue save")?;
                    let color = match outcome {
                        Outcome::LevelUp => Color::GREEN,
                        Outcome::Reset => Color::RED,
                    };
                    writeln!(
                        self.output,
                        "{}",
                        paint(&format!("level {}", checkpoint.level), color, self.use_color)
                    )?;
                    return Ok(Some(outcome));
                }
            };
        }
    }

    /// Play an audio concept, print a textual one
    fn present(&mut self, concept: &Concept) -> Result<()> {
        match concept.kind {
            ConceptKind::Audio => {
                writeln!(self.output, "{}", paint("playing...", Color::GRAY, self.use_color))?;
                self.output.flush()?;
                if let Err(e) = self.player.play(&concept.file) {
                    log::warn!("Playback failed: {:#}", e);
                    writeln!(self.output, "{}", paint(&format!("playback failed: {}", e), Color::RED, self.use_color))?;
                }
            }
            ConceptKind::Word | ConceptKind::Sentence => {
                writeln!(self.output, "{}", paint(&concept_label(concept), Color::BOLD, self.use_color))?;
            }
        }
        Ok(())
    }

    /// Next recognised response; `None` at end of input
    fn read_response(&mut self) -> Result<Option<Response>> {
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match Response::parse(line.trim_end_matches(['\r', '\n'])) {
                Some(response) => return Ok(Some(response)),
                None => {
                    write!(self.output, "? > ")?;
                    self.output.flush()?;
                }
            }
        }
    }
}
