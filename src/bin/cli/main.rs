mod app;
mod commands;
mod player;
mod render;
mod session;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use recall_lib::memory::ConceptKind;

#[derive(Parser)]
#[command(
    name = "recall",
    about = "Spaced-repetition trainer for audio, word and sentence cards",
    version
)]
struct Cli {
    /// Train with at most this many cards (`recall 50` is `recall train 50`)
    max: Option<usize>,

    /// Store directory (default: platform data dir / recall)
    #[arg(long, global = true, env = "RECALL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// What an imported clip holds
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CardKind {
    #[value(alias = "w")]
    Word,
    #[value(alias = "s")]
    Sentence,
}

impl From<CardKind> for ConceptKind {
    fn from(kind: CardKind) -> Self {
        match kind {
            CardKind::Word => ConceptKind::Word,
            CardKind::Sentence => ConceptKind::Sentence,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Review everything that is due (the default)
    Train {
        /// Maximum number of cards this session (default from config)
        max: Option<usize>,
    },

    /// Import audio files as new word or sentence cards
    Add {
        /// Card type
        kind: CardKind,
        /// Audio files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Type in the text of imported clips
    Complete,

    /// Reviews recorded per day
    History,

    /// List due cards in session order
    Due {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Store summary
    Stats,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();

    let mut app = app::App::new(cli.data_dir)?;

    match cli.command.unwrap_or(Command::Train { max: cli.max }) {
        Command::Train { max } => {
            commands::train::run(&mut app, max, &cli.format, use_color)?;
        }
        Command::Add { kind, files } => {
            commands::add::run(&mut app, kind.into(), &files, &cli.format, use_color)?;
        }
        Command::Complete => {
            commands::complete::run(&mut app, &cli.format, use_color)?;
        }
        Command::History => {
            commands::history::run(&app, &cli.format, use_color)?;
        }
        Command::Due { limit } => {
            commands::due::run(&app, limit, &cli.format, use_color)?;
        }
        Command::Stats => {
            commands::stats::run(&app, &cli.format, use_color)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("recall").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_bare_number_trains_with_max() {
        let cli = parse(&["50"]);
        assert_eq!(cli.max, Some(50));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_subcommands_still_parse() {
        assert!(matches!(parse(&["train", "20"]).command, Some(Command::Train { max: Some(20) })));
        assert!(matches!(parse(&["add", "w", "a.mp3"]).command, Some(Command::Add { kind: CardKind::Word, .. })));
        assert!(matches!(parse(&[]).command, None));
    }
}
