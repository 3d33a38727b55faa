use std::io::{self, BufRead, Write};

use anyhow::Result;

use recall_lib::import::pending_transcriptions;

use crate::app::App;
use crate::player::Playback;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Play each untranscribed clip and store the text typed for it.
///
/// An empty line skips the clip; end of input stops.
pub fn run(app: &mut App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let pending = pending_transcriptions(&app.memory)?;
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }
    if pending.is_empty() {
        println!("Every word and sentence has its text.");
        return Ok(());
    }

    let mut player = app.player();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut completed = 0;

    for (i, item) in pending.iter().enumerate() {
        println!(
            "{} {} {}",
            paint(&format!("[{}/{}]", i + 1, pending.len()), Color::BOLD, use_color),
            item.kind.name(),
            item.audio_file
        );
        if let Err(e) = player.play(&item.audio_file) {
            log::warn!("Playback failed: {:#}", e);
        }
        print!("{} ", paint("text >", Color::DIM, use_color));
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        app.memory.complete_concept(&item.concept, text)?;
        app.save()?;
        completed += 1;
    }

    println!("{} of {} completed", completed, pending.len());
    Ok(())
}
