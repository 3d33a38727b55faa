use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use recall_lib::import::{import_audio, ImportError, ImportOutcome};
use recall_lib::memory::ConceptKind;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(
    app: &mut App,
    kind: ConceptKind,
    files: &[PathBuf],
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let files_dir = app.storage.files_dir();
    if let OutputFormat::Plain = format {
        println!("files directory: {}", files_dir.display());
    }

    let mut results = Vec::new();
    for file in files {
        match import_audio(&mut app.memory, &files_dir, file, kind, Utc::now()) {
            Ok(outcome) => results.push((file, outcome)),
            // Unreadable files are skipped, like the rest of the batch
            Err(ImportError::Io(e)) => {
                log::warn!("Cannot read {}: {}", file.display(), e);
                if let OutputFormat::Plain = format {
                    println!("{} {}: {}", paint("error", Color::RED, use_color), file.display(), e);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    app.save()?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "results": results.iter().map(|(file, outcome)| serde_json::json!({
                    "path": file.to_string_lossy(),
                    "outcome": outcome,
                })).collect::<Vec<_>>(),
                "concepts": app.memory.concept_count(),
                "connects": app.memory.connect_count(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (file, outcome) in &results {
                match outcome {
                    ImportOutcome::Added { transcript, .. } => println!(
                        "{} {} as {} {}",
                        paint("add", Color::GREEN, use_color),
                        file.display(),
                        kind.name(),
                        transcript.replace('\t', " "),
                    ),
                    ImportOutcome::Skipped { .. } => {
                        println!("{} {}", paint("skip", Color::GRAY, use_color), file.display())
                    }
                }
            }
            println!(
                "{} concepts, {} connects",
                app.memory.concept_count(),
                app.memory.connect_count()
            );
        }
    }

    Ok(())
}
