use anyhow::Result;
use chrono::Utc;

use recall_lib::memory::ConceptKind;
use recall_lib::review::priority::{lesson_number, LevelBucket};
use recall_lib::review::stats::format_elapsed;
use recall_lib::review::{next_due, plan_session};

use crate::app::App;
use crate::render::terminal::{bucket_color, bucket_name, concept_label, paint, Color};
use crate::OutputFormat;

/// Print what the next session would present, in order
pub fn run(app: &App, limit: Option<usize>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let now = Utc::now();
    let mut limits = app.limits();
    limits.max_items = limit.unwrap_or(usize::MAX);
    let keys = plan_session(&app.memory, &app.table, now, &limits, &mut rand::thread_rng())?;

    let mut rows = Vec::new();
    for key in &keys {
        let connect = app.memory.connect(key)?;
        let (from, to) = app.memory.endpoints(connect)?;
        let lesson = [from, to]
            .into_iter()
            .find(|c| c.kind == ConceptKind::Audio)
            .and_then(|audio| lesson_number(&audio.file));
        rows.push((connect, from, to, lesson));
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = rows
                .iter()
                .map(|(connect, from, to, lesson)| {
                    serde_json::json!({
                        "from": connect.from,
                        "to": connect.to,
                        "fromKind": from.kind,
                        "toKind": to.kind,
                        "level": connect.level(),
                        "lesson": lesson,
                        "lastReview": connect.last_checkpoint().map(|c| c.time),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if rows.is_empty() {
                let upcoming = app
                    .memory
                    .connects()
                    .filter(|c| {
                        app.memory
                            .concept(&c.from)
                            .map(|from| from.is_usable_prompt())
                            .unwrap_or(false)
                    })
                    .filter_map(|c| next_due(c, &app.table).ok())
                    .min();
                match upcoming {
                    Some(at) => println!("Nothing due. Next review in {}", format_elapsed(at - now)),
                    None => println!("Nothing due."),
                }
                return Ok(());
            }

            for (i, (connect, from, to, lesson)) in rows.iter().enumerate() {
                let bucket = LevelBucket::of(connect.level());
                let tag = format!("{:<8}", bucket_name(bucket));
                let lesson = lesson.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>4}. {} L{:<2} {} {} {} {}",
                    i + 1,
                    paint(&tag, bucket_color(bucket), use_color),
                    connect.level(),
                    paint(&format!("lesson {:<4}", lesson), Color::GRAY, use_color),
                    concept_label(from),
                    paint("->", Color::DIM, use_color),
                    concept_label(to),
                );
            }
        }
    }

    Ok(())
}
