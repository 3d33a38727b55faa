use anyhow::Result;
use chrono::Utc;

use recall_lib::review::stats::summarize;
use recall_lib::review::LevelBucket;

use crate::app::App;
use crate::render::terminal::{bucket_color, bucket_name, paint};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stats = summarize(&app.memory, &app.table, Utc::now())?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Plain => {
            println!(
                "Concepts: {} audio, {} words, {} sentences ({} awaiting text)",
                stats.audio_concepts, stats.word_concepts, stats.sentence_concepts, stats.incomplete_concepts
            );
            println!("Connects: {}", stats.total_connects);
            for (bucket, count) in [
                (LevelBucket::New, stats.new_connects),
                (LevelBucket::LowReview, stats.low_review_connects),
                (LevelBucket::HighReview, stats.high_review_connects),
            ] {
                let label = format!("{:<9}", bucket_name(bucket));
                println!("  {} {}", paint(&label, bucket_color(bucket), use_color), count);
            }
            println!("Due now: {}", stats.due_connects);
            println!("Reviews recorded: {}", stats.checkpoints);
        }
    }

    Ok(())
}
