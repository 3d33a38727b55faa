use anyhow::Result;
use chrono::Local;

use recall_lib::review::stats::daily_checkpoints;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, _use_color: bool) -> Result<()> {
    let counts = daily_checkpoints(&app.memory, &Local);

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = counts
                .iter()
                .map(|(day, count)| serde_json::json!({ "date": day.to_string(), "count": count }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (day, count) in &counts {
                println!("{} {}", day.format("%Y-%m-%d"), count);
            }
        }
    }

    Ok(())
}
