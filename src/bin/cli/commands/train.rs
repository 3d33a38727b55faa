use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use recall_lib::memory::BackgroundSaver;
use recall_lib::review::plan_session;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::session::{Session, SessionSummary};
use crate::OutputFormat;

pub fn run(app: &mut App, max: Option<usize>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let mut limits = app.limits();
    if let Some(max) = max {
        limits.max_items = max;
    }

    let now = Utc::now();
    let keys = plan_session(&app.memory, &app.table, now, &limits, &mut rand::thread_rng())
        .context("Failed to plan session")?;
    if keys.is_empty() {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&SessionSummary::default())?),
            OutputFormat::Plain => println!("Nothing due."),
        }
        return Ok(());
    }
    log::info!("Session of {} connects", keys.len());

    let deadline = limits.budget.map(|budget| now + budget);
    let saver = BackgroundSaver::spawn(Arc::clone(&app.storage)).context("Failed to start saver")?;
    let mut player = app.player();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let summary = Session::new(&mut app.memory, &saver, &mut player, stdin.lock(), stdout.lock(), use_color)
        .run(&keys, deadline);
    // Join pending saves even when the session itself failed
    let saved = saver.finish().context("Failed to save progress")?;
    let summary = summary?;
    log::debug!("{} saves written", saved);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Plain => {
            println!();
            println!(
                "{} of {} reviewed: {} up, {} reset",
                summary.presented,
                summary.planned,
                paint(&summary.leveled_up.to_string(), Color::GREEN, use_color),
                paint(&summary.reset.to_string(), Color::RED, use_color),
            );
            if summary.out_of_time {
                println!("Stopped at the time budget.");
            }
        }
    }

    Ok(())
}
