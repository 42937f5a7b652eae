//! Upload records read from a JSON-lines stream
//!
//! Each non-empty line is one record. Records are handed to the uploader as
//! they are read; end of input closes the stream and waits for delivery.
//! SIGINT or SIGTERM, at any point, stops the worker after its current record.

use colored::*;
use eyre::{Context, Result, eyre};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::config::Config;
use crate::delivery::WorkerSummary;
use crate::record::Record;
use crate::uploader::{RecordSender, StopHandle, Uploader};

/// First thing to happen while reading input
enum Event {
    InputDone(Result<()>),
    Signal(&'static str),
}

pub fn run(input: Option<&Path>, dry_run: bool, config: &Config) -> Result<()> {
    let mut destination = config.destination.clone();
    if dry_run {
        destination.skip_upload = true;
    }

    let uploader = Uploader::start(&destination).context("Uploader not started")?;

    if destination.skip_upload {
        println!("{} Dry run: records will not be sent", "→".blue());
    } else {
        println!("{} Uploading to {}", "→".blue(), destination.server_url.cyan());
    }

    let reader = super::open_input(input)?;
    let (events, received) = mpsc::channel();
    spawn_signal_listener(events.clone(), uploader.stop_handle())?;

    let sender = uploader.sender();
    let invalid = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invalid);
    // Detached: after a signal it may stay blocked on stdin until exit
    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            let _ = events.send(Event::InputDone(submit_lines(reader, &sender, &counter)));
        })
        .context("Failed to spawn input reader")?;

    match received.recv() {
        Ok(Event::InputDone(result)) => {
            result?;
            log::debug!("Input exhausted, {} records still queued", uploader.pending());
        }
        Ok(Event::Signal(signal)) => {
            eprintln!("{} Interrupted by {}, {} queued records abandoned", "⚠".yellow(), signal, uploader.pending());
        }
        Err(_) => return Err(eyre!("Input reader exited without reporting")),
    }

    let summary = uploader.finish().context("Delivery worker failed")?;
    print_summary(&summary, invalid.load(Ordering::SeqCst));

    Ok(())
}

/// Stop the worker on the first SIGINT or SIGTERM, and report it
fn spawn_signal_listener(events: Sender<Event>, stop: StopHandle) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || match rt.block_on(shutdown_signal()) {
            Ok(signal) => {
                log::info!("Received {}, stopping after the current record", signal);
                stop.stop();
                let _ = events.send(Event::Signal(signal));
            }
            Err(e) => log::warn!("Signal handling unavailable: {:#}", e),
        })
        .context("Failed to spawn signal listener")?;

    Ok(())
}

fn submit_lines(reader: Box<dyn BufRead + Send>, sender: &RecordSender, invalid: &AtomicUsize) -> Result<()> {
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        match Record::from_json(&line) {
            Ok(record) => sender.submit(record),
            Err(e) => {
                invalid.fetch_add(1, Ordering::SeqCst);
                log::warn!("Skipping input line {}: {}", index + 1, e);
                eprintln!("  {} line {}: {}", "⚠".yellow(), index + 1, e);
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await.context("Failed to set up Ctrl-C handler")?;
    Ok("Ctrl-C")
}

fn print_summary(summary: &WorkerSummary, invalid: usize) {
    println!();
    println!("{}", "Summary".bold());
    println!("  {:<16} {}", "processed:", summary.total());
    println!("  {:<16} {}", "delivered:", summary.delivered.to_string().green());
    println!("  {:<16} {}", "skipped:", summary.skipped);
    println!("  {:<16} {}", "stale:", summary.stale);
    println!("  {:<16} {}", "backlog dropped:", summary.backlog_dropped);

    let failed = [
        ("rejected:", summary.rejected),
        ("abandoned:", summary.abandoned),
        ("unbuildable:", summary.unbuildable),
        ("invalid input:", invalid),
    ];
    for (label, count) in failed {
        if count > 0 {
            println!("  {:<16} {}", label, count.to_string().red());
        } else {
            println!("  {:<16} {}", label, count);
        }
    }
}
