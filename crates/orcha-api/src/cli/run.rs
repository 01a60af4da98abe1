//! `orcha run`: execute a specification on an in-process engine and follow it
//! to completion.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use tokio::sync::broadcast::error::RecvError;

use orcha_core::workflow::definition::load_specification_file;
use orcha_infra::host::OrchestrationHost;
use orcha_types::event::RunEvent;
use orcha_types::orchestration::EventResponse;
use orcha_types::run::{RunRecord, RuntimeStatus};

pub async fn handle_run(
    host: &OrchestrationHost,
    file: &Path,
    events: &[(String, EventResponse)],
    json: bool,
    quiet: bool,
) -> Result<()> {
    let spec = load_specification_file(file)
        .with_context(|| format!("Failed to load specification {}", file.display()))?;

    // Subscribe before starting so no status change is missed.
    let mut updates = host.subscribe();
    let instance_id = host.start_run(&spec)?;
    let show_progress = !json && !quiet;

    if show_progress {
        println!();
        println!(
            "  {} Running '{}' ({} stage(s))",
            style("*").green().bold(),
            style(&spec.name).cyan(),
            spec.stages.len()
        );
        println!("  Run ID: {}", instance_id);
        println!();
    }

    for (name, response) in events {
        host.send_event(&instance_id, name, *response)?;
        tracing::debug!(instance_id = instance_id.as_str(), event = name.as_str(), %response, "event queued");
    }

    let child_prefix = format!("{instance_id}-");
    loop {
        match updates.recv().await {
            Ok(RunEvent::CustomStatusChanged { instance_id: id, status }) if show_progress => {
                if id == instance_id {
                    println!("  {} {}", style("-").dim(), status);
                } else if id.starts_with(&child_prefix) {
                    println!("    {} {}", style("-").dim(), style(status).dim());
                }
            }
            Ok(event) if event.is_terminal() && event.instance_id() == instance_id => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "status stream lagged, some updates were not shown");
            }
            Err(RecvError::Closed) => break,
        }
    }

    let record = host.wait_for_completion(&instance_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if !quiet {
        print_summary(&record);
    }

    if record.runtime_status == RuntimeStatus::Failed {
        bail!(
            "Run {} failed: {}",
            record.instance_id,
            record.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_summary(record: &RunRecord) {
    let status = match record.runtime_status {
        RuntimeStatus::Completed => style(record.runtime_status.to_string()).green(),
        RuntimeStatus::Failed => style(record.runtime_status.to_string()).red(),
        _ => style(record.runtime_status.to_string()).yellow(),
    };
    let elapsed = record.last_updated_at - record.created_at;

    println!();
    println!("  Status: {status}");
    if let Some(custom) = &record.custom_status {
        println!("  Custom status: {custom}");
    }
    if let Some(output) = &record.output {
        println!("  Output: {output}");
    }
    if let Some(error) = &record.error {
        println!("  Error: {}", style(error).red());
    }
    println!("  Duration: {}ms", elapsed.num_milliseconds());
    println!();
}
