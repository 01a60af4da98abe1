//! `orcha validate`: parse and validate a specification file.

use std::path::Path;

use anyhow::{Result, anyhow};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use orcha_core::workflow::definition::{SpecError, count_jobs, load_specification_file};
use orcha_types::orchestration::{OrchestrationSpecification, TimeoutAction};

pub fn handle_validate(file: &Path, json: bool) -> Result<()> {
    let spec = match load_specification_file(file) {
        Ok(spec) => spec,
        Err(SpecError::Validation(problems)) => {
            if json {
                let out = serde_json::json!({ "valid": false, "errors": problems });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!();
                println!(
                    "  {} {} is invalid:",
                    style("x").red().bold(),
                    style(file.display()).cyan()
                );
                for problem in &problems {
                    println!("    - {problem}");
                }
                println!();
            }
            return Err(anyhow!("Specification validation failed ({} problem(s))", problems.len()));
        }
        Err(e) => return Err(anyhow!("Failed to load specification {}: {e}", file.display())),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&spec))?);
        return Ok(());
    }

    println!();
    println!(
        "  {} '{}' is valid (schema {})",
        style("*").green().bold(),
        style(&spec.name).cyan(),
        spec.schema_version
    );
    println!();

    if spec.stages.is_empty() {
        println!("  No stages defined.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Stage").fg(Color::Cyan),
            Cell::new("Jobs"),
            Cell::new("Timeout"),
            Cell::new("On error"),
            Cell::new("Waits for"),
        ]);

    for stage in &spec.stages {
        let on_error = if stage.continue_on_error {
            Cell::new("continue").fg(Color::Yellow)
        } else {
            Cell::new("fail")
        };
        let gate = match &stage.wait_for_event {
            Some(gate) => {
                let action = match gate.timeout_action {
                    TimeoutAction::ContinueOrchestration => "continue",
                    TimeoutAction::Fail => "fail",
                };
                format!("{} ({}h, then {action})", gate.event_name, gate.timeout_hours)
            }
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&stage.name),
            Cell::new(count_jobs(&stage.jobs)),
            Cell::new(format!("{}m", stage.timeout_minutes)),
            on_error,
            Cell::new(gate),
        ]);
    }

    println!("{table}");
    println!();
    Ok(())
}

fn summary_json(spec: &OrchestrationSpecification) -> serde_json::Value {
    let stages: Vec<_> = spec
        .stages
        .iter()
        .map(|stage| {
            serde_json::json!({
                "name": stage.name,
                "jobs": count_jobs(&stage.jobs),
                "timeoutMinutes": stage.timeout_minutes,
                "continueOnError": stage.continue_on_error,
                "waitForEvent": stage.wait_for_event,
            })
        })
        .collect();
    serde_json::json!({
        "valid": true,
        "name": spec.name,
        "schemaVersion": spec.schema_version,
        "stages": stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orcha_types::orchestration::{Job, Stage};

    #[test]
    fn test_summary_counts_nested_jobs() {
        let mut parent = Job::leaf("Parent", "Skip");
        parent.jobs = Some(vec![Job::leaf("A", "Skip"), Job::leaf("B", "Skip")]);
        let spec = OrchestrationSpecification {
            schema_version: "1.0".to_string(),
            instance_id_prefix: None,
            name: "demo".to_string(),
            description: String::new(),
            meta: None,
            stages: vec![Stage {
                name: "one".to_string(),
                description: String::new(),
                state: "Running".to_string(),
                continue_on_error: true,
                timeout_minutes: 5,
                jobs: vec![parent],
                wait_for_event: None,
            }],
        };

        let summary = summary_json(&spec);
        assert_eq!(summary["valid"], true);
        assert_eq!(summary["stages"][0]["jobs"], 3);
        assert_eq!(summary["stages"][0]["continueOnError"], true);
        assert!(summary["stages"][0]["waitForEvent"].is_null());
    }
}
