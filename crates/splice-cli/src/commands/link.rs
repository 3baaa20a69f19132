//! `splice link` command implementation.
//!
//! Links every workspace project (or a `--project` subset) against the
//! shared dependency store.

use miette::Result;
use splice_core::link::{link_projects, link_workspace, LinkOutcome};
use splice_core::WorkspaceProject;
use std::path::Path;

pub fn run(cwd: &Path, force: bool, only: &[String], json: bool) -> Result<()> {
    let ws = super::load_workspace_or_exit(cwd, json);

    if force {
        // Accepted for muscle-memory compatibility; linking always purges
        // and rebuilds, so there is nothing extra to do.
        tracing::debug!("--force has no effect: linking always rebuilds");
    }

    let result = if only.is_empty() {
        link_workspace(&ws)
    } else {
        let mut selected: Vec<&WorkspaceProject> = Vec::new();
        for name in only {
            match ws.project_by_name(name) {
                Some(p) => selected.push(p),
                None => super::fail_usage(
                    json,
                    "UNKNOWN_PROJECT",
                    &format!("'{name}' is not a workspace project"),
                ),
            }
        }
        link_projects(&ws, &selected)
    };

    let outcome = match result {
        Ok(o) => o,
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "LINK_FAILED", "message": e.to_string() }
                    })
                );
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    };

    if json {
        print_json(&outcome);
    } else {
        print_text(&outcome);
    }

    if outcome.failures.is_empty() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn print_json(outcome: &LinkOutcome) {
    let projects: Vec<_> = outcome
        .reports
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.project,
                "linked": r.linked,
                "localLinks": r.local_links,
                "warnings": r.warnings.iter().map(|w| w.message.clone()).collect::<Vec<_>>()
            })
        })
        .collect();
    let failed: Vec<_> = outcome
        .failures
        .iter()
        .map(|(name, e)| {
            serde_json::json!({ "name": name, "error": e.to_string() })
        })
        .collect();

    println!(
        "{}",
        serde_json::json!({
            "ok": outcome.failures.is_empty(),
            "projects": projects,
            "failed": failed,
            "manifest": outcome.manifest_path.as_ref().map(|p| p.to_string_lossy().into_owned())
        })
    );
}

fn print_text(outcome: &LinkOutcome) {
    for issue in &outcome.issues {
        eprintln!(
            "warning: skipped store folder {}: {}",
            issue.path.display(),
            issue.message
        );
    }

    for report in &outcome.reports {
        for warning in &report.warnings {
            eprintln!("warning: {}", warning.message);
        }
        if report.local_links.is_empty() {
            println!("  {} ({} linked)", report.project, report.linked);
        } else {
            println!(
                "  {} ({} linked, local: {})",
                report.project,
                report.linked,
                report.local_links.join(", ")
            );
        }
    }

    for (name, error) in &outcome.failures {
        eprintln!("error: {name}: {error}");
    }

    if outcome.failures.is_empty() {
        println!("Linked {} project(s).", outcome.reports.len());
    } else {
        eprintln!(
            "Linked {} project(s), {} failed.",
            outcome.reports.len(),
            outcome.failures.len()
        );
    }
}
