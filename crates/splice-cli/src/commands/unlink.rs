//! `splice unlink` command implementation.

use miette::Result;
use splice_core::link::unlink_workspace;
use std::path::Path;

pub fn run(cwd: &Path, json: bool) -> Result<()> {
    let ws = super::load_workspace_or_exit(cwd, json);

    match unlink_workspace(&ws) {
        Ok(removed) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "ok": true, "removed": removed })
                );
            } else if removed.is_empty() {
                println!("Nothing to unlink.");
            } else {
                println!("Unlinked {} project(s):", removed.len());
                for name in &removed {
                    println!("  - {name}");
                }
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "UNLINK_FAILED", "message": e.to_string() }
                    })
                );
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}
