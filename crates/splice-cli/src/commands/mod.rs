pub mod link;
pub mod list;
pub mod unlink;
pub mod version;

use splice_core::{find_workspace_root, Workspace};
use std::path::Path;

/// Locate and load the workspace, exiting with a usage error when the cwd is
/// not inside one or the configuration is broken.
pub fn load_workspace_or_exit(cwd: &Path, json: bool) -> Workspace {
    let Some(root) = find_workspace_root(cwd) else {
        fail_usage(
            json,
            "NO_WORKSPACE",
            &format!(
                "no splice.json found in {} or any ancestor",
                cwd.display()
            ),
        );
    };

    match Workspace::load(&root) {
        Ok(ws) => ws,
        Err(e) => fail_usage(json, "WORKSPACE_INVALID", &e.to_string()),
    }
}

/// Report a configuration/usage error and exit with code 2.
pub fn fail_usage(json: bool, code: &str, message: &str) -> ! {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": false,
                "error": { "code": code, "message": message }
            })
        );
    } else {
        eprintln!("error: {message}");
    }
    std::process::exit(2);
}
