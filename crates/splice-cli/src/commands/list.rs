//! `splice list` command implementation.

use miette::Result;
use std::path::Path;

pub fn run(cwd: &Path, json: bool) -> Result<()> {
    let ws = super::load_workspace_or_exit(cwd, json);

    let mut projects: Vec<_> = ws.projects().iter().collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let list: Vec<_> = projects
            .iter()
            .map(|p| {
                let mut cyclic: Vec<&String> = p.cyclic_dependencies.iter().collect();
                cyclic.sort();
                serde_json::json!({
                    "name": p.name,
                    "version": p.version.to_string(),
                    "folder": p.folder.to_string_lossy(),
                    "cyclicDependencies": cyclic
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "root": ws.root.to_string_lossy(),
                "store": ws.store_folder.to_string_lossy(),
                "projects": list
            })
        );
    } else {
        println!("Workspace root: {}", ws.root.display());
        println!("Store folder:   {}", ws.store_folder.display());
        println!();
        println!("Projects ({}):", projects.len());
        for p in &projects {
            println!("  {} @ {}", p.name, p.version);
            println!("    {}", p.folder.display());
        }
    }

    Ok(())
}
