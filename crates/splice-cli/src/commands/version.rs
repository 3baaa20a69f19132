use miette::Result;
use splice_core::version::{version_string, VERSION};

pub fn run(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "ok": true, "version": VERSION }));
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
