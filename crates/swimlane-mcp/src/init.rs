//! `swimlane-mcp init`: register the server for this project and seed the
//! lane settings so they can be edited before the first diagram is compiled.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use swimlane_core::{load_settings, settings_path, write_settings, Settings};

/// Name the server is registered under in `mcpServers`.
const SERVER_KEY: &str = "swimlane";

pub fn init_project() -> Result<(), Box<dyn std::error::Error>> {
    let binary_path = std::env::current_exe()?
        .canonicalize()?
        .to_string_lossy()
        .to_string();
    let cwd = std::env::current_dir()?;

    let config = register_in(&cwd.join(".mcp.json"), &binary_path)?;
    eprintln!("Wrote {}", config.display());

    let settings_file = settings_path();
    let (settings, created) = seed_settings(&settings_file)?;
    if created {
        eprintln!("Wrote default lanes to {}", settings_file.display());
    }
    eprintln!("\nLanes:");
    for lane in settings.lanes.ordered() {
        eprintln!("  {:<16} {}", lane.id, lane.name);
    }
    eprintln!("\nDone. MCP clients started in this directory will use swimlane.");
    Ok(())
}

/// Point `mcpServers.swimlane` at `binary_path`, keeping every other entry.
/// Anything that is not a JSON object is replaced.
fn register_server(root: &mut Value, binary_path: &str) {
    if !root.is_object() {
        *root = json!({});
    }
    if !root.get("mcpServers").is_some_and(Value::is_object) {
        root["mcpServers"] = json!({});
    }
    root["mcpServers"][SERVER_KEY] = json!({
        "type": "stdio",
        "command": binary_path,
        "args": [],
    });
}

fn register_in(path: &Path, binary_path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut root = match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or(Value::Null),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Null,
        Err(e) => return Err(e.into()),
    };
    register_server(&mut root, binary_path);
    std::fs::write(path, serde_json::to_string_pretty(&root)?)?;
    Ok(path.to_path_buf())
}

/// Load the settings file, writing defaults first when there is none.
/// An existing but broken file is reported, never overwritten.
fn seed_settings(path: &Path) -> Result<(Settings, bool), Box<dyn std::error::Error>> {
    if path.exists() {
        return Ok((load_settings(path)?, false));
    }
    let settings = Settings::default();
    write_settings(path, &settings)?;
    Ok((settings, true))
}
