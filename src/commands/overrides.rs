use super::{banner, report_write, Workspace};
use anyhow::Result;

/// `update-omnibus-overrides`
pub fn run() -> Result<()> {
    let workspace = Workspace::load()?;
    let overrides = &workspace.config.overrides;

    banner(&overrides.path.display().to_string());
    for latest in &overrides.latest {
        println!("  Looking up latest version of {} ...", latest.package);
    }

    let outcome = workspace.orchestrator().update_overrides()?;
    report_write(&overrides.path, &outcome);
    Ok(())
}
