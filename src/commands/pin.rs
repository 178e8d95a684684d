use super::{banner, report_write, Workspace};
use anyhow::Result;

/// `update-stable-channel-gems`
pub fn run() -> Result<()> {
    let workspace = Workspace::load()?;
    let manifest = &workspace.config.stable_channel.manifest;

    banner(&manifest.display().to_string());

    if workspace.config.stable_channel.pins.is_empty() {
        println!("No stable channel pins configured.");
        return Ok(());
    }

    let outcome = workspace.orchestrator().pin_stable_channel()?;
    report_write(manifest, &outcome);
    Ok(())
}
