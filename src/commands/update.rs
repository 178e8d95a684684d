use super::Workspace;
use anyhow::Result;

/// `update` / `force-update`: hand over to the repository's update script
pub fn run(force: bool) -> Result<()> {
    let workspace = Workspace::load()?;
    let orchestrator = workspace.orchestrator();
    let script = workspace.root.join(&workspace.config.update_script);

    if !script.exists() {
        anyhow::bail!(
            "Update script not found: {}\n\n\
            Hint: set update_script in relock.toml, or run `relock update-ci`\n\
            to update everything without a script.",
            script.display()
        );
    }

    if force {
        println!("Removing cached Bundler settings...");
        orchestrator.force_update()?;
    } else {
        orchestrator.run_update_script()?;
    }

    println!();
    println!("✓ Dependencies updated");
    Ok(())
}
