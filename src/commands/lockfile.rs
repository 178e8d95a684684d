use super::{banner, Workspace};
use anyhow::Result;
use relock::Step;

/// `update-gemfile-lock`: the repository's own Gemfile.lock
pub fn run_primary() -> Result<()> {
    let workspace = Workspace::load()?;
    let orchestrator = workspace.orchestrator();

    let reports = orchestrator.run(&[Step::PrimaryLockfile], |step| {
        banner(&orchestrator.describe(step))
    })?;

    println!();
    println!("✓ Updated {} lockfile", reports.len());
    Ok(())
}

/// `update-project <dir>`: one registered sub-project
pub fn run_project(directory: &str) -> Result<()> {
    let workspace = Workspace::load()?;

    let project = workspace.config.find_project(directory).ok_or_else(|| {
        let registered: Vec<String> = workspace
            .config
            .project_specs()
            .iter()
            .map(|p| p.directory.display().to_string())
            .collect();
        anyhow::anyhow!(
            "Project '{}' is not registered in relock.toml\n\n\
            Registered projects: {}",
            directory,
            if registered.is_empty() {
                "(none)".to_string()
            } else {
                registered.join(", ")
            }
        )
    })?;

    let orchestrator = workspace.orchestrator();
    orchestrator.run(&[Step::ProjectLockfile(project)], |step| {
        banner(&orchestrator.describe(step))
    })?;

    println!();
    println!("✓ Updated {}", directory);
    Ok(())
}

/// `update-projects`: every registered sub-project, in order
pub fn run_projects() -> Result<()> {
    let workspace = Workspace::load()?;
    let orchestrator = workspace.orchestrator();

    let plan = orchestrator.project_plan();
    if plan.is_empty() {
        println!("No projects registered in relock.toml.");
        return Ok(());
    }

    let reports = orchestrator.run(&plan, |step| banner(&orchestrator.describe(step)))?;

    println!();
    println!(
        "✓ Updated {} project lockfile{}",
        reports.len(),
        if reports.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
