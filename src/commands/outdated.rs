use super::Workspace;
use anyhow::Result;

pub fn run() -> Result<()> {
    let workspace = Workspace::load()?;

    println!("Checking for outdated gems...");
    println!();

    print_report(&workspace.orchestrator().outdated()?);
    Ok(())
}

pub fn print_report(report: &str) {
    let outdated: Vec<&str> = report
        .lines()
        .filter(|line| line.trim_start().starts_with('*'))
        .collect();

    if outdated.is_empty() {
        println!("✓ All gems are up to date");
        println!();
        return;
    }

    println!("Found {} outdated gems:", outdated.len());
    for line in &outdated {
        println!("  {}", line.trim());
    }
    println!();
}
