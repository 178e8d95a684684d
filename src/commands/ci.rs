use super::{banner, outdated, report_write, Workspace};
use anyhow::Result;
use relock::{Step, StepOutcome};

/// `update-ci`: the whole pipeline, stopping at the first failure
pub fn run(report_outdated: bool) -> Result<()> {
    let workspace = Workspace::load()?;
    let orchestrator = workspace.orchestrator();

    let plan = orchestrator.update_ci_plan();
    let reports = orchestrator.run(&plan, |step| banner(&orchestrator.describe(step)))?;

    println!();
    let mut changed = 0;
    for report in &reports {
        if let StepOutcome::File(outcome) = &report.outcome {
            let path = match report.step {
                Step::PinStableChannel => &workspace.config.stable_channel.manifest,
                _ => &workspace.config.overrides.path,
            };
            report_write(path, outcome);
            if outcome.is_changed() {
                changed += 1;
            }
        }
    }

    println!();
    println!(
        "✓ Relocked {} lockfile{}, {} generated file{} changed",
        reports.len() - 2,
        if reports.len() - 2 == 1 { "" } else { "s" },
        changed,
        if changed == 1 { "" } else { "s" }
    );

    if report_outdated {
        banner("outdated gems");
        outdated::print_report(&orchestrator.outdated()?);
    }

    Ok(())
}
