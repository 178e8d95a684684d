//! Relocking a single project for all of its platforms

use crate::lock_state::with_unfrozen;
use crate::project::ProjectSpec;
use crate::resolver::{Resolver, ResolverOutput};
use crate::Result;
use std::sync::Arc;

/// Progress callback: (message, current step, total steps)
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Regenerates one project's lockfile through a [`Resolver`]
///
/// The sequence is a from-scratch `install` followed by one `lock` per platform,
/// all inside [`with_unfrozen`]. The first failing call ends the update; platforms
/// already merged into the lockfile stay merged.
pub struct LockUpdater<'a> {
    resolver: &'a dyn Resolver,
    progress: Option<ProgressCallback>,
}

impl<'a> LockUpdater<'a> {
    pub fn new(resolver: &'a dyn Resolver) -> Self {
        Self {
            resolver,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    fn report(&self, msg: &str, current: u64, total: u64) {
        if let Some(ref progress) = self.progress {
            progress(msg, current, total);
        }
    }

    pub fn update(&self, project: &ProjectSpec) -> Result<()> {
        let total = 1 + project.platforms.len() as u64;

        with_unfrozen(project, || {
            self.report("Installing from scratch", 0, total);
            let output = self.resolver.install(&project.directory, true)?;
            log_output(project, "install", &output);

            for (i, platform) in project.platforms.iter().enumerate() {
                self.report(&format!("Locking for {}", platform), 1 + i as u64, total);
                tracing::info!(
                    directory = %project.directory.display(),
                    platform = %platform,
                    "adding platform to lockfile"
                );
                let output = self.resolver.lock(&project.directory, platform)?;
                log_output(project, "lock", &output);
            }

            self.report("Lockfile updated", total, total);
            Ok(())
        })
    }
}

fn log_output(project: &ProjectSpec, call: &str, output: &ResolverOutput) {
    tracing::debug!(
        directory = %project.directory.display(),
        call,
        stdout = %output.stdout.trim_end(),
        stderr = %output.stderr.trim_end(),
        "resolver output"
    );
}
