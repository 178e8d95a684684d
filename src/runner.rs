//! The update pipeline
//!
//! [`Orchestrator`] owns the order of operations. `update_ci` runs
//!
//! 1. stable channel pins on the primary manifest,
//! 2. the primary lockfile,
//! 3. every registered sub-project's lockfile, in declared order,
//! 4. the generated overrides file,
//!
//! and stops at the first failure. Steps that already finished are not undone;
//! the whole pipeline is safe to run again.

use crate::channel::ChannelLookup;
use crate::config::Config;
use crate::feed::PackageFeed;
use crate::generated::WriteOutcome;
use crate::lock_state::LOCK_CONFIG_PATH;
use crate::overrides;
use crate::pinner;
use crate::project::ProjectSpec;
use crate::resolver::Resolver;
use crate::updater::{LockUpdater, ProgressCallback};
use crate::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One unit of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    PinStableChannel,
    PrimaryLockfile,
    ProjectLockfile(ProjectSpec),
    Overrides,
}

/// What a finished step changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Relocked,
    File(WriteOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
}

pub struct Orchestrator<'a> {
    root: PathBuf,
    config: &'a Config,
    resolver: &'a dyn Resolver,
    feed: &'a dyn PackageFeed,
    channel: &'a dyn ChannelLookup,
    progress: Option<ProgressCallback>,
}

impl<'a> Orchestrator<'a> {
    pub fn new<P: Into<PathBuf>>(
        root: P,
        config: &'a Config,
        resolver: &'a dyn Resolver,
        feed: &'a dyn PackageFeed,
        channel: &'a dyn ChannelLookup,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            resolver,
            feed,
            channel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Human-readable name of a step, e.g. `omnibus/Gemfile.lock`
    pub fn describe(&self, step: &Step) -> String {
        let lockfile = &self.config.resolver.lockfile;
        match step {
            Step::PinStableChannel => self.config.stable_channel.manifest.display().to_string(),
            Step::PrimaryLockfile => self.config.primary_project().lockfile_label(lockfile),
            Step::ProjectLockfile(project) => project.lockfile_label(lockfile),
            Step::Overrides => self.config.overrides.path.display().to_string(),
        }
    }

    /// Steps of a full CI update, in order
    pub fn update_ci_plan(&self) -> Vec<Step> {
        let mut plan = vec![Step::PinStableChannel, Step::PrimaryLockfile];
        plan.extend(self.project_plan());
        plan.push(Step::Overrides);
        plan
    }

    /// One step per registered sub-project
    pub fn project_plan(&self) -> Vec<Step> {
        self.config
            .project_specs()
            .into_iter()
            .map(Step::ProjectLockfile)
            .collect()
    }

    /// Run `steps` in order, stopping at the first failure
    ///
    /// `before_step` is called as each step starts. The failing step is named in
    /// the returned [`Error::Step`].
    pub fn run<F>(&self, steps: &[Step], mut before_step: F) -> Result<Vec<StepReport>>
    where
        F: FnMut(&Step),
    {
        let mut reports = Vec::with_capacity(steps.len());

        for step in steps {
            before_step(step);
            tracing::info!(step = %self.describe(step), "starting");

            let outcome = self
                .run_step(step)
                .map_err(|e| e.in_step(format!("Updating {}", self.describe(step))))?;

            reports.push(StepReport {
                step: step.clone(),
                outcome,
            });
        }

        Ok(reports)
    }

    pub fn run_step(&self, step: &Step) -> Result<StepOutcome> {
        match step {
            Step::PinStableChannel => self.pin_stable_channel().map(StepOutcome::File),
            Step::PrimaryLockfile => self.update_primary_lockfile().map(|_| StepOutcome::Relocked),
            Step::ProjectLockfile(project) => {
                self.update_project(project).map(|_| StepOutcome::Relocked)
            }
            Step::Overrides => self.update_overrides().map(StepOutcome::File),
        }
    }

    /// Full CI update; see the module documentation for the order
    pub fn update_ci(&self) -> Result<Vec<StepReport>> {
        self.run(&self.update_ci_plan(), |_| {})
    }

    /// Pin the primary manifest to the stable channel
    pub fn pin_stable_channel(&self) -> Result<WriteOutcome> {
        let channel = &self.config.stable_channel;
        let manifest = self.root.join(&channel.manifest);

        pinner::pin(&manifest, &channel.pins, self.channel)?.write_if_changed()
    }

    /// Relock the repository root for every default platform
    pub fn update_primary_lockfile(&self) -> Result<()> {
        self.update_project(&self.config.primary_project())
    }

    /// Relock every registered sub-project, stopping at the first failure
    pub fn update_project_lockfiles(&self) -> Result<Vec<StepReport>> {
        self.run(&self.project_plan(), |_| {})
    }

    /// Relock one project; a relative directory is taken from the repository root
    pub fn update_project(&self, project: &ProjectSpec) -> Result<()> {
        let project = project.resolve_in(&self.root);

        if !project.directory.is_dir() {
            return Err(Error::Other(format!(
                "Project directory does not exist: {}",
                project.directory.display()
            )));
        }

        LockUpdater::new(self.resolver)
            .with_progress(self.progress.clone())
            .update(&project)
    }

    /// Regenerate the overrides file from the feed and the pinned table
    pub fn update_overrides(&self) -> Result<WriteOutcome> {
        let config = &self.config.overrides;

        overrides::generate(
            self.root.join(&config.path),
            &self.config.source,
            &config.latest,
            &config.pinned,
            self.feed,
        )?
        .write_if_changed()
    }

    /// Outdated-dependency report for the repository root
    pub fn outdated(&self) -> Result<String> {
        let output = self.resolver.outdated(&self.root)?;
        Ok(output.stdout)
    }

    /// Run the repository's own update script with inherited output
    pub fn run_update_script(&self) -> Result<()> {
        let script = self.root.join(&self.config.update_script);
        tracing::info!(script = %script.display(), "running update script");

        let status = Command::new(&script)
            .current_dir(&self.root)
            .status()
            .map_err(|e| Error::Resolver {
                command: script.display().to_string(),
                directory: self.root.clone(),
                status: "could not start".to_string(),
                output: e.to_string(),
            })?;

        if !status.success() {
            return Err(Error::Resolver {
                command: script.display().to_string(),
                directory: self.root.clone(),
                status: status.to_string(),
                output: String::new(),
            });
        }

        Ok(())
    }

    /// Drop the root's cached resolver settings, then run the update script
    ///
    /// Failing to remove the settings (other than them not existing) aborts
    /// before the script runs.
    pub fn force_update(&self) -> Result<()> {
        let settings = self.root.join(LOCK_CONFIG_PATH);
        match fs::remove_file(&settings) {
            Ok(()) => tracing::info!(path = %settings.display(), "removed cached settings"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.run_update_script()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::PinStableChannel => write!(f, "stable channel pins"),
            Step::PrimaryLockfile => write!(f, "primary lockfile"),
            Step::ProjectLockfile(project) => {
                write!(f, "lockfile of {}", project.directory.display())
            }
            Step::Overrides => write!(f, "overrides"),
        }
    }
}
