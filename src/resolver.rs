//! External dependency resolver
//!
//! The resolver is an opaque program (Bundler by default). Everything relock needs
//! from it goes through the [`Resolver`] trait so the orchestration can be tested
//! with a fake; [`CommandResolver`] is the real thing and invokes the program with
//! an explicit argument list, never through a shell.

use crate::config::ResolverConfig;
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Variables that would point a nested `bundle` at the caller's Gemfile
const LEAKED_ENV_VARS: &[&str] = &["BUNDLE_GEMFILE", "BUNDLE_BIN_PATH", "RUBYOPT", "RUBYLIB"];

/// Lines of captured output kept in a resolver error
const OUTPUT_TAIL_LINES: usize = 30;

/// Captured output of a resolver invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait Resolver {
    /// Install the project's dependencies, optionally deleting the primary
    /// lockfile first so everything is resolved from scratch
    fn install(&self, directory: &Path, delete_primary_lock: bool) -> Result<ResolverOutput>;

    /// Merge the resolution for `platform` into the existing lockfile
    fn lock(&self, directory: &Path, platform: &str) -> Result<ResolverOutput>;

    /// Report outdated dependencies; a non-empty report is not an error
    fn outdated(&self, directory: &Path) -> Result<ResolverOutput>;
}

/// Runs the configured resolver program as a subprocess
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    leading_args: Vec<String>,
    lockfile: String,
}

impl CommandResolver {
    pub fn new(command: &[String], lockfile: &str) -> Result<Self> {
        let (program, leading_args) = command
            .split_first()
            .ok_or_else(|| Error::InvalidConfig("resolver.command must name a program".to_string()))?;

        Ok(Self {
            program: program.clone(),
            leading_args: leading_args.to_vec(),
            lockfile: lockfile.to_string(),
        })
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        Self::new(&config.command, &config.lockfile)
    }

    fn command(&self, directory: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd.args(args);
        cmd.current_dir(directory);
        for var in LEAKED_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    fn display(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.leading_args.iter().map(String::as_str))
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn spawn(&self, directory: &Path, args: &[&str]) -> Result<Output> {
        tracing::debug!(
            directory = %directory.display(),
            command = %self.display(args),
            "running resolver"
        );

        self.command(directory, args).output().map_err(|e| Error::Resolver {
            command: self.display(args),
            directory: directory.to_path_buf(),
            status: "could not start".to_string(),
            output: e.to_string(),
        })
    }

    fn run(&self, directory: &Path, args: &[&str]) -> Result<ResolverOutput> {
        let output = self.spawn(directory, args)?;
        let captured = ResolverOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(Error::Resolver {
                command: self.display(args),
                directory: directory.to_path_buf(),
                status: output.status.to_string(),
                output: output_tail(&captured),
            });
        }

        Ok(captured)
    }
}

impl Resolver for CommandResolver {
    fn install(&self, directory: &Path, delete_primary_lock: bool) -> Result<ResolverOutput> {
        if delete_primary_lock {
            let lockfile = directory.join(&self.lockfile);
            match fs::remove_file(&lockfile) {
                Ok(()) => tracing::debug!(path = %lockfile.display(), "deleted lockfile"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.run(directory, &["install"])
    }

    fn lock(&self, directory: &Path, platform: &str) -> Result<ResolverOutput> {
        self.run(directory, &["lock", "--add-platform", platform])
    }

    fn outdated(&self, directory: &Path) -> Result<ResolverOutput> {
        // `bundle outdated` exits non-zero whenever something is outdated
        let output = self.spawn(directory, &["outdated"])?;
        Ok(ResolverOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Last lines of stdout followed by stderr, the most relevant part of a failure
pub fn output_tail(output: &ResolverOutput) -> String {
    let lines: Vec<&str> = output
        .stdout
        .lines()
        .chain(output.stderr.lines())
        .collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}
