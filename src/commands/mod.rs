pub mod ci;
pub mod lockfile;
pub mod outdated;
pub mod overrides;
pub mod pin;
pub mod update;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use relock::{
    CommandResolver, Config, OmnitruckChannel, Orchestrator, PackageFeed, ProgressCallback,
    WriteOutcome,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything a command needs, built from the current directory and relock.toml
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    resolver: CommandResolver,
    feed: Box<dyn PackageFeed>,
    channel: OmnitruckChannel,
}

impl Workspace {
    pub fn load() -> Result<Self> {
        let root = env::current_dir()?;
        let config = Config::load()?;
        let resolver = CommandResolver::from_config(&config.resolver)?;
        let feed = relock::feed_from_config(&config.overrides)?;
        let channel = OmnitruckChannel::from_config(&config.stable_channel)?;

        Ok(Self {
            root,
            config,
            resolver,
            feed,
            channel,
        })
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            &self.root,
            &self.config,
            &self.resolver,
            self.feed.as_ref(),
            &self.channel,
        )
        .with_progress(Some(create_spinner_callback()))
    }
}

/// Section banner printed before each step
pub fn banner(title: &str) {
    println!();
    println!("-------------------------------------------------------------------");
    println!("Updating {} ...", title);
    println!("-------------------------------------------------------------------");
}

/// Report a generated file write, with its diff when it changed
pub fn report_write(path: &Path, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Unchanged => println!("  ✓ {} is up to date", path.display()),
        WriteOutcome::Changed { diff } => {
            println!("{} changed!", path.display());
            print!("{}", diff);
            println!("  ✓ Wrote modified {}", path.display());
        }
    }
}

/// Indicatif spinner for resolver progress; a new spinner starts at step 0
pub fn create_spinner_callback() -> ProgressCallback {
    let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));

    Arc::new(move |msg: &str, current: u64, total: u64| {
        let mut slot = match spinner.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };

        if current == 0 {
            let s = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                s.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            }
            s.enable_steady_tick(std::time::Duration::from_millis(80));
            *slot = Some(s);
        }

        if let Some(s) = slot.as_ref() {
            if current >= total && total > 0 {
                s.finish_with_message(format!("✓ {}", msg));
            } else {
                s.set_message(format!("[{}/{}] {}", current + 1, total, msg));
            }
        }
    })
}
