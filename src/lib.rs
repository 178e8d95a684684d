//! relock - lockfile maintenance for multi-project Ruby repositories
//!
//! relock keeps a repository's dependency state current in one serial pass:
//!
//! - Pins git-sourced gems in the primary Gemfile to the stable channel
//! - Regenerates `Gemfile.lock` from scratch and merges in every target platform
//! - Does the same for each registered sub-project (omnibus, acceptance, ...)
//! - Regenerates the omnibus overrides file from the latest published versions
//!
//! Bundler's freeze flag is lifted around each relock and always put back, and
//! generated files are only written when their content changes.
//!
//! # Examples
//!
//! ```no_run
//! use relock::{CommandResolver, Config, Orchestrator, OmnitruckChannel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let resolver = CommandResolver::from_config(&config.resolver)?;
//! let feed = relock::feed_from_config(&config.overrides)?;
//! let channel = OmnitruckChannel::from_config(&config.stable_channel)?;
//!
//! let orchestrator = Orchestrator::new(".", &config, &resolver, feed.as_ref(), &channel);
//! for report in orchestrator.update_ci()? {
//!     println!("{}: {:?}", report.step, report.outcome);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`lock_state`] - Lift and restore Bundler's freeze flag around a relock
//! - [`resolver`] - The external resolver (`bundle`) behind a trait
//! - [`updater`] - Install + per-platform lock for one project
//! - [`feed`] - Latest-version lookups (`gem list -r`, RubyGems API)
//! - [`channel`] - Stable channel version lookups
//! - [`pinner`] - Gemfile rewriting for stable channel pins
//! - [`overrides`] - Generated overrides file
//! - [`generated`] - Write-if-changed for generated files
//! - [`runner`] - The ordered, fail-fast pipeline
//! - [`config`] - `relock.toml`
//! - [`error`] - Error types and result handling

pub mod channel;
pub mod config;
pub mod error;
pub mod feed;
pub mod generated;
pub mod lock_state;
pub mod overrides;
pub mod pinner;
pub mod project;
pub mod resolver;
pub mod runner;
pub mod updater;

pub use channel::{ChannelLookup, OmnitruckChannel};
pub use config::{Config, FeedKind, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use feed::{feed_from_config, GemListFeed, HttpFeed, PackageFeed};
pub use generated::{GeneratedFile, WriteOutcome};
pub use lock_state::{with_unfrozen, LockConfig, UnfrozenScope};
pub use overrides::{OverrideEntry, OverrideSource};
pub use pinner::ManifestPinRule;
pub use project::ProjectSpec;
pub use resolver::{CommandResolver, Resolver, ResolverOutput};
pub use runner::{Orchestrator, Step, StepOutcome, StepReport};
pub use updater::{LockUpdater, ProgressCallback};
