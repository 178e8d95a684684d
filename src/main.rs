use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

mod commands;

/// relock - lockfile maintenance for multi-project Ruby repositories
#[derive(Parser)]
#[command(name = "relock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug); RELOCK_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update all dependencies by running the repository's update script
    Update,

    /// Forget cached Bundler settings, then update (when adding new gems to Gemfiles)
    ForceUpdate,

    /// Update everything in CI order: stable pins, lockfiles, overrides
    UpdateCi {
        /// Report outdated gems once the update succeeded
        #[arg(long)]
        outdated: bool,
    },

    /// Update Gemfile.lock for every configured platform
    UpdateGemfileLock,

    /// Update the lockfile of one registered sub-project
    UpdateProject {
        /// Project directory as registered in relock.toml (e.g. omnibus)
        directory: String,
    },

    /// Update the lockfiles of all registered sub-projects
    UpdateProjects,

    /// Pin Gemfile entries to the versions on the stable channel
    UpdateStableChannelGems,

    /// Regenerate the omnibus overrides file
    UpdateOmnibusOverrides,

    /// Show outdated gems in the primary Gemfile
    Outdated,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env("RELOCK_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Update => commands::update::run(false),
        Commands::ForceUpdate => commands::update::run(true),
        Commands::UpdateCi { outdated } => commands::ci::run(outdated),
        Commands::UpdateGemfileLock => commands::lockfile::run_primary(),
        Commands::UpdateProject { directory } => commands::lockfile::run_project(&directory),
        Commands::UpdateProjects => commands::lockfile::run_projects(),
        Commands::UpdateStableChannelGems => commands::pin::run(),
        Commands::UpdateOmnibusOverrides => commands::overrides::run(),
        Commands::Outdated => commands::outdated::run(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "relock", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
