use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gfxprep",
    about = "Hardware-aware NVIDIA driver and ASUS laptop tooling setup for Fedora",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Read configuration from this file only, ignoring system and user config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show detected hardware and its classification
    Detect,

    /// Show the merged configuration each domain wants, without touching the system
    Plan,

    /// Converge the system to the merged configuration
    Apply {
        /// Show what would be changed without applying
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (auto-detected if omitted)
        shell: Option<Shell>,
    },
}

/// Print shell completions to stdout.
pub fn print_completions(shell: Option<Shell>) {
    let shell = shell.or_else(Shell::from_env).unwrap_or_else(|| {
        eprintln!(
            "Could not detect shell. Specify one: gfxprep completions bash|zsh|fish|elvish|powershell"
        );
        std::process::exit(1);
    });
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "gfxprep",
        &mut std::io::stdout(),
    );
}
