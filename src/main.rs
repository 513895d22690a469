use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use mozmover::{
    apps::MozApp,
    commands,
    engine::Engine,
    guard::SystemCloser,
    paths::BasePaths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "mozmover")]
#[command(about = "Firefox / Thunderbird profile backup & restore")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected profiles (default profiles first)
    List,

    /// Back up profiles into a single zip archive
    Backup {
        /// Profile folder name to include (repeatable); omit for interactive selection
        #[arg(long = "profile", value_name = "FOLDER")]
        profiles: Vec<String>,

        /// Only consider profiles of this application
        #[arg(long, value_name = "APP")]
        app: Option<MozApp>,

        /// Back up every detected profile
        #[arg(long)]
        all: bool,

        /// Destination archive (default: MozMover_<date>.zip in your home directory)
        #[arg(long, short, value_name = "ZIP")]
        output: Option<PathBuf>,

        /// Seconds to wait for the application to close before force-killing it
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },

    /// Restore a backup archive into an application's profile area
    Restore {
        /// Backup archive to restore
        archive: PathBuf,

        /// Application to restore into
        #[arg(long, value_name = "APP")]
        app: MozApp,

        /// Name for the restored profile folder (default: the archive's file stem)
        #[arg(long, value_name = "FOLDER")]
        name: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Seconds to wait for the application to close before force-killing it
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },

    /// Run diagnostics on profile discovery and the environment
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let ui = Ui::new(cli.color, cli.no_color);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let paths = BasePaths::new()?;
    let engine = Engine::new(paths.lock_file.clone());

    match cli.command {
        Commands::List => commands::list(&paths, &ui),
        Commands::Backup {
            profiles,
            app,
            all,
            output,
            timeout,
        } => commands::backup(
            &paths,
            &engine,
            &ui,
            &SystemCloser,
            &profiles,
            app,
            all,
            output,
            timeout,
        ),
        Commands::Restore {
            archive,
            app,
            name,
            yes,
            timeout,
        } => commands::restore(
            &paths, &engine, &ui, &SystemCloser, &archive, app, name, yes, timeout,
        ),
        Commands::Doctor => commands::doctor(&paths, &ui),
        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
