//! Husk CLI - command-line interface for Husk.

use clap::{Parser, Subcommand};
use husk_cli::commands::{self, CatFileMode, Workspace};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Husk - a content-addressed object store for directory snapshots
#[derive(Parser, Debug)]
#[command(name = "husk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Working tree to operate on
    #[arg(short = 'C', long, default_value = ".")]
    work_tree: PathBuf,

    /// YAML store configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty repository
    Init,

    /// Compute the blob id of a file
    HashObject {
        /// Store the blob as well
        #[arg(short)]
        w: bool,
        /// File to hash
        file: PathBuf,
    },

    /// Show an object's content, type, or size
    CatFile {
        /// Pretty-print the content (default)
        #[arg(short, conflicts_with_all = ["t", "s"])]
        p: bool,
        /// Show the object type
        #[arg(short, conflicts_with = "s")]
        t: bool,
        /// Show the payload size
        #[arg(short)]
        s: bool,
        /// Object id
        object: String,
    },

    /// List the entries of a tree
    LsTree {
        /// Only list entry names
        #[arg(long)]
        name_only: bool,
        /// Tree id
        tree: String,
    },

    /// Snapshot the working tree and print the root tree id
    WriteTree,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!("husk={log_level},husk_cli={log_level},husk_storage={log_level}")
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = Workspace::load(cli.work_tree, cli.config.as_deref()).and_then(|workspace| {
        match cli.command {
            Commands::Init => commands::init(&workspace, &mut out),
            Commands::HashObject { w, file } => {
                commands::hash_object(&workspace, &file, w, &mut out)
            }
            Commands::CatFile { t, s, object, .. } => {
                let mode = if t {
                    CatFileMode::Type
                } else if s {
                    CatFileMode::Size
                } else {
                    CatFileMode::Pretty
                };
                commands::cat_file(&workspace, mode, &object, &mut out)
            }
            Commands::LsTree { name_only, tree } => {
                commands::ls_tree(&workspace, &tree, name_only, &mut out)
            }
            Commands::WriteTree => commands::write_tree(&workspace, &mut out),
        }
    });

    let result = result.and_then(|()| out.flush().map_err(Into::into));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
