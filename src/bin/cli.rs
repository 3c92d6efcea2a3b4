//! notegraph CLI - queries and link graph over a markdown vault.
//!
//! Usage:
//!   notegraph index                       # Sync the index with the vault
//!   notegraph query '<query>'             # Run a TABLE / LIST / TASK query
//!   notegraph links <path>                # Outgoing links
//!   notegraph backlinks <path>            # Incoming links
//!   notegraph traverse <path> -d 3        # Walk the link graph
//!   notegraph related <path>              # Notes sharing links or tags
//!   notegraph orphans --kind isolated     # Unconnected notes
//!   notegraph broken                      # Links that resolve to nothing
//!   notegraph path <from> <to>            # Shortest link trail
//!   notegraph hubs                        # Most linked-to notes
//!   notegraph note <path>                 # Link counts for one note

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notegraph::{
    api, index_vault, render, Config, Direction, NoteIndex, OrphanKind, RelatedMethod,
};

#[derive(Parser)]
#[command(name = "notegraph")]
#[command(about = "notegraph - query language and link graph for markdown vaults", long_about = None)]
struct Cli {
    /// Vault root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    vault: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index new and changed notes, drop deleted ones
    Index,

    /// Run a query, e.g. 'TABLE title, confidence FROM "research" SORT confidence DESC'
    Query {
        text: String,

        /// Print structured rows as JSON instead of rendered text
        #[arg(long)]
        json: bool,
    },

    /// Show links going out of a note
    Links { path: String },

    /// Show links pointing at a note
    Backlinks { path: String },

    /// Breadth-first walk from a note
    Traverse {
        path: String,

        /// incoming, outgoing or both
        #[arg(long, default_value = "outgoing")]
        direction: Direction,

        /// Hops to follow (1-5, default from config)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Notes sharing links and/or tags with a note
    Related {
        path: String,

        /// links, tags or both
        #[arg(short, long, default_value = "both")]
        method: RelatedMethod,

        /// Maximum results (default from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Notes without incoming links, outgoing links, or either
    Orphans {
        /// no_incoming, no_outgoing or isolated
        #[arg(short, long, default_value = "isolated")]
        kind: OrphanKind,

        /// Only consider notes under this path prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Links whose target matches no note
    Broken {
        /// Only consider source notes under this path prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Shortest trail of outgoing links between two notes
    Path {
        from: String,
        to: String,

        #[arg(short, long, default_value = "5")]
        depth: usize,
    },

    /// Most linked-to notes
    Hubs {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Link counts for a single note
    Note { path: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("notegraph=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Open the vault's index, indexing it first if it does not exist yet.
fn open_index(root: &Path, config: &Config) -> Result<NoteIndex> {
    let index_path = config.index_path(root);
    let fresh = !index_path.exists();
    let mut index = NoteIndex::open(&index_path)?;
    if fresh {
        eprintln!("Indexing vault (first run)...");
        index_vault(&mut index, root, config)?;
    }
    Ok(index)
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.vault.canonicalize().unwrap_or(cli.vault);
    let config = Config::load(&root)?;

    if let Commands::Index = cli.command {
        let mut index = NoteIndex::open(&config.index_path(&root))?;
        let stats = index_vault(&mut index, &root, &config)?;
        println!("✓ Index updated");
        println!("  {}", stats);
        println!("  Total: {}", index.status()?);
        return Ok(());
    }

    let index = open_index(&root, &config)?;

    match cli.command {
        Commands::Index => {
            // Already handled above
        }

        Commands::Query { text, json } => {
            let result = api::execute_query(&index, &text, &config.query_options())?;
            if json {
                print_json(&result)?;
            } else {
                print!("{}", render(&result));
                eprintln!("{} result(s)", result.total);
            }
        }

        Commands::Links { path } => print_json(&api::get_outgoing_links(&index, &path)?)?,

        Commands::Backlinks { path } => print_json(&api::get_incoming_links(&index, &path)?)?,

        Commands::Traverse {
            path,
            direction,
            depth,
        } => {
            let depth = depth.unwrap_or(config.graph.default_depth);
            print_json(&api::traverse_graph(&index, &path, direction, depth)?)?;
        }

        Commands::Related {
            path,
            method,
            limit,
        } => {
            let limit = limit.unwrap_or(config.graph.related_limit);
            print_json(&api::find_related_notes(&index, &path, method, limit)?)?;
        }

        Commands::Orphans { kind, prefix } => {
            print_json(&api::find_orphans(&index, kind, prefix.as_deref())?)?
        }

        Commands::Broken { prefix } => {
            print_json(&api::find_broken_links(&index, prefix.as_deref())?)?
        }

        Commands::Path { from, to, depth } => {
            print_json(&api::find_path(&index, &from, &to, depth)?)?
        }

        Commands::Hubs { limit } => print_json(&api::find_hubs(&index, limit)?)?,

        Commands::Note { path } => match api::describe_note(&index, &path)? {
            Some(node) => print_json(&node)?,
            None => println!("No note at '{}'", path),
        },
    }

    Ok(())
}
