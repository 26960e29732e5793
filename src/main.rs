use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slidecat::cli::{file, init, keyword, project, search};
use slidecat::config::Config;
use slidecat::store::CatalogStore;

#[derive(Parser)]
#[command(name = "slidecat")]
#[command(about = "Catalog of slide decks, slides, and keyword tags")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "slidecat.yaml")]
    config: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the catalog database
    Init,

    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Source files of a project
    File {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Keyword management and tagging
    Keyword {
        #[command(subcommand)]
        command: KeywordCommands,
    },

    /// Full-text search over slide titles and notes
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name
        name: String,
        /// Folder holding the source decks
        folder: String,
    },
    /// List all projects
    List,
    /// Show a project and its files
    Show {
        /// Project ID or Name
        project: String,
    },
    /// Delete a project and everything in it
    Delete {
        /// Project ID or Name
        project: String,
    },
    /// Register decks found under the project folder
    Scan {
        /// Project ID or Name
        project: String,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    /// List files of a project
    List {
        /// Project ID or Name
        project: String,
    },
    /// Set the conversion status of a file
    Status {
        file_id: i64,
        /// Pending, "In Progress", Completed, or Failed
        status: String,
    },
}

#[derive(Subcommand)]
enum KeywordCommands {
    /// Add a keyword (no-op if it exists)
    Add {
        keyword: String,
        /// topic, title, or name
        #[arg(short, long, default_value = "topic")]
        kind: String,
    },
    /// List keywords
    List {
        #[arg(short, long)]
        kind: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move all tags from one keyword onto another and delete the first
    Merge { source: i64, target: i64 },
    /// Tag a slide (or element) with a keyword
    Tag {
        /// Slide ID, or element ID with --element
        id: i64,
        keyword: String,
        #[arg(short, long, default_value = "topic")]
        kind: String,
        #[arg(long)]
        element: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config
    let config = Config::load(&cli.config)?;

    // Initialize store
    let store = CatalogStore::with_config(config.store_config());
    let action = store
        .connect()
        .with_context(|| format!("opening catalog {}", config.database_path().display()))?;

    match cli.command {
        Commands::Init => {
            init::run(&store, action)?;
        }
        Commands::Project { command } => match command {
            ProjectCommands::Create { name, folder } => {
                project::create(&store, name, folder)?;
            }
            ProjectCommands::List => {
                project::list(&store)?;
            }
            ProjectCommands::Show { project } => {
                project::show(&store, project)?;
            }
            ProjectCommands::Delete { project } => {
                project::delete(&store, project)?;
            }
            ProjectCommands::Scan { project } => {
                project::scan(&store, project)?;
            }
        },
        Commands::File { command } => match command {
            FileCommands::List { project } => {
                file::list(&store, project)?;
            }
            FileCommands::Status { file_id, status } => {
                file::status(&store, file_id, status)?;
            }
        },
        Commands::Keyword { command } => match command {
            KeywordCommands::Add { keyword: text, kind } => {
                keyword::add(&store, text, kind)?;
            }
            KeywordCommands::List { kind, json } => {
                keyword::list(&store, kind, json)?;
            }
            KeywordCommands::Merge { source, target } => {
                keyword::merge(&store, source, target)?;
            }
            KeywordCommands::Tag {
                id,
                keyword: text,
                kind,
                element,
            } => {
                keyword::tag(&store, id, text, kind, element)?;
            }
        },
        Commands::Search { query, limit } => {
            search::run(&store, query, limit)?;
        }
    }

    store.close();
    Ok(())
}
