//! Pensive CLI - Command-line interface for the document store.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pensive_core::{Fields, PensiveConfig};
use pensive_db::{OpenOptions, Pensive};
use pensive_query::{Filter, FilterOp, QueryRequest};

/// Pensive - local-first semantic document store
#[derive(Parser)]
#[command(name = "pensive")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (default: from config, falling back to ./pensive.db)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new database
    Init,

    /// Add a text file to the database
    Add {
        /// Path to the text file to ingest
        file: PathBuf,

        /// Collection name
        #[arg(short, long, default_value = "notes")]
        collection: String,
    },

    /// Run a semantic search with optional keyword filters
    Search {
        /// Semantic search query
        query: String,

        /// Keyword filter on content (can be repeated)
        #[arg(short, long)]
        filter: Vec<String>,

        /// Collection name
        #[arg(short, long, default_value = "notes")]
        collection: String,

        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show database statistics
    Stats,

    /// Delete the database
    Clean,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn ensure_db_exists(path: &Path) {
    if !path.exists() {
        eprintln!("Database not found. Run `pensive init` first.");
        process::exit(1);
    }
}

fn read_file(path: &Path) -> String {
    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        process::exit(1);
    }
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = PensiveConfig::load_default()?;
    let db_path = cli.db_path.unwrap_or_else(|| config.database.path.clone());
    let options = OpenOptions {
        flush_every: config.database.flush_every,
        index_mode: config.database.index_mode,
    };

    match cli.command {
        Commands::Init => {
            if db_path.exists() {
                println!("Database already exists.");
                return Ok(());
            }
            let db = Pensive::open(&db_path, options)?;
            db.close()?;
            println!("Initialized database at {}", db_path.display());
        }
        Commands::Add { file, collection } => {
            ensure_db_exists(&db_path);
            let content = read_file(&file);

            let title = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut fields = Fields::new();
            fields.insert("title".to_string(), json!(title));
            fields.insert("content".to_string(), json!(content));

            let mut db = Pensive::open(&db_path, options)?;
            let id = db.insert(&collection, fields)?;
            db.close()?;

            println!("Inserted document {id} into '{collection}'");
        }
        Commands::Search {
            query,
            filter,
            collection,
            top_k,
        } => {
            ensure_db_exists(&db_path);

            let filters = if filter.is_empty() {
                vec![]
            } else {
                vec![Filter {
                    field: "content".to_string(),
                    op: FilterOp::In(filter),
                }]
            };

            let db = Pensive::open(&db_path, options)?;
            let hits = db.query(&QueryRequest {
                collection,
                filters,
                semantic_query: Some(query),
                top_k: top_k.unwrap_or(config.search.default_top_k),
            })?;

            if hits.is_empty() {
                println!("No results found.");
                return Ok(());
            }

            println!("\nSemantic Search Results:");
            for (i, hit) in hits.iter().enumerate() {
                println!("\nResult #{}", i + 1);
                println!("  ID: {}", hit.id);
                if let Some(score) = hit.score {
                    println!("  Score: {score:.4}");
                }
                if let Some(title) = hit.fields.get("title").and_then(|v| v.as_str()) {
                    println!("  Title: {title}");
                }
                if let Some(content) = hit.fields.get("content").and_then(|v| v.as_str()) {
                    let preview: String = content.chars().take(120).collect();
                    println!("  Content (preview): {preview}...");
                }
            }
        }
        Commands::Stats => {
            ensure_db_exists(&db_path);

            let db = Pensive::open(&db_path, options)?;
            let stats = db.stats()?;

            println!("Documents:  {}", stats.documents);
            println!("Embeddings: {}", stats.embeddings);
            println!("Size:       {} bytes", stats.storage_bytes);
        }
        Commands::Clean => {
            if db_path.exists() {
                fs::remove_file(&db_path)?;
                // WAL sidecar files, if present
                for suffix in ["-wal", "-shm"] {
                    let mut sidecar = db_path.clone().into_os_string();
                    sidecar.push(suffix);
                    let _ = fs::remove_file(PathBuf::from(sidecar));
                }
                println!("Database deleted.");
            } else {
                println!("No database found.");
            }
        }
    }

    Ok(())
}
