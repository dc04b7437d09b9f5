use clap::{Parser, Subcommand};
use logly::prelude::*;
use std::sync::Arc;

use paged_btree::{FileByteStore, PageAllocator, Tree, TreeConfig};

#[derive(Parser)]
#[command(name = "paged-btree", about = "Query and update a paged B+ tree file")]
struct Cli {
    /// Path to a TOML config file (page size, cache capacity, data path).
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the value stored for a key.
    Get { key: i32 },
    /// Store a non-zero value for a key, inserting or updating it.
    Put { key: i32, value: i32 },
    /// Print the tree's page count and entry count.
    Stats,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Arc::new(Logger::new());
    let mut logger_config = LoggerConfig::default();
    logger_config.color = true;
    logger.configure(logger_config);
    paged_btree::logging::install(logger.clone(), log::LevelFilter::Trace)
        .expect("logger backend installed exactly once at startup");

    let config = match &cli.config {
        Some(path) => TreeConfig::load_from_file(path)?,
        None => TreeConfig::default(),
    };

    if let Some(parent) = config.data_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = FileByteStore::open(&config.data_path)?;
    let root_address = config.page_size as i64;
    // 2 pages already spoken for: the reserved page 0 and the root page
    // itself, both already written by the time `Tree::new` returns.
    let mut allocator = PageAllocator::starting_after(config.page_size as i64, 2);
    let mut tree = match config.cache_capacity {
        Some(capacity) => Tree::with_cache_capacity(
            config.page_size as i64,
            store,
            root_address,
            move || allocator.allocate(),
            capacity,
        )?,
        None => Tree::new(
            config.page_size as i64,
            store,
            root_address,
            move || allocator.allocate(),
        )?,
    };

    match cli.command {
        Commands::Get { key } => {
            let value = tree.get(key)?;
            if value == 0 {
                println!("(absent)");
            } else {
                println!("{value}");
            }
        }
        Commands::Put { key, value } => {
            tree.put(key, value)?;
            log::info!("put {key} -> {value}");
            println!("ok");
        }
        Commands::Stats => {
            println!("pages: {}", tree.page_count());
            println!("entries: {}", tree.size());
        }
    }

    Ok(())
}
