//! vidlib CLI
//!
//! Scan watched directories into the catalog and browse or edit it.

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;

use video_library::{
    CancellationToken, CatalogEntry, Library, LibraryConfig, LibraryError, PageRequest,
    ProgressReporter, SortKey, ViewMode,
};

const ABOUT: &str = r#"
vidlib - personal video library

Examples:
  vidlib scan -r ~/Videos                          catalog new or changed videos
  vidlib scan -r ~/Videos -r /mnt/media --progress  several roots, JSON progress on stderr
  vidlib list --view favorites --sort size --asc   favorites, smallest first
  vidlib list --search holiday --page 2            second page of search results
  vidlib rename 42 "Beach day"                     rename a video and its thumbnail
  vidlib merge part1.mp4 part2.mp4 -o whole        concatenate clips
"#;

/// Personal video library
#[derive(Parser)]
#[command(name = "vidlib")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON config file; missing file means defaults
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database path (overrides config)
    #[arg(short = 'd', long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Catalog videos added or modified since the last scan
    Scan {
        /// Root directory to watch, may be repeated (overrides config roots)
        #[arg(short = 'r', long = "root")]
        roots: Vec<PathBuf>,

        /// Parallel threads (0 = auto)
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Maximum recursion depth below each root
        #[arg(long)]
        max_depth: Option<usize>,

        /// Emit JSON-lines progress on stderr
        #[arg(long)]
        progress: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one page of the catalog
    List {
        #[arg(long, default_value = "all")]
        view: ViewMode,

        #[arg(long, default_value = "date-added")]
        sort: SortKey,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,

        /// Case-insensitive title or path search (replaces --view)
        #[arg(short = 's', long, default_value = "")]
        search: String,

        #[arg(short = 'p', long, default_value = "1", allow_hyphen_values = true)]
        page: i64,

        /// Entries per page (overrides config)
        #[arg(long)]
        page_size: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Show the newest videos
    Featured {
        #[arg(short = 'n', long, default_value = "10")]
        count: u64,

        #[arg(long)]
        json: bool,
    },

    /// Toggle the favorite flag of a video
    Favorite { id: i64 },

    /// Toggle the watch-later flag of a video
    WatchLater { id: i64 },

    /// Rename a video file (directory and extension are kept)
    Rename { id: i64, name: String },

    /// Delete a video file, its thumbnail and its catalog entry
    Delete { id: i64 },

    /// Re-read size and duration of a video from disk
    Refresh { id: i64 },

    /// Concatenate clips into one file next to the first clip
    Merge {
        /// Source clips in playback order
        #[arg(required = true, num_args = 2..)]
        sources: Vec<PathBuf>,

        /// Output base name, without extension
        #[arg(short = 'o', long)]
        output: String,
    },

    /// Print the effective configuration
    Config,
}

fn load_config(cli: &Cli) -> Result<LibraryConfig, LibraryError> {
    let mut config = match &cli.config {
        Some(path) if path.exists() => LibraryConfig::load(path)?,
        Some(path) => {
            info!("Config {} not found, using defaults", path.display());
            LibraryConfig::default()
        }
        None => LibraryConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(config)
}

fn print_entries(entries: &[CatalogEntry]) {
    for entry in entries {
        let mut flags = String::new();
        if entry.is_favorite {
            flags.push('*');
        }
        if entry.is_watch_later {
            flags.push('+');
        }
        println!(
            "{:>6} {:<2} {:>8}s {:>12} {}  {}",
            entry.id,
            flags,
            entry.duration.as_secs(),
            entry.file_size,
            entry.date_added.format("%Y-%m-%d %H:%M"),
            entry.title
        );
    }
}

/// Token cancelled by Ctrl+C, so an interrupted merge cleans up its output
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, cancelling merge...");
        token.cancel();
    }) {
        warn!("Ctrl+C handler unavailable, merge cannot be interrupted: {}", e);
    }
    cancel
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LibraryError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), LibraryError> {
    let Some(command) = &cli.command else {
        println!("{}", ABOUT);
        println!("Run 'vidlib --help' for all commands");
        return Ok(());
    };
    let mut config = load_config(&cli)?;

    match command {
        Commands::Config => print_json(&config)?,

        Commands::Scan {
            roots,
            threads,
            max_depth,
            progress,
            json,
        } => {
            if !roots.is_empty() {
                config.roots = roots.clone();
            }
            if let Some(threads) = threads {
                config.num_threads = *threads;
            }
            if max_depth.is_some() {
                config.max_depth = *max_depth;
            }
            info!("Roots: {:?}", config.roots);
            info!("Threads: {}", config.effective_threads());

            let library = Library::open(config)?;
            let reporter = ProgressReporter::new(*progress, 200);
            let summary = library.scan(Some(&reporter))?;

            if *json {
                print_json(&summary)?;
            } else {
                println!("Scan completed:");
                println!("  Catalogued: {}", summary.added);
                println!("  Unchanged: {}", summary.skipped);
                println!("  Failed: {}", summary.failed);
                println!("  Directories: {}", summary.directories);
                println!("  Duration: {}ms", summary.duration_ms);
            }
        }

        Commands::List {
            view,
            sort,
            asc,
            search,
            page,
            page_size,
            json,
        } => {
            let size = page_size.unwrap_or_else(|| config.effective_page_size());
            let request = PageRequest::new(size)
                .with_view(*view)
                .with_sort(*sort, *asc)
                .with_search(search.clone())
                .with_page(*page);
            let library = Library::open(config)?;
            let page = library.page(&request)?;

            if *json {
                print_json(&page)?;
            } else {
                print_entries(&page.entries);
                println!(
                    "Page {}/{} ({} videos, view: {}, sort: {} {})",
                    page.current_page,
                    page.total_pages.max(1),
                    page.total_count,
                    if request.search.trim().is_empty() { view.as_str() } else { "search" },
                    sort.as_str(),
                    if *asc { "asc" } else { "desc" }
                );
            }
        }

        Commands::Featured { count, json } => {
            let library = Library::open(config)?;
            let entries = library.featured(*count)?;
            if *json {
                print_json(&entries)?;
            } else {
                print_entries(&entries);
            }
        }

        Commands::Favorite { id } => {
            let library = Library::open(config)?;
            match library.toggle_favorite(*id)? {
                Some(value) => println!("Video {} favorite: {}", id, value),
                None => println!("No video with id {}", id),
            }
        }

        Commands::WatchLater { id } => {
            let library = Library::open(config)?;
            match library.toggle_watch_later(*id)? {
                Some(value) => println!("Video {} watch later: {}", id, value),
                None => println!("No video with id {}", id),
            }
        }

        Commands::Rename { id, name } => {
            let library = Library::open(config)?;
            let entry = library.rename(*id, name)?;
            println!("Renamed to {}", entry.file_path.display());
        }

        Commands::Delete { id } => {
            let library = Library::open(config)?;
            if library.delete_video(*id)? {
                println!("Deleted video {}", id);
            } else {
                println!("No video with id {}", id);
            }
        }

        Commands::Refresh { id } => {
            let library = Library::open(config)?;
            let entry = library.refresh_metadata(*id)?;
            println!(
                "{}: {} bytes, {}s",
                entry.title,
                entry.file_size,
                entry.duration.as_secs()
            );
        }

        Commands::Merge { sources, output } => {
            let library = Library::open(config)?;
            let cancel = cancel_on_interrupt();
            let path = library.merge(sources, output, &cancel)?;
            println!("Merged into {}", path.display());
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
