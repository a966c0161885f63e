//! Thumbrescue - recovers thumbnail images from Windows Explorer thumbcache
//! files by carving validated JPEGs out of the raw cache bytes.

mod events;
mod locator;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use thumbrescue_core::ScanStats;

use events::{ChannelPublisher, ScanEvent};
use locator::{default_cache_dir, DirLocator};
use session::ScanSession;

#[derive(Parser, Debug)]
#[command(name = "thumbrescue")]
#[command(author, version, about = "Recovers thumbnails from Explorer thumbcache files", long_about = None)]
struct Args {
    /// Directory containing thumbcache_*.db files (default: the current
    /// user's Explorer cache).
    #[arg(short, long)]
    cache_dir: Option<PathBuf>,

    /// Directory that receives the extracted thumbnails.
    #[arg(short, long, default_value = "./extracted")]
    output: PathBuf,

    /// Emit events as JSON lines instead of human-readable output.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cache_dir = match args.cache_dir {
        Some(dir) => dir,
        None => default_cache_dir()?,
    };

    let (publisher, events) = ChannelPublisher::new();
    let session = Arc::new(ScanSession::new(
        Arc::new(DirLocator::new(cache_dir)),
        &args.output,
        Arc::new(publisher),
    ));

    let ctrlc_session = Arc::clone(&session);
    ctrlc::set_handler(move || {
        ctrlc_session.stop();
    })
    .context("Failed to set Ctrl+C handler")?;

    session.start()?;

    for event in events {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            render_event(&event, &args.output);
        }
        if event.is_terminal() {
            break;
        }
    }

    session.wait();
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render_event(event: &ScanEvent, output_dir: &std::path::Path) {
    match event {
        ScanEvent::Progress { message, .. } => println!("[Scan] {message}"),
        ScanEvent::FileProcessed {
            file_name,
            extracted,
            ..
        } => println!("[Scan] {file_name}: {extracted} thumbnails"),
        ScanEvent::Completed { outputs, stats, .. } => {
            print_summary("Scan Finished", stats, outputs.len(), output_dir);
        }
        ScanEvent::Stopped { stats, .. } => {
            print_summary("Scan Stopped", stats, stats.total_images as usize, output_dir);
        }
        ScanEvent::Error { message } => eprintln!("[Scan] Error: {message}"),
    }
}

fn print_summary(title: &str, stats: &ScanStats, saved: usize, output_dir: &std::path::Path) {
    println!("\n╔════════════════════════════════════════╗");
    println!("║ {:^38} ║", format!("=== {title} ==="));
    println!("╠════════════════════════════════════════╣");
    println!(
        "║ Files Processed:    {:>18} ║",
        format!("{}/{}", stats.processed_files, stats.total_files)
    );
    println!("║ Thumbnails Saved:   {:>18} ║", saved);
    println!("╠════════════════════════════════════════╣");
    println!("║ Files saved to:     {:<18} ║", output_dir.display());
    println!("╚════════════════════════════════════════╝");
}
