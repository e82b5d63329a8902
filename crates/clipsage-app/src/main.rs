//! ClipSage command-line front end over the state containers.

use std::sync::Arc;

use clipsage_app::AppState;
use clipsage_chat::Role;
use clipsage_core::{ClipSageConfig, Video};
use clipsage_gateway::{loopback, BackendGateway, InMemoryBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("ClipSage: video library search and clip chat");
    println!();
    println!("Usage: clipsage <command>");
    println!();
    println!("Commands:");
    println!("  library                        List videos in the library");
    println!("  search <query>                 Search indexed video chunks");
    println!("  chat <search-query> <question> Ask about the clips a search finds");
    println!("  health                         Show backend health");
    println!("  help                           Show this help message");
    println!();
    println!("Set CLIPSAGE_FIXTURE to a JSON catalog to replace the sample library.");
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn print_video(video: &Video) {
    let state = if video.is_indexed() { "indexed" } else { "processing" };
    println!(
        "{:<16} {:>7}  {:<10}  {}",
        video.video_id,
        format_duration(video.duration_seconds),
        state,
        video.title
    );
}

fn build_backend(config: &ClipSageConfig) -> anyhow::Result<InMemoryBackend> {
    match &config.fixture_path {
        Some(path) => InMemoryBackend::from_fixture(path)
            .map_err(|e| anyhow::anyhow!("Failed to load fixture {}: {}", path.display(), e)),
        None => Ok(InMemoryBackend::with_sample_catalog()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    if matches!(command, "--help" | "-h" | "help") {
        print_help();
        return Ok(());
    }

    let config = ClipSageConfig::from_env();
    config.validate()?;
    let backend = build_backend(&config)?;
    let gateway = Arc::new(loopback(Arc::new(backend), config.ipc_timeout()));
    let state = AppState::new(config, gateway);

    match command {
        "library" => {
            state.library.fetch_all().await?;
            for video in state.library.videos() {
                print_video(&video);
            }
            info!(
                "{} videos, {} still processing",
                state.library.video_count(),
                state.library.processing_videos().len()
            );
        }
        "search" => {
            let query = args[2..].join(" ");
            if query.trim().is_empty() {
                eprintln!("Usage: clipsage search <query>");
                std::process::exit(1);
            }
            state.search.search(Some(&query), None).await?;
            for result in state.search.results() {
                println!(
                    "{:.2}  {:<20} {}-{}  {}",
                    result.score,
                    result.video_title.as_deref().unwrap_or(&result.video_id),
                    format_duration(result.start_time),
                    format_duration(result.end_time),
                    result.transcript.as_deref().unwrap_or("")
                );
            }
        }
        "chat" => {
            if args.len() < 4 {
                eprintln!("Usage: clipsage chat <search-query> <question>");
                std::process::exit(1);
            }
            state.search.search(Some(&args[2]), None).await?;
            for result in state.search.results() {
                state.attach_result(&result.chunk_id);
            }
            state.chat.send_message(&args[3..].join(" ")).await?;

            let reply = state
                .chat
                .messages()
                .into_iter()
                .rev()
                .find(|m| m.role == Role::Assistant);
            match reply {
                Some(reply) => {
                    println!("{}", reply.content);
                    if let Some(sources) = reply.sources.filter(|s| !s.is_empty()) {
                        println!();
                        println!("Sources: {}", sources.join(", "));
                    }
                }
                // Guard toasts (no clips, blank question) end up here.
                None => {
                    for toast in state.notifications.toasts() {
                        eprintln!("[{}] {}", toast.severity, toast.message);
                    }
                    std::process::exit(1);
                }
            }
        }
        "health" => {
            let health = state.gateway.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        _ => {
            eprintln!("Unknown command: {}. Use 'clipsage help' for usage.", command);
            std::process::exit(1);
        }
    }

    Ok(())
}
