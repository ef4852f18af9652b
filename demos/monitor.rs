//! Camera server monitor.
//!
//! Demonstrates:
//! - Building a client and waiting for the connection
//! - Subscribing to capture and camera events
//! - Sending status and capture commands
//! - Watching state transitions and printing the event log
//!
//! Usage:
//!   cargo run --example monitor -- ws://127.0.0.1:8765
//!   cargo run --example monitor -- ws://127.0.0.1:8765 --shoot cam1
//!   cargo run --example monitor -- ws://127.0.0.1:8765 --debug --no-wait

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use camera_link::{Client, Command, ParsedMessage, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8765";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    endpoint: String,
    shoot: Option<String>,
    debug: bool,
    no_wait: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let endpoint = args
            .iter()
            .find(|a| a.starts_with("ws://") || a.starts_with("wss://"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let shoot = args
            .iter()
            .position(|a| a == "--shoot")
            .and_then(|i| args.get(i + 1).cloned());

        Self {
            endpoint,
            shoot,
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Camera monitor: {} ===\n", args.endpoint);

    let client = Client::builder().endpoint(&args.endpoint).build()?;

    // ========================================================================
    // Subscriptions
    // ========================================================================

    let mut subscriptions = Vec::new();
    for tag in ["camera_connected", "camera_disconnected", "capture_complete", "camera_error"] {
        subscriptions.push(client.subscribe(tag, |message| {
            if let Some(summary) = message.parse().log_summary() {
                println!("[Event] {} {}", summary.severity, summary.message);
            }
        }));
    }

    let mut transitions = client.transitions();
    tokio::spawn(async move {
        while let Ok(state) = transitions.recv().await {
            println!("[State] {state}");
        }
    });

    // ========================================================================
    // Connect
    // ========================================================================

    client.connect().await?;
    client.wait_connected(CONNECT_TIMEOUT).await?;
    println!("        ✓ Connected\n");

    let status = client.send(Command::status()).await?;
    if let ParsedMessage::Status { cameras } = status.parse() {
        println!("[Status] {} camera(s)", cameras.len());
        for camera in &cameras {
            println!("        {camera}");
        }
    }

    if let Some(camera_id) = &args.shoot {
        println!("\n[Shot] Triggering {camera_id}...");
        let reply = client.send(Command::single_shot(camera_id)).await?;
        match reply.parse() {
            ParsedMessage::ShotResult { success: true, filename, .. } => {
                println!("        ✓ {}", filename.unwrap_or_default());
            }
            ParsedMessage::ShotResult { error, .. } => {
                println!("        ✗ {}", error.unwrap_or_else(|| "failed".into()));
            }
            other => println!("        ? {other:?}"),
        }
    }

    // ========================================================================
    // Wait
    // ========================================================================

    if args.no_wait {
        println!("\n[--no-wait] Skipping wait");
    } else {
        println!("\nPress Ctrl+C to exit...");
        tokio::signal::ctrl_c().await.ok();
    }

    client.disconnect().await?;
    for subscription in &subscriptions {
        subscription.unsubscribe();
    }

    println!("\n[Log] Newest first:");
    for entry in client.log_entries() {
        println!("        {entry}");
    }

    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "camera_link=debug"
    } else {
        "camera_link=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
