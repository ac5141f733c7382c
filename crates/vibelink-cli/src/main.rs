//! Vibelink CLI - the `vibelink` command.
//!
//! Starts the relay that sits between a Strudel live-coding editor and
//! (a) the shared transport clock and (b) a streaming assistant backend.
//!
//! # Architecture
//!
//! The binary orchestrates the modular crates:
//!
//! - **vibelink-core**: Transport state, wire protocol, pattern validation
//! - **vibelink-llm**: Streaming chat providers (Gemini, mock)
//! - **vibelink-relay**: WebSocket server, clock task, assistant orchestrator

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use vibelink_llm::{ChatProvider, GeminiProvider, MockProvider, DEFAULT_MODEL};
use vibelink_relay::start_server;

/// Vibelink - Strudel editor companion relay
#[derive(Parser, Debug)]
#[command(name = "vibelink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relay between a Strudel editor, transport clock and assistant", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1", env = "HOST")]
        host: IpAddr,

        /// Port to listen on
        #[arg(long, default_value_t = 8787, env = "PORT")]
        port: u16,

        /// Default assistant model
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Use the offline mock assistant even when an API key is set
        #[arg(long)]
        mock: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Commands::Serve {
            host,
            port,
            model,
            mock,
        } => serve(host, port, model, mock),
        Commands::Version => {
            println!("vibelink {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Part of the Vibelink project");
            println!("Relay for Strudel live-coding sessions");
            println!();
            println!("Modular Architecture:");
            println!("  - vibelink-core:  Transport state and pattern validation");
            println!("  - vibelink-llm:   Streaming chat providers");
            println!("  - vibelink-relay: WebSocket relay server");
            Ok(())
        }
    }
}

fn serve(host: IpAddr, port: u16, model: String, mock: bool) -> Result<()> {
    let provider = select_provider(model, mock);
    let addr = SocketAddr::new(host, port);

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        tokio::select! {
            result = start_server(addr, provider) => {
                result.with_context(|| format!("relay failed on {addr}"))
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("[relay] shutting down");
                Ok(())
            }
        }
    })
}

/// Pick the chat backend: Gemini when an API key is available, otherwise
/// fall back to the offline mock with a warning.
fn select_provider(model: String, force_mock: bool) -> Arc<dyn ChatProvider> {
    if force_mock {
        return Arc::new(MockProvider::new());
    }
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(GeminiProvider::new(key, model)),
        _ => {
            log::warn!("GEMINI_API_KEY not found in environment, falling back to mock assistant");
            Arc::new(MockProvider::new())
        }
    }
}
