use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use rendezvous_client::{
    CallClient, CallState, ClientConfig, LifecycleSnapshot, MediaConfig, RemoteStore,
    WebRtcEngineFactory,
};
use rendezvous_core::IceServerConfig;
use rendezvous_server::{MemoryStore, ServerConfig, StoreService};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rendezvous")]
#[command(bin_name = "rendezvous")]
#[command(about = "Pair two participants into a one-to-one call")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling store server.
    Serve {
        /// Overrides RENDEZVOUS_BIND.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Join a call through a running store server.
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,

        /// STUN server, repeatable. Replaces the configured list.
        #[arg(long)]
        stun: Vec<String>,

        #[arg(long)]
        turn: Option<String>,

        #[arg(long, requires = "turn")]
        turn_user: Option<String>,

        #[arg(long, requires = "turn")]
        turn_credential: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { bind } => serve(bind).await,
        Commands::Join {
            url,
            stun,
            turn,
            turn_user,
            turn_credential,
        } => {
            let mut media = MediaConfig::from_env();
            if !stun.is_empty() {
                media.ice_servers = stun.into_iter().map(IceServerConfig::stun).collect();
            }
            if let Some(turn) = turn {
                media = media.with_turn(turn, turn_user, turn_credential);
            }
            join(&url, media).await
        }
    }
}

async fn serve(bind: Option<SocketAddr>) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(bind) = bind {
        config = config.with_bind(bind);
    }

    println!(
        "{} {}",
        "📡 Store server listening on".green().bold(),
        config.bind.to_string().cyan()
    );
    rendezvous_server::serve(config, StoreService::new(MemoryStore::new()))
        .await
        .context("Store server stopped")
}

async fn join(url: &str, media: MediaConfig) -> Result<()> {
    let config = ClientConfig::from_env();
    let store = RemoteStore::connect(url, config.store_request_timeout)
        .await
        .with_context(|| format!("Failed to reach store at {url}"))?;
    info!(%url, "connected to store");

    let client = CallClient::new(
        Arc::new(store),
        Arc::new(WebRtcEngineFactory::new(media)),
        config,
    );
    let mut states = client.subscribe();

    let role = client.join().await.context("Failed to join a call")?;
    println!("{} {}", "🚀 Joined as".green().bold(), role.to_string().bold());
    print_snapshot(&client.snapshot());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Hanging up...".yellow());
                client.leave().await;
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = states.borrow_and_update().clone();
                print_snapshot(&snapshot);
                if snapshot.state.is_terminal() {
                    client.leave().await;
                    break;
                }
            }
        }
    }

    let last = client.snapshot();
    let reason = last
        .reason
        .map(|r| format!("{r:?}"))
        .unwrap_or_else(|| "unknown".to_owned());
    println!("{} {}", "✨ Call ended:".green().bold(), reason);
    Ok(())
}

fn print_snapshot(snapshot: &LifecycleSnapshot) {
    let state = snapshot.state.to_string();
    let state = match snapshot.state {
        CallState::Connected => state.green().bold(),
        CallState::Failed => state.red().bold(),
        CallState::Disconnected | CallState::Closed => state.yellow(),
        _ => state.cyan(),
    };
    match &snapshot.room_id {
        Some(room) => println!("   📂 {} (room {})", state, room),
        None => println!("   📂 {}", state),
    }
}
