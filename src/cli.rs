use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crosscraft::client::QuizClient;
use crosscraft::core::round::DEFAULT_DECOYS;
use crosscraft::{Catalog, MemoryStore, QuizServer, ServerConfig};

#[derive(Parser)]
#[command(name = "crosscraft")]
#[command(about = "Word-definition quiz over WebSocket, with streaks and levels")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Host the quiz
    Serve {
        /// Address to bind the server to
        #[arg(short, long, env = "CROSSCRAFT_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,

        /// JSON word catalog
        #[arg(short, long, env = "CROSSCRAFT_CATALOG", default_value = "data/words.json")]
        catalog: PathBuf,

        /// Decoy clues shown next to the correct one
        #[arg(short, long, env = "CROSSCRAFT_DECOYS", default_value_t = DEFAULT_DECOYS)]
        decoys: usize,

        /// Token players must present to be verified (anyone is verified when unset)
        #[arg(long, env = "CROSSCRAFT_ACCESS_TOKEN")]
        access_token: Option<String>,

        /// Idle seconds before a session is forgotten
        #[arg(long, env = "CROSSCRAFT_SESSION_TTL_SECS", default_value_t = 1800)]
        session_ttl_secs: u64,
    },
    /// Play in the terminal
    Play {
        /// Server address (e.g. "127.0.0.1:8080")
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: String,

        /// Access token for verification
        #[arg(short, long, env = "CROSSCRAFT_ACCESS_TOKEN", default_value = "")]
        token: String,

        /// Session id to resume
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Load a catalog and print its counts
    Check {
        #[arg(short, long, default_value = "data/words.json")]
        catalog: PathBuf,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr, catalog, decoys, access_token, session_ttl_secs } => {
            init_tracing("info");
            info!(
                %addr,
                catalog = %catalog.display(),
                decoys,
                access_token = if access_token.is_some() { "set" } else { "unset" },
                session_ttl_secs,
                "starting crosscraft"
            );

            let catalog = open_catalog(&catalog).await?;
            let config = ServerConfig {
                decoys,
                access_token,
                session_ttl: Duration::from_secs(session_ttl_secs),
            };
            QuizServer::bind(&addr, catalog, config).await?.run().await?;
        }

        Commands::Play { addr, token, session } => {
            // keep the TUI clean
            init_tracing("warn");
            let client = QuizClient::new(&addr);
            if let Some(session) = client.play(token, session).await? {
                println!("Session id: {session} (resume with --session {session})");
            }
        }

        Commands::Check { catalog } => {
            init_tracing("warn");
            let catalog = open_catalog(&catalog).await?;
            println!("Words: {}", catalog.count_words());
            println!("Clues: {}", catalog.count_clues());
        }
    }

    Ok(())
}

async fn open_catalog(path: &Path) -> Result<Catalog<MemoryStore>> {
    let store = MemoryStore::load(path)
        .await
        .with_context(|| format!("failed to load catalog {}", path.display()))?;
    Ok(Catalog::open(store).await?)
}

fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
