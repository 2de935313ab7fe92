//! Russian Spin binary: score relay server and terminal client.

use clap::{Parser, Subcommand};
use russian_spin::{
    api::ApiServer,
    config::{ConfigLoader, LoadedConfig},
    games::{GameClient, IdentityResolver, OsRandomness, Phase, Session, StaticIdentity},
    submission::{Address, RelayClient, SubmissionService},
};
use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

#[derive(Parser)]
#[command(name = "russian-spin")]
#[command(about = "Russian Spin score relay and terminal client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the score relay
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Play in the terminal, submitting cash-outs to a relay
    Play {
        /// Player address (0x + 40 hex)
        #[arg(long)]
        player: Address,

        /// Display name
        #[arg(long)]
        username: Option<String>,

        /// Relay base URL
        #[arg(long, default_value = "http://localhost:3000")]
        relay_url: String,

        /// Submission timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "russian_spin=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve { config, host, port } => serve(config, host, port).await,
        Commands::Play {
            player,
            username,
            relay_url,
            timeout,
        } => play(player, username, &relay_url, Duration::from_secs(timeout)).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(
    path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_path(path);
    }
    let LoadedConfig {
        mut config,
        credentials,
    } = loader.load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let service = SubmissionService::connect(&config, credentials).await?;
    ApiServer::new(config.server, config.chain, Arc::new(service)).run().await
}

async fn play(
    player: Address,
    username: Option<String>,
    relay_url: &str,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = RelayClient::new(relay_url, timeout)?;
    let mut identity = StaticIdentity::confirmed(player);
    if let Some(name) = username {
        identity = identity.with_username(name);
    }
    let display_name = identity
        .resolve()
        .and_then(|resolved| resolved.username)
        .unwrap_or_else(|| player.short());
    let mut client = GameClient::new(OsRandomness, Arc::new(identity), sink);

    println!("Russian Spin - player {}", display_name);
    println!("commands: start, spin, cash, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "start" => match client.start() {
                Ok(session) => print_session(&session),
                Err(e) => println!("cannot start: {}", e),
            },
            "spin" => match client.spin() {
                Ok(session) => {
                    if let Some(roll) = session.last_roll {
                        println!("rolled chamber {}", roll);
                    }
                    print_session(&session);
                }
                Err(e) => println!("cannot spin: {}", e),
            },
            "cash" => match client.cash_out().await {
                Ok(receipt) => {
                    match receipt.result {
                        Ok(tx) => println!("cashed out {} points, tx {}", receipt.submission.score, tx.hash),
                        Err(e) => println!(
                            "cashed out {} points, submission failed: {}",
                            receipt.submission.score, e
                        ),
                    }
                    print_session(&client.session());
                }
                Err(e) => println!("cannot cash out: {}", e),
            },
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command '{}'", other),
        }
    }
    Ok(())
}

fn print_session(session: &Session) {
    let (loaded, chambers) = session.risk();
    match session.phase {
        Phase::Dead => println!("BANG. level {} lost, score 0", session.level),
        phase => println!(
            "[{}] level {} | points {} | risk {}/{}",
            phase, session.level, session.points, loaded, chambers
        ),
    }
    if session.phase.is_terminal() {
        println!("round over; 'start' plays again");
    }
}
