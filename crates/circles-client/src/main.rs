//! # Circles terminal client
//!
//! ```bash
//! # Join the relay on localhost, asking for initials
//! circles
//!
//! # Join with MessagePack framing
//! circles --url ws://relay.example:8080/ws --initials JD --encoding msgpack
//! ```

use anyhow::{Context, Result};
use circles_client::{command::HELP, Command, LinePrompt, Session};
use circles_core::{prompt_initials, CanvasChange, Initials};
use circles_protocol::Encoding;
use circles_transport::{Connection, WebSocketConnection};
use clap::Parser;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "circles", version, about = "Terminal client for the Circles relay")]
struct Cli {
    /// WebSocket endpoint of the relay.
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Your initials (2 or 3 characters). Asked for when missing or invalid.
    #[arg(short, long)]
    initials: Option<String>,

    /// Encoding of events sent and received: json or msgpack.
    #[arg(short, long, default_value = "json")]
    encoding: Encoding,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing on stderr, stdout carries the canvas
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circles_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let initials = match cli.initials.as_deref().map(Initials::parse) {
        Some(Ok(initials)) => initials,
        Some(Err(e)) => {
            warn!("{}", e);
            ask_initials().await?
        }
        None => ask_initials().await?,
    };

    let conn = WebSocketConnection::connect(&cli.url, cli.encoding)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.url))?;
    let mut session = Session::new(conn, initials);
    info!(url = %cli.url, "Joined relay");
    println!(
        "Drawing as {} over {}",
        session.initials(),
        session.connection().encoding()
    );
    println!("{HELP}");
    let mut lines = stdin_lines();
    let mut rng = rand::rng();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                match line.parse::<Command>() {
                    Ok(Command::Click { x, y }) => {
                        session.click(x, y, &mut rng).await.context("Failed to send circle")?;
                    }
                    Ok(Command::Clear) => {
                        session.clear().await.context("Failed to send clear")?;
                    }
                    Ok(Command::List) => {
                        for element in session.canvas().elements() {
                            println!("  {} {}", element.label, element.style());
                        }
                        println!("{} circle(s)", session.canvas().len());
                    }
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::Quit) => break,
                    Err(circles_client::CommandError::Empty) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }

            change = session.next_change() => {
                match change.context("Connection to relay failed")? {
                    Some(CanvasChange::Added(element)) => {
                        let (x, y) = element.center();
                        println!("+ {} at ({x}, {y}) size {} {}", element.label, element.size, element.background);
                    }
                    Some(CanvasChange::Cleared(count)) => println!("cleared {count} circle(s)"),
                    None => {
                        info!("Relay closed the connection");
                        return Ok(());
                    }
                }
            }
        }
    }

    session.close().await.ok();
    Ok(())
}

/// Prompt on stdin until valid initials are entered.
async fn ask_initials() -> Result<Initials> {
    let initials = tokio::task::spawn_blocking(|| {
        let mut prompt = LinePrompt::new(std::io::stdin().lock(), std::io::stderr());
        prompt_initials(&mut prompt)
    })
    .await??;
    Ok(initials)
}

/// Forward stdin lines from a blocking reader thread.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
