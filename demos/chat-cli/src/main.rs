//! Interactive terminal chat client.
//!
//! Connects, authenticates ad hoc, joins one room, and bridges stdin
//! to it: lines you type are sent, messages and membership events are
//! printed as they arrive.

use clap::Parser;
use parley::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chat-cli", about = "Terminal client for Parley chat servers")]
struct Args {
    /// WebSocket URL of the chat server.
    #[arg(long, default_value = "ws://127.0.0.1:8080/chat")]
    url: String,

    /// Username for ad-hoc authentication.
    #[arg(long)]
    username: String,

    /// Room to join on startup.
    #[arg(long, default_value = "lobby")]
    room: String,
}

#[tokio::main]
async fn main() -> Result<(), ParleyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let session = Session::new(SessionConfig::new(&args.url));
    session.connect().await?;
    session.ad_hoc(&args.username).await?;

    let room = session.join(args.room.as_str()).await?;
    let mut messages = room.messages();
    let mut events = room.events();
    let mut closes = session.dispatcher().connection_close.subscribe();
    println!("joined #{}; type to chat, /quit to leave", room.id());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            msg = messages.recv() => match msg {
                Some(msg) => {
                    println!("[{}] {}", msg.message.sender, msg.message.content);
                }
                None => break,
            },
            event = events.recv() => {
                if let Some((_, event)) = event {
                    match event {
                        RoomEvent::ParticipantJoined { name } => {
                            println!("* {name} joined");
                        }
                        RoomEvent::ParticipantLeft { name } => {
                            println!("* {name} left");
                        }
                    }
                }
            },
            close = closes.recv() => {
                if let Some(close) = close {
                    match close {
                        Some(frame) => println!(
                            "connection closed: {} ({})",
                            frame.reason, frame.code
                        ),
                        None => println!("connection closed"),
                    }
                }
                break;
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line == "/quit" {
                        break;
                    }
                    if !line.is_empty() {
                        room.send(line).await?;
                    }
                }
                _ => break,
            },
        }
    }

    session.disconnect().await?;
    Ok(())
}
