use std::io::{self, BufRead};

use clap::Parser;
use console::style;
use serde_json::json;
use ws_lobby::{ClientConfig, ConnectionManager, Message};

/// wl_console - interactive lobby client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Coordinator URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws/game")]
    url: String,

    /// Display name
    #[arg(short, long, default_value = "console-player")]
    name: String,
}

fn print_event(message: &Message) {
    match message {
        Message::Connected(p) => {
            println!("{} id {}", style("connected").green(), p.id);
        }
        Message::RoomCreated(p) => {
            println!(
                "{} code {} (share it with your opponent)",
                style("room created").green(),
                style(p.room_id.as_str()).cyan().bold()
            );
        }
        Message::RoomJoined(p) => {
            println!(
                "{} {} hosted by {}",
                style("joined room").green(),
                style(p.room_id.as_str()).cyan().bold(),
                p.host
            );
        }
        Message::PlayerJoined(p) => {
            println!("{} {}", style("guest arrived:").green(), p.guest);
        }
        Message::ReadyAcknowledged(p) => {
            println!(
                "ready acknowledged (host {}, guest {})",
                p.host_ready, p.guest_ready
            );
        }
        Message::PlayerReadyUpdate(p) => {
            println!(
                "{} is ready (host {}, guest {})",
                p.player, p.host_ready, p.guest_ready
            );
        }
        Message::GameStart(p) => {
            println!(
                "{} {} vs {} (you are {})",
                style("game on!").yellow().bold(),
                p.host_name,
                p.guest_name,
                if p.is_host { "host" } else { "guest" }
            );
        }
        Message::GameUpdate(data) => {
            println!("{} {}", style("update:").dim(), data);
        }
        Message::GameRestart(p) => {
            println!(
                "{} requested by {}",
                style("game restarting").yellow(),
                p.requested_by
            );
        }
        Message::PlayerLeft(p) => {
            println!("{} {}", style("player left:").red(), p.message);
        }
        Message::Error(p) => {
            println!("{} {}", style("error:").red().bold(), p.message);
        }
        Message::JoinTimeout(p) => {
            println!(
                "{} no answer for room {}",
                style("join timed out:").red(),
                p.room_id
            );
        }
        _ => {}
    }
}

fn print_help() {
    println!("Commands:");
    println!("  c          - Create a room");
    println!("  j <code>   - Join a room");
    println!("  r          - Mark yourself ready");
    println!("  s <text>   - Send a game update to your peer");
    println!("  x          - Request a restart");
    println!("  m          - Show local session mirror");
    println!("  q          - Quit");
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let manager = ConnectionManager::websocket(ClientConfig::new().with_url(args.url.clone()));
    let _events = manager.on_any(print_event);

    println!("=== wl_console - lobby client ===");
    println!("Coordinator: {}", args.url);
    if !manager.connect().await {
        anyhow::bail!("could not reach the coordinator at {}", args.url);
    }
    manager.set_player_name(&args.name);
    println!("Name: {}", args.name);
    print_help();
    println!();

    // Channel carrying parsed stdin lines out of the blocking reader
    let (line_tx, line_rx) = flume::unbounded::<String>();
    let stdin_task = tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    while let Ok(line) = line_rx.recv_async().await {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        match command {
            "c" => {
                manager.create_room();
            }
            "j" => {
                if rest.is_empty() {
                    println!("usage: j <code>");
                } else {
                    manager.join_room(rest);
                }
            }
            "r" => {
                manager.set_ready();
            }
            "s" => {
                manager.send_game_update(json!({ "chat": rest }));
            }
            "x" => {
                manager.request_restart();
            }
            "m" => {
                println!("{:#?}", manager.mirror());
            }
            "q" => break,
            "" => {}
            _ => print_help(),
        }
    }

    manager.disconnect();
    stdin_task.abort();
    let _ = stdin_task.await;
    println!("Goodbye!");
    Ok(())
}
