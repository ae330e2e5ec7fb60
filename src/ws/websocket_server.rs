use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::pomodoro::pomodoro::{Command, CommandSender, Display};

/// Control frame sent by clients, e.g. {"type": "start"}.
#[derive(Debug, Deserialize, Clone)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct WebSocketResponse {
    pub success: bool,
    pub message: Option<String>,
}

pub async fn start_websocket_server(
    addr: SocketAddr,
    command_tx: CommandSender,
    display_rx: watch::Receiver<Display>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&addr).await?;
    println!("WebSocket server listening on: {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        println!("New WebSocket connection from: {}", peer_addr);
        let tx = command_tx.clone();
        let rx = display_rx.clone();
        tokio::spawn(handle_connection(stream, peer_addr, tx, rx));
    }

    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    command_tx: CommandSender,
    mut display_rx: watch::Receiver<Display>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed with {}: {}", peer_addr, e);
            return;
        }
    };

    println!("WebSocket handshake completed with {}", peer_addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // New clients get the current display right away instead of waiting for
    // the next change.
    let snapshot = display_rx.borrow_and_update().clone();
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            if let Err(e) = ws_sender.send(Message::Text(json)).await {
                eprintln!("Failed to send initial display to {}: {}", peer_addr, e);
                return;
            }
        }
        Err(e) => eprintln!("Failed to serialize display: {}", e),
    }

    loop {
        tokio::select! {
            changed = display_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = display_rx.borrow_and_update().clone();
                match serde_json::to_string(&snapshot) {
                    Ok(json) => {
                        if let Err(e) = ws_sender.send(Message::Text(json)).await {
                            eprintln!("Failed to push display update to {}: {}", peer_addr, e);
                            break;
                        }
                    }
                    Err(e) => eprintln!("Failed to serialize display: {}", e),
                }
            }
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = match serde_json::from_str::<ControlMessage>(&text) {
                            Ok(control) => {
                                println!(
                                    "[WebSocket] {} requested: {}",
                                    peer_addr, control.command
                                );
                                dispatch_control(&control.command, &command_tx)
                            }
                            Err(e) => {
                                eprintln!("Failed to parse message: {}", e);
                                WebSocketResponse {
                                    success: false,
                                    message: Some(format!("Parse error: {}", e)),
                                }
                            }
                        };

                        if let Ok(response_json) = serde_json::to_string(&response) {
                            if let Err(e) = ws_sender.send(Message::Text(response_json)).await {
                                eprintln!("Failed to send WebSocket response: {}", e);
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        println!("WebSocket connection closed by {}", peer_addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            eprintln!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        eprintln!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    println!("WebSocket connection with {} terminated", peer_addr);
}

/// Translate a control frame into a timer command. Anything else is rejected
/// without touching the timer.
fn dispatch_control(command: &str, command_tx: &CommandSender) -> WebSocketResponse {
    let parsed = match command {
        "start" => Command::Start,
        "reset" => Command::Reset,
        other => {
            return WebSocketResponse {
                success: false,
                message: Some(format!("Unknown command: {}", other)),
            };
        }
    };

    match command_tx.send(parsed) {
        Ok(()) => WebSocketResponse {
            success: true,
            message: Some("Command accepted".to_string()),
        },
        Err(_) => WebSocketResponse {
            success: false,
            message: Some("Timer is shutting down".to_string()),
        },
    }
}
