use tokio::sync::watch;

mod pomodoro;
mod scheduler;
mod ws;

use pomodoro::pomodoro::{
    Display, LONG_BREAK_SECONDS, PomodoroController, SHORT_BREAK_SECONDS, WORK_SECONDS,
    create_command_channel, run_controller,
};
use scheduler::scheduler::TokioScheduler;

const WS_ADDR: &str = "127.0.0.1:7878";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let verbose = args.contains(&"--verbose".to_string()) || args.contains(&"-v".to_string());

    // Check for log file argument
    let log_file = if let Some(pos) = args.iter().position(|a| a == "--log" || a == "-l") {
        args.get(pos + 1).cloned()
    } else {
        Some(format!(
            "{}/.local/share/tomatod/activity.log",
            std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
        ))
    };

    // Create log directory if needed
    if let Some(ref path) = log_file {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("🍅 Tomatod - Pomodoro Timer Daemon");
    println!("==================================");
    println!(
        "Intervals: {}min work / {}min break / {}min long break",
        WORK_SECONDS / 60,
        SHORT_BREAK_SECONDS / 60,
        LONG_BREAK_SECONDS / 60
    );
    println!("Long break after every 4th work session");
    println!("WebSocket server on ws://{}", WS_ADDR);
    println!("Control frames: {{\"type\": \"start\"}} and {{\"type\": \"reset\"}}");
    if verbose {
        println!("Verbose mode: ON");
    }
    if let Some(ref path) = log_file {
        println!("Logging to: {}", path);
    }
    println!();

    let (command_tx, command_rx) = create_command_channel();
    let (display_tx, display_rx) = watch::channel(Display::idle());

    let ws_addr = WS_ADDR.parse()?;
    let ws_command_tx = command_tx.clone();
    let ws_display_rx = display_rx.clone();
    tokio::spawn(async move {
        if let Err(e) =
            ws::websocket_server::start_websocket_server(ws_addr, ws_command_tx, ws_display_rx)
                .await
        {
            eprintln!("WebSocket server error: {}", e);
        }
    });

    let controller =
        PomodoroController::new(TokioScheduler, command_tx, display_tx, log_file, verbose);
    run_controller(controller, command_rx).await;

    Ok(())
}
