use super::LaunchArgs;
use clap::Args;
use coinflip_core::{FlipRecord, GameConfig, SceneEvent, Session, View, WsConnector};
use comfy_table::{presets::UTF8_FULL, Table};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Coordinator WebSocket URL (ws:// or wss://)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Play locally without contacting the coordinator
    #[arg(long)]
    pub offline: bool,
}

pub async fn play(args: PlayArgs, mut config: GameConfig) -> anyhow::Result<()> {
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if args.offline {
        config.offline_only = true;
    }

    let context = args.launch.context();
    let mut session = Session::launch(&config, &context, Arc::new(WsConnector))?;

    let identity = session.scene().identity();
    println!("Player {} in room {}", identity.player_id, identity.room);
    println!("Press Enter (or type 'f') to flip, 'q' to quit.");
    println!();

    tokio::spawn(read_input(session.controls()));

    let mut last = session.scene().view();
    render(None, &last);

    while let Some(view) = session.step().await {
        render(Some(&last), &view);
        last = view;
    }

    print_history(session.scene().history());
    Ok(())
}

async fn read_input(controls: UnboundedSender<SceneEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(event) => event,
                None => {
                    println!("Unknown command '{}'. Enter/'f' flips, 'q' quits.", line.trim());
                    continue;
                }
            },
            Ok(None) => SceneEvent::Shutdown,
            Err(e) => {
                tracing::warn!("Failed to read input: {}", e);
                SceneEvent::Shutdown
            }
        };

        let stop = event == SceneEvent::Shutdown;
        if controls.send(event).is_err() || stop {
            break;
        }
    }
}

fn parse_command(line: &str) -> Option<SceneEvent> {
    match line.trim().to_lowercase().as_str() {
        "" | "f" | "flip" => Some(SceneEvent::FlipPressed),
        "q" | "quit" | "exit" => Some(SceneEvent::Shutdown),
        _ => None,
    }
}

/// Print whatever changed since the previous view
fn render(previous: Option<&View>, view: &View) {
    if previous.map_or(true, |p| p.status != view.status) {
        println!(">> {}", view.status);
    }

    let was_spinning = previous.map_or(false, |p| p.coin_spinning);
    if view.coin_spinning && !was_spinning {
        println!("   The coin is spinning...");
    }

    if let Some(face) = view.coin_face {
        if previous.map_or(true, |p| p.coin_face != view.coin_face) {
            println!("   The coin lands on {}", face);
        }
    }

    if view.flip_enabled && !previous.map_or(false, |p| p.flip_enabled) {
        println!("   [ {} ]", view.button_label);
    }
}

fn print_history(history: &[FlipRecord]) {
    if history.is_empty() {
        println!("No flips this session.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Flipper", "Result", "Time"]);

    for (index, record) in history.iter().enumerate() {
        let flipper = if record.by_me {
            "you".to_string()
        } else {
            record.flipper.to_string()
        };

        table.add_row(vec![
            (index + 1).to_string(),
            flipper,
            record.outcome.to_string(),
            record.timestamp.format("%H:%M:%S").to_string(),
        ]);
    }

    println!();
    println!("Session flips:");
    println!("{}", table);
}
