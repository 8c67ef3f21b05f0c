mod config;
mod view;

use std::sync::Arc;

use anyhow::Context;
use arbiter_client::{HttpArbiter, MoveAuthority, MoveEngine};
use chessdesk_common::{GameMode, PieceKind, PlayerSide, Square};
use chessdesk_session::{
    spawn_session, GameConfig, PromotionChoice, SessionEvent, SessionHandle,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use view::BoardView;

#[derive(Parser, Debug)]
#[command(
    name = "chessdesk",
    about = "Console chess client arbitrated by a remote authority service"
)]
struct Args {
    /// Arbiter service URL (also CHESSDESK_SERVER_URL)
    #[arg(long)]
    server_url: Option<String>,

    /// Play against the engine instead of hot-seat two-player
    #[arg(long)]
    vs_engine: bool,

    /// Side to play when facing the engine
    #[arg(long, value_enum, default_value = "white")]
    side: SideArg,

    /// Engine difficulty, forwarded to the engine verbatim
    #[arg(long, default_value_t = 3)]
    difficulty: u8,

    /// Directory for debug logs
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for PlayerSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Self::White,
            SideArg::Black => Self::Black,
        }
    }
}

/// Console chrome: the board view plus the last known turn for status text.
struct Console {
    board: BoardView,
    turn: PlayerSide,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    std::fs::create_dir_all(&args.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&args.log_dir, "chessdesk");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server_url = config::resolve_server_url(args.server_url.as_deref());
    tracing::info!(%server_url, "chessdesk starting");
    println!("chessdesk - arbiter at {server_url}");
    println!("Type a square to select or move, 'undo', 'new', 'help', 'quit'.");

    let arbiter = Arc::new(HttpArbiter::new(&server_url).context("bad arbiter URL")?);
    let authority: Arc<dyn MoveAuthority> = arbiter.clone();
    let engine: Arc<dyn MoveEngine> = arbiter;

    let game_config = GameConfig {
        mode: if args.vs_engine {
            GameMode::VsEngine {
                human_side: args.side.into(),
            }
        } else {
            GameMode::TwoPlayer
        },
        difficulty: args.difficulty,
        position: None,
    };

    let handle = spawn_session(game_config.clone(), authority, engine);
    let (snapshot, mut events) = handle.subscribe().await?;

    let mut console = Console {
        board: BoardView::new(),
        turn: snapshot.turn,
    };
    console.board.set_position(&snapshot.position);
    println!("{}", console.board.render());
    println!("{} to move", snapshot.turn);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => print_event(event, &mut console),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) => {
                        if !run_command(line.trim(), &handle, &mut console, &game_config).await? {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    handle.shutdown().await;
    tracing::info!("chessdesk exiting");
    Ok(())
}

fn print_event(event: SessionEvent, console: &mut Console) {
    match event {
        SessionEvent::StateChanged(snapshot) => {
            console.board.set_position(&snapshot.position);
            console.turn = snapshot.turn;
            println!("{}", console.board.render());
            if !snapshot.is_over {
                let check = if snapshot.flags.check { " (check)" } else { "" };
                println!("{} to move{check}", snapshot.turn);
            }
        }
        SessionEvent::DestinationsHighlighted {
            square,
            destinations,
        } => {
            let names: Vec<String> = destinations.iter().map(|sq| sq.to_string()).collect();
            println!("{square}: {}", names.join(" "));
        }
        SessionEvent::SelectionCleared => {}
        SessionEvent::PromotionRequested(prompt) => {
            println!(
                "Promotion on {}: pick q, r, b or n ('x' keeps the queen)",
                prompt.to
            );
        }
        SessionEvent::MoveLogAppended(record) => {
            let promo = record
                .promotion
                .map(|p| format!("={p}"))
                .unwrap_or_default();
            println!("{}: {}{}{}", record.mover, record.from, record.to, promo);
        }
        SessionEvent::GameOverAnnounced(flags) => {
            // The side to move at the end is the one without a move.
            match flags.outcome_text(console.turn) {
                Some(text) => println!("Game over: {text}"),
                None => println!("Game over"),
            }
        }
        SessionEvent::UndoAvailabilityChanged(_) => {}
        SessionEvent::EngineThinking(true) => println!("Engine is thinking..."),
        SessionEvent::EngineThinking(false) => {}
        SessionEvent::TransientMessage(text) => println!("! {text}"),
    }
}

async fn run_command(
    line: &str,
    handle: &SessionHandle,
    console: &mut Console,
    game_config: &GameConfig,
) -> anyhow::Result<bool> {
    match line {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "help" => {
            println!("  e2        select a piece / move to a highlighted square");
            println!("  undo      take back one move");
            println!("  new       start a fresh game with the same settings");
            println!("  q r b n   answer a promotion prompt");
            println!("  x         dismiss a promotion prompt (queen)");
            println!("  board     reprint the board");
            println!("  flip      turn the board around");
            println!("  quit      leave");
        }
        "board" => println!("{}", console.board.render()),
        "flip" => {
            console.board.flip();
            println!("{}", console.board.render());
        }
        "undo" => {
            // Failures surface as transient messages.
            let _ = handle.undo().await;
        }
        "new" => {
            handle.new_game(game_config.clone()).await?;
        }
        "x" => {
            let _ = handle.resolve_promotion(PromotionChoice::Dismiss).await;
        }
        "q" | "r" | "b" | "n" => {
            let kind = match line {
                "q" => PieceKind::Queen,
                "r" => PieceKind::Rook,
                "b" => PieceKind::Bishop,
                _ => PieceKind::Knight,
            };
            let _ = handle.resolve_promotion(PromotionChoice::Piece(kind)).await;
        }
        other => match Square::parse(other) {
            Some(square) => {
                let piece = console.board.occupant(square);
                handle.activate_square(square, piece).await?;
            }
            None => println!("? unrecognized command: {other} (try 'help')"),
        },
    }
    Ok(true)
}
