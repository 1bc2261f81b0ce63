use anyhow::{Context, Result};
use clap::Parser;
use cozy_chess::{Color, File, Piece, Rank, Square};
use matchline::opponent::process::ProcessLauncher;
use matchline::{Difficulty, FileStore, MatchError, MatchEvent, MatchSession, Persistence, PlayedMove, Position, Side, SkillTable};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Play chess against a UCI engine", long_about = None)]
struct Args {
    /// UCI engine executable (default: $MATCHLINE_ENGINE, then "stockfish")
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Extra argument for the engine; repeatable
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// easy, intermediate, hard or expert
    #[arg(long, default_value = "intermediate")]
    difficulty: String,

    /// Your color: 'w' for white, 'b' for black
    #[arg(long, default_value = "w")]
    side: String,

    /// Where the match is saved (default: $MATCHLINE_STATE_DIR, then .matchline)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// JSON skill table replacing the built-in one
    #[arg(long)]
    skills: Option<PathBuf>,

    /// How long to wait for each engine reply
    #[arg(long, default_value_t = 30_000)]
    reply_timeout_ms: u64,
}

fn env_path(name: &str) -> Option<PathBuf> { std::env::var_os(name).map(PathBuf::from) }

fn piece_char(piece: Piece, color: Color) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    if color == Color::White { c.to_ascii_uppercase() } else { c }
}

fn print_board(pos: &Position) {
    let board = pos.board();
    println!();
    for &rank in Rank::ALL.iter().rev() {
        let mut row = String::new();
        for &file in File::ALL.iter() {
            let sq = Square::new(file, rank);
            let c = match (board.piece_on(sq), board.color_on(sq)) {
                (Some(p), Some(col)) => piece_char(p, col),
                _ => '.',
            };
            row.push(c);
            row.push(' ');
        }
        println!("{} {}", rank as u8 + 1, row);
    }
    println!("  a b c d e f g h");
}

fn read_input(msg: &str) -> Result<Option<String>> {
    print!("{msg}");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 { return Ok(None); }
    Ok(Some(input.trim().to_string()))
}

// The core only reports what a change costs; asking is the host's job.
fn confirm_discard<S: matchline::KvStore>(session: &MatchSession<S>) -> Result<bool> {
    if !session.would_discard() { return Ok(true); }
    let answer = read_input("This abandons the current game. Continue? [y/N] ")?;
    Ok(matches!(answer.as_deref(), Some("y") | Some("Y") | Some("yes")))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let difficulty: Difficulty = args.difficulty.parse()?;
    let side: Side = args.side.parse()?;
    let skills = match &args.skills {
        Some(p) => SkillTable::from_file(p)?,
        None => SkillTable::default(),
    };
    let engine = args.engine.or_else(|| env_path("MATCHLINE_ENGINE")).unwrap_or_else(|| PathBuf::from("stockfish"));
    let state_dir = args.state_dir.or_else(|| env_path("MATCHLINE_STATE_DIR")).unwrap_or_else(|| PathBuf::from(".matchline"));
    let launcher = args.engine_args.iter().fold(ProcessLauncher::new(&engine), |l, a| l.arg(a.as_str()));

    let persistence = Persistence::new(FileStore::new(&state_dir));
    let mut session = MatchSession::open(persistence, Box::new(launcher), skills, difficulty, side)
        .with_context(|| format!("starting engine {}", engine.display()))?;
    session.set_listener(|event| match event {
        MatchEvent::OpponentMoved(p) => {
            if let Some(m) = p.last_move() { println!("Computer plays: {m}"); }
        }
        MatchEvent::OpponentHasNoMove => println!("Computer has no move. Type 'retry' to ask again."),
        MatchEvent::GameOver(o) => println!("\nGame over: {o}"),
    });
    let cfg = session.config();
    println!("Playing {} at {} difficulty. Commands: undo, redo, moves, new, resign, retry, difficulty <tier>, side <w|b>, quit", cfg.side, cfg.difficulty);

    let timeout = Duration::from_millis(args.reply_timeout_ms);
    loop {
        if session.awaiting_opponent() {
            println!("Thinking...");
            match session.wait_for_opponent(timeout) {
                Ok(events) if !events.is_empty() => continue,
                Ok(_) => println!("No reply from the engine within {timeout:?}."),
                Err(e) => println!("Engine problem: {e}. Type 'retry' to restart it."),
            }
        }

        print_board(session.current());
        if session.ledger().at_end() {
            if let Some(o) = session.outcome() { println!("Final: {o}"); }
        } else {
            println!("Reviewing move {} of {}", session.ledger().cursor() - 1, session.ledger().len() - 1);
        }

        let Some(input) = read_input("> ")? else { break };
        let mut words = input.split_whitespace();
        let res = match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("quit"), _) => break,
            (Some("undo"), _) => {
                if !session.undo() { println!("Nothing to undo."); }
                Ok(())
            }
            (Some("redo"), _) => session.redo().map(|moved| if !moved { println!("Nothing to redo."); }),
            (Some("moves"), _) => {
                let moves: Vec<String> = session.history().iter().map(PlayedMove::to_string).collect();
                println!("{}", if moves.is_empty() { "(no moves)".to_string() } else { moves.join(" ") });
                Ok(())
            }
            (Some("resign"), _) => {
                session.resign();
                println!("You resigned. Type 'new' for another game.");
                Ok(())
            }
            (Some("retry"), _) => session.retry_opponent().map(|asked| if !asked { println!("Nothing to retry."); }),
            (Some("new"), _) => {
                if confirm_discard(&session)? { session.new_game().map(drop) } else { Ok(()) }
            }
            (Some("difficulty"), Some(tier)) => match tier.parse::<Difficulty>() {
                Ok(d) if confirm_discard(&session)? => session.change_difficulty(d).map(drop),
                Ok(_) => Ok(()),
                Err(e) => { println!("{e}"); Ok(()) }
            },
            (Some("side"), Some(s)) => match s.parse::<Side>() {
                Ok(s) if confirm_discard(&session)? => session.change_side(s).map(drop),
                Ok(_) => Ok(()),
                Err(e) => { println!("{e}"); Ok(()) }
            },
            (Some(text), _) => match text.parse::<PlayedMove>() {
                Ok(mv) => session.player_move(mv.from, mv.to, mv.promotion).map(drop),
                Err(_) => { println!("Invalid move format! Use format like 'e2e4'"); Ok(()) }
            },
        };
        match res {
            Ok(()) => {}
            Err(MatchError::Move(e)) => println!("Illegal move! ({e})"),
            Err(MatchError::NotYourTurn) => println!("It is not your turn."),
            Err(MatchError::GameOver) => println!("The game is over. Type 'new' to play again."),
            Err(MatchError::Opponent(e)) => println!("Engine problem: {e}. Type 'retry' to restart it."),
        }
    }
    Ok(())
}
