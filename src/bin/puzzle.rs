use bounce_puzzle::constants::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use bounce_puzzle::error::PuzzleError;
use bounce_puzzle::generator::{setup_game, GenerationLog, GeneratorOptions, PuzzleSetup};
use bounce_puzzle::rng::Rng;
use bounce_puzzle::search::{create_puzzle_bfs, setup_game_bfs};
use bounce_puzzle::types::{moves_to_string, parse_moves, GenerationEvent, TileMask, Vec2};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Random search seeds are decimal strings below this bound.
const SEARCH_SEED_SPAN: u64 = 100_000_000_000_000;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Identifier stamped on every log line.
    #[arg(long, global = true)]
    run_id: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Builds a BFS-scored puzzle and prints it with its solution.
    Generate {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(long)]
        seed: Option<String>,
    },
    /// Builds the hardest of several scrambled puzzles.
    Scramble {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(long)]
        seed: Option<String>,
        /// Scrambles to try; drawn from the seed when omitted.
        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Regenerates a puzzle and plays a `UDLR` move string on it.
    Replay {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long)]
        moves: String,
        /// Replays the scrambled puzzle instead of the BFS one.
        #[arg(long)]
        scramble: bool,
        #[arg(long, requires = "scramble")]
        attempts: Option<u32>,
    },
    /// Samples random seeds and reports each one at least as hard as the best
    /// so far, scoring depth minus placed elements.
    Search {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(long, default_value_t = 100)]
        count: u32,
    },
}

#[derive(Args, Debug, Clone)]
struct PuzzleArgs {
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: i32,
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: i32,
    /// Six 0/1 flags: wall, ball, triangle, slash, hole, grate.
    #[arg(long)]
    mask: Option<String>,
    #[arg(long)]
    min_density: Option<f64>,
    #[arg(long)]
    max_density: Option<f64>,
    /// JSON file holding generator options.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Which generator builds the puzzle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variant {
    Bfs,
    Scramble { attempts: Option<u32> },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: String, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<String>,
    details: Value,
}

#[derive(Clone, Debug, Serialize)]
struct PuzzleResultLine {
    seed: String,
    width: i32,
    height: i32,
    start: Vec2,
    goal: Vec2,
    #[serde(rename = "minMoves")]
    min_moves: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<String>,
    attempts: u32,
    grid: String,
}

#[derive(Clone, Debug, Serialize)]
struct SearchResultLine {
    seed: String,
    difficulty: i64,
    depth: usize,
    elements: usize,
    start: Vec2,
    goal: Vec2,
    solution: String,
}

#[derive(Clone, Debug, Serialize)]
struct ReplayResultLine {
    seed: String,
    moves: String,
    #[serde(rename = "blobPos")]
    blob_pos: Vec2,
    solved: bool,
}

fn main() {
    let cli = Cli::parse();
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(now_ms()));

    let outcome = match &cli.command {
        Command::Generate { puzzle, seed } => {
            run_generate(&run_id, puzzle, seed.clone(), Variant::Bfs)
        }
        Command::Scramble {
            puzzle,
            seed,
            attempts,
        } => run_generate(
            &run_id,
            puzzle,
            seed.clone(),
            Variant::Scramble {
                attempts: *attempts,
            },
        ),
        Command::Replay {
            puzzle,
            seed,
            moves,
            scramble,
            attempts,
        } => {
            let variant = if *scramble {
                Variant::Scramble {
                    attempts: *attempts,
                }
            } else {
                Variant::Bfs
            };
            run_replay(&run_id, puzzle, seed.clone(), moves, variant)
        }
        Command::Search { puzzle, count } => run_search(&run_id, puzzle, *count),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            emit_log(
                "error",
                "run_failed",
                &run_id,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    }
}

fn run_generate(
    run_id: &str,
    args: &PuzzleArgs,
    seed: Option<String>,
    variant: Variant,
) -> Result<bool, CliError> {
    let seed = seed.unwrap_or_else(default_seed);
    let options = resolve_options(args)?;
    let (setup, log) = build_setup(run_id, args, &seed, variant, &options)?;

    println!("{}", setup.game.grid().render_with_axes());
    let line = PuzzleResultLine {
        seed,
        width: args.width,
        height: args.height,
        start: setup.game.blob_pos(),
        goal: setup.goal,
        min_moves: setup.min_moves,
        solution: setup.solution.clone(),
        attempts: log.attempts(),
        grid: setup.game.serialize(),
    };
    println!("{}", to_json_line(&line));
    Ok(true)
}

fn run_replay(
    run_id: &str,
    args: &PuzzleArgs,
    seed: Option<String>,
    moves: &str,
    variant: Variant,
) -> Result<bool, CliError> {
    let seed = seed.unwrap_or_else(default_seed);
    let options = resolve_options(args)?;
    let moves = parse_moves(moves)?;
    let (setup, _) = build_setup(run_id, args, &seed, variant, &options)?;
    let mut game = setup.game;

    println!("{}", game.grid().render_with_axes());
    for (index, dir) in moves.iter().enumerate() {
        let impulse = game.blob_impulse(*dir)?;
        println!();
        println!("{} {} pushed={}", index + 1, dir.letter(), impulse.pushed);
        println!("{}", game.grid().render_with_axes());
    }

    let solved = game.is_solved();
    emit_log(
        if solved { "info" } else { "warn" },
        "replay_finished",
        run_id,
        Some(&seed),
        json!({
            "moves": moves.len(),
            "minMoves": setup.min_moves,
            "solved": solved,
        }),
    );
    let line = ReplayResultLine {
        seed,
        moves: moves_to_string(&moves),
        blob_pos: game.blob_pos(),
        solved,
    };
    println!("{}", to_json_line(&line));
    Ok(solved)
}

fn run_search(run_id: &str, args: &PuzzleArgs, count: u32) -> Result<bool, CliError> {
    let options = resolve_options(args)?;
    let mut best = 0i64;
    for _ in 0..count {
        let seed = rand::random_range(0..SEARCH_SEED_SPAN).to_string();
        let mut log = GenerationLog::new();
        let mut rng = Rng::from_seed_str(&seed);
        let puzzle = create_puzzle_bfs(args.width, args.height, &mut rng, &options, &mut log)?;
        let difficulty = puzzle.difficulty();
        if difficulty < best {
            continue;
        }
        best = difficulty;
        emit_log(
            "info",
            "seed_improved",
            run_id,
            Some(&seed),
            json!({
                "difficulty": difficulty,
                "depth": puzzle.depth,
                "attempts": log.attempts(),
            }),
        );
        let line = SearchResultLine {
            seed,
            difficulty,
            depth: puzzle.depth,
            elements: puzzle.grid.interior_occupied(),
            start: puzzle.start,
            goal: puzzle.goal,
            solution: puzzle.solution,
        };
        println!("{}", to_json_line(&line));
    }
    emit_log(
        "info",
        "search_finished",
        run_id,
        None,
        json!({ "count": count, "bestDifficulty": best }),
    );
    Ok(true)
}

fn build_setup(
    run_id: &str,
    args: &PuzzleArgs,
    seed: &str,
    variant: Variant,
    options: &GeneratorOptions,
) -> Result<(PuzzleSetup, GenerationLog), CliError> {
    let attempts = match variant {
        Variant::Bfs => None,
        Variant::Scramble { attempts } => attempts,
    };
    emit_log(
        "info",
        "generation_started",
        run_id,
        Some(seed),
        json!({
            "width": args.width,
            "height": args.height,
            "options": options,
            "scramble": variant != Variant::Bfs,
            "attempts": attempts,
        }),
    );
    let mut log = GenerationLog::new();
    let setup = match variant {
        Variant::Bfs => setup_game_bfs(args.width, args.height, seed, options, &mut log),
        Variant::Scramble { attempts } => {
            setup_game(args.width, args.height, seed, attempts, options, &mut log)
        }
    };
    for event in log.drain_events() {
        emit_generation_event(run_id, seed, &event);
    }
    let setup = setup?;
    emit_log(
        "info",
        "generation_finished",
        run_id,
        Some(seed),
        json!({
            "attempts": log.attempts(),
            "goal": setup.goal,
            "minMoves": setup.min_moves,
        }),
    );
    Ok((setup, log))
}

fn resolve_options(args: &PuzzleArgs) -> Result<GeneratorOptions, CliError> {
    let mut options = match args.config.as_deref() {
        Some(path) => load_options(path)?,
        None => GeneratorOptions::default(),
    };
    if let Some(mask) = args.mask.as_deref() {
        options.mask = mask.parse::<TileMask>()?;
    }
    if let Some(min_density) = args.min_density {
        options.min_density = min_density;
    }
    if let Some(max_density) = args.max_density {
        options.max_density = max_density;
    }
    Ok(options)
}

fn load_options(path: &Path) -> Result<GeneratorOptions, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

fn emit_generation_event(run_id: &str, seed: &str, event: &GenerationEvent) {
    let details = serde_json::to_value(event).unwrap_or(Value::Null);
    let name = details
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("generation_event")
        .to_string();
    emit_log(generation_event_level(event), &name, run_id, Some(seed), details);
}

fn generation_event_level(event: &GenerationEvent) -> &'static str {
    match event {
        GenerationEvent::GoalSelected { .. } => "info",
        GenerationEvent::ThresholdExhausted { .. } | GenerationEvent::GoalOccupiedAtSetup { .. } => {
            "warn"
        }
        _ => "debug",
    }
}

fn emit_log(level: &str, event: &str, run_id: &str, seed: Option<&str>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        seed: seed.map(|value| value.to_string()),
        details,
    };
    eprintln!("{}", to_json_line(&log_line));
}

fn to_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|error| {
        json!({ "level": "error", "event": "serialize_failed", "error": error.to_string() })
            .to_string()
    })
}

/// Today's date as `dd/mm/yyyy`, the seed of the daily puzzle.
fn default_seed() -> String {
    Local::now().format("%d/%m/%Y").to_string()
}

fn default_run_id(timestamp_ms: u64) -> String {
    format!("puzzle-{timestamp_ms}")
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn puzzle_args() -> PuzzleArgs {
        PuzzleArgs {
            width: 8,
            height: 8,
            mask: None,
            min_density: None,
            max_density: None,
            config: None,
        }
    }

    #[test]
    fn default_seed_is_a_calendar_date() {
        let seed = default_seed();
        let parts: Vec<&str> = seed.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn flags_override_defaults() {
        let mut args = puzzle_args();
        args.mask = Some("100001".to_string());
        args.max_density = Some(0.3);
        let options = resolve_options(&args).expect("valid flags");
        assert!(options.mask.wall);
        assert!(!options.mask.ball);
        assert!(options.mask.grate);
        assert_eq!(options.max_density, 0.3);
        assert_eq!(options.min_density, GeneratorOptions::default().min_density);
    }

    #[test]
    fn bad_mask_is_reported() {
        let mut args = puzzle_args();
        args.mask = Some("10".to_string());
        assert!(matches!(
            resolve_options(&args),
            Err(CliError::Puzzle(PuzzleError::InvalidTileMask(_)))
        ));
    }

    #[test]
    fn config_file_is_loaded_and_flags_win() {
        let path = std::env::temp_dir().join(format!("bounce-puzzle-config-{}.json", now_ms()));
        std::fs::write(&path, r#"{"minDensity":0.1,"maxDensity":0.15}"#).expect("write config");
        let mut args = puzzle_args();
        args.config = Some(path.clone());
        args.max_density = Some(0.25);
        let options = resolve_options(&args).expect("config loads");
        let _ = std::fs::remove_file(&path);
        assert_eq!(options.min_density, 0.1);
        assert_eq!(options.max_density, 0.25);
    }

    #[test]
    fn missing_config_is_a_read_error() {
        let mut args = puzzle_args();
        args.config = Some(PathBuf::from("/nonexistent/bounce-puzzle.json"));
        assert!(matches!(
            resolve_options(&args),
            Err(CliError::ConfigRead { .. })
        ));
    }

    #[test]
    fn generation_events_take_their_tag_as_name() {
        let event = GenerationEvent::ThresholdLowered {
            attempt: 2,
            depth: 6,
        };
        let details = serde_json::to_value(&event).expect("event serializes");
        assert_eq!(details["type"], "threshold_lowered");
        assert_eq!(generation_event_level(&event), "debug");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "bounce-puzzle",
            "replay",
            "--seed",
            "01/02/2024",
            "--moves",
            "UDLR",
            "--width",
            "12",
        ])
        .expect("valid arguments");
        match cli.command {
            Command::Replay {
                puzzle,
                seed,
                moves,
                scramble,
                attempts,
            } => {
                assert_eq!(puzzle.width, 12);
                assert_eq!(puzzle.height, DEFAULT_HEIGHT);
                assert_eq!(seed.as_deref(), Some("01/02/2024"));
                assert_eq!(moves, "UDLR");
                assert!(!scramble);
                assert_eq!(attempts, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn scramble_attempts_are_optional() {
        let cli = Cli::try_parse_from(["bounce-puzzle", "scramble", "--seed", "s"])
            .expect("valid arguments");
        assert!(matches!(
            cli.command,
            Command::Scramble { attempts: None, .. }
        ));

        let replay_without_scramble = Cli::try_parse_from([
            "bounce-puzzle",
            "replay",
            "--moves",
            "U",
            "--attempts",
            "3",
        ]);
        assert!(replay_without_scramble.is_err());
    }

    #[test]
    fn small_grids_fail_instead_of_hanging() {
        let mut args = puzzle_args();
        args.width = 4;
        args.height = 4;
        let options = resolve_options(&args).expect("default options");
        let outcome = build_setup("test", &args, "x", Variant::Bfs, &options);
        assert!(matches!(
            outcome,
            Err(CliError::Puzzle(PuzzleError::InvalidDimensions { .. }))
        ));
    }
}
