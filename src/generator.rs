use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_DENSITY, DEFAULT_MIN_DENSITY, MAX_GRID_SIDE, MIN_GRID_SIDE,
    SCRAMBLE_ATTEMPT_CHOICES, SCRAMBLE_MAX_MOVES, SCRAMBLE_MIN_MOVES, SLASH_ROTATION_CHOICES,
    TRIANGLE_ROTATION_CHOICES,
};
use crate::engine::Game;
use crate::error::{PuzzleError, Result};
use crate::grid::Grid;
use crate::rng::Rng;
use crate::search::calc_min;
use crate::types::{Cell, Direction, ElementKind, Entity, GenerationEvent, Tile, TileMask, Vec2};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    pub mask: TileMask,
    pub min_density: f64,
    pub max_density: f64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            mask: TileMask::default(),
            min_density: DEFAULT_MIN_DENSITY,
            max_density: DEFAULT_MAX_DENSITY,
        }
    }
}

/// Collects generation decisions for the caller to report.
#[derive(Clone, Debug, Default)]
pub struct GenerationLog {
    attempts: u32,
    events: Vec<GenerationEvent>,
}

impl GenerationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub(crate) fn push(&mut self, event: GenerationEvent) {
        self.events.push(event);
    }

    /// Number of grids drawn so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn events(&self) -> &[GenerationEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GenerationEvent> {
        std::mem::take(&mut self.events)
    }
}

/// A BFS-scored puzzle before its goal is stamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedPuzzle {
    pub grid: Grid,
    pub start: Vec2,
    pub goal: Vec2,
    pub depth: usize,
    /// `UDLR` instructions of one shortest impulse sequence reaching `goal`.
    pub solution: String,
}

impl GeneratedPuzzle {
    /// Seed-search score: depth minus the number of placed elements, so
    /// sparse deep puzzles rank highest.
    pub fn difficulty(&self) -> i64 {
        self.depth as i64 - self.grid.interior_occupied() as i64
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrambledPuzzle {
    pub grid: Grid,
    pub start: Vec2,
    pub goal: Vec2,
}

/// A ready-to-play game with a star on its goal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleSetup {
    pub game: Game,
    pub goal: Vec2,
    pub min_moves: usize,
    pub solution: Option<String>,
}

pub(crate) fn validate_dimensions(width: i32, height: i32, min_side: i32) -> Result<()> {
    let valid = min_side..=MAX_GRID_SIDE;
    if !valid.contains(&width) || !valid.contains(&height) {
        return Err(PuzzleError::InvalidDimensions {
            width,
            height,
            min: min_side,
            max: MAX_GRID_SIDE,
        });
    }
    Ok(())
}

fn validate_density(min_density: f64, max_density: f64) -> Result<()> {
    if !min_density.is_finite()
        || !max_density.is_finite()
        || min_density < 0.0
        || min_density > max_density
    {
        return Err(PuzzleError::InvalidDensity {
            min: min_density.to_string(),
            max: max_density.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn random_direction(rng: &mut Rng) -> Direction {
    match rng.pick_index(Direction::ALL.len()) {
        0 => Direction::Up,
        1 => Direction::Down,
        2 => Direction::Left,
        _ => Direction::Right,
    }
}

fn random_element(kind: ElementKind, rng: &mut Rng) -> Cell {
    match kind {
        ElementKind::Wall => Cell::with_tile(Tile::Wall),
        ElementKind::Ball => Cell::with_entity(Entity::Ball),
        ElementKind::Triangle => {
            let mut tile = Tile::Triangle {
                facing: Direction::Up,
            };
            let turns = rng.choice(&TRIANGLE_ROTATION_CHOICES).copied().unwrap_or(0);
            for _ in 0..turns {
                tile.rotate();
            }
            Cell::with_tile(tile)
        }
        ElementKind::Slash => {
            let mut tile = Tile::Slash { facing_up: true };
            let turns = rng.choice(&SLASH_ROTATION_CHOICES).copied().unwrap_or(0);
            for _ in 0..turns {
                tile.rotate();
            }
            Cell::with_tile(tile)
        }
        ElementKind::Hole => Cell::with_tile(Tile::hole()),
        ElementKind::Grate => Cell::with_tile(Tile::Grate),
    }
}

/// Scatters random elements over a bordered grid and picks a start cell.
pub fn generate_grid(
    width: i32,
    height: i32,
    rng: &mut Rng,
    mask: &TileMask,
    min_density: f64,
    max_density: f64,
) -> Result<(Grid, Vec2)> {
    validate_dimensions(width, height, MIN_GRID_SIDE)?;
    validate_density(min_density, max_density)?;
    let kinds = mask.enabled_kinds();
    if kinds.is_empty() {
        return Err(PuzzleError::EmptyTileMask);
    }

    let mut grid = Grid::empty_bordered(width, height);
    let element_count =
        rng.rand(min_density, max_density) * ((width - 1) * (height - 1)) as f64;
    let mut empty = grid.empty_spaces();
    rng.shuffle(&mut empty);

    for _ in 0..element_count.ceil() as usize {
        let Some(spot) = empty.pop() else {
            break;
        };
        let kind = *rng.choice(&kinds).ok_or(PuzzleError::EmptyTileMask)?;
        let cell = random_element(kind, rng);
        grid.set_cell(spot, cell)?;
    }

    let start = empty.pop().ok_or(PuzzleError::NoValidStart)?;
    Ok((grid, start))
}

/// Scrambles a fresh grid with a short random walk and picks a goal from
/// the cells crossed by one last random impulse.
pub fn create_puzzle(
    width: i32,
    height: i32,
    rng: &mut Rng,
    options: &GeneratorOptions,
) -> Result<ScrambledPuzzle> {
    let (grid, start) = generate_grid(
        width,
        height,
        rng,
        &options.mask,
        options.min_density,
        options.max_density,
    )?;
    let mut game = Game::new_game(grid.clone(), start)?;

    let walk = rng.rand_int(SCRAMBLE_MIN_MOVES, SCRAMBLE_MAX_MOVES);
    for _ in 0..walk {
        let dir = random_direction(rng);
        game.blob_impulse(dir)?;
    }

    let mut ends = vec![game.blob_pos()];
    let dir = random_direction(rng);
    let impulse = game.blob_impulse(dir)?;
    ends.extend(impulse.blob_path());
    let goal = rng.choice(&ends).copied().unwrap_or(start);

    Ok(ScrambledPuzzle { grid, start, goal })
}

/// Number of scrambles tried when the caller does not choose; the draw is
/// the first value taken from the seed's stream.
pub(crate) fn draw_scramble_attempts(rng: &mut Rng) -> u32 {
    rng.choice(&SCRAMBLE_ATTEMPT_CHOICES)
        .copied()
        .unwrap_or(SCRAMBLE_ATTEMPT_CHOICES[0])
}

/// Keeps the hardest of several scrambled puzzles drawn from `seed`. With
/// `attempts` unset the count itself comes from the seed.
pub fn setup_game(
    width: i32,
    height: i32,
    seed: &str,
    attempts: Option<u32>,
    options: &GeneratorOptions,
    log: &mut GenerationLog,
) -> Result<PuzzleSetup> {
    let mut rng = Rng::from_seed_str(seed);
    let attempts = match attempts {
        Some(attempts) => attempts,
        None => draw_scramble_attempts(&mut rng),
    };
    let mut best: Option<(ScrambledPuzzle, usize)> = None;
    for _ in 0..attempts.max(1) {
        let attempt = log.begin_attempt();
        let puzzle = create_puzzle(width, height, &mut rng, options)?;
        let moves = calc_min(&puzzle.grid, puzzle.start, puzzle.goal)?;
        let improves = match &best {
            Some((_, best_moves)) => moves > *best_moves,
            None => true,
        };
        if improves {
            log.push(GenerationEvent::GoalSelected {
                attempt,
                goal: puzzle.goal,
                depth: moves,
                solution: String::new(),
            });
            best = Some((puzzle, moves));
        }
    }

    let (puzzle, min_moves) = best.ok_or(PuzzleError::NoValidStart)?;
    let mut grid = puzzle.grid;
    grid.set_tile(puzzle.goal, Some(Tile::Star))?;
    Ok(PuzzleSetup {
        game: Game::new_game(grid, puzzle.start)?,
        goal: puzzle.goal,
        min_moves,
        solution: None,
    })
}
