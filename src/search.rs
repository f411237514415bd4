use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::ControlFlow;

use crate::constants::{MAX_BFS_ATTEMPTS, MIN_ACCEPTABLE_DEPTH, MIN_BFS_GRID_SIDE};
use crate::engine::Game;
use crate::error::{PuzzleError, Result};
use crate::generator::{
    generate_grid, validate_dimensions, GeneratedPuzzle, GenerationLog, GeneratorOptions,
    PuzzleSetup,
};
use crate::grid::Grid;
use crate::rng::Rng;
use crate::types::{Direction, GenerationEvent, Tile, Vec2};

#[derive(Clone, Debug)]
struct Frontier {
    game: Game,
    depth: usize,
    trace: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reach {
    pub depth: usize,
    pub trace: String,
}

/// Shortest known impulse count to every position the blob has passed over,
/// kept in discovery order.
#[derive(Clone, Debug, Default)]
pub struct ReachMap {
    order: Vec<Vec2>,
    entries: HashMap<Vec2, Reach>,
}

impl ReachMap {
    /// Returns true the first time `pos` is seen.
    fn record(&mut self, pos: Vec2, depth: usize, trace: &str) -> bool {
        match self.entries.get_mut(&pos) {
            Some(existing) => {
                if depth < existing.depth {
                    existing.depth = depth;
                    existing.trace = trace.to_string();
                }
                false
            }
            None => {
                self.order.push(pos);
                self.entries.insert(
                    pos,
                    Reach {
                        depth,
                        trace: trace.to_string(),
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, pos: Vec2) -> Option<&Reach> {
        self.entries.get(&pos)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.entries
            .values()
            .map(|reach| reach.depth)
            .max()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vec2, &Reach)> + '_ {
        self.order
            .iter()
            .filter_map(|pos| self.entries.get(pos).map(|reach| (*pos, reach)))
    }
}

/// Breadth-first search over every configuration reachable from `start`,
/// recording the depth at which the blob first passes over each cell.
///
/// Stops early once every tile-free cell of `grid` has a distance.
pub fn explore(grid: &Grid, start: Vec2) -> Result<(ReachMap, bool)> {
    let targets: HashSet<Vec2> = grid.tile_free_positions().into_iter().collect();
    let root = Game::new_game(grid.clone(), start)?;
    let mut seen: HashSet<String> = HashSet::from([root.serialize()]);
    let mut frontier = VecDeque::from([Frontier {
        game: root,
        depth: 0,
        trace: String::new(),
    }]);
    let mut reach = ReachMap::default();
    let mut covered = 0usize;

    loop {
        if covered == targets.len() {
            return Ok((reach, true));
        }
        let Some(entry) = frontier.pop_front() else {
            return Ok((reach, false));
        };

        for dir in Direction::ALL {
            let mut game = entry.game.clone();
            let mut passed = vec![game.blob_pos()];
            let _ = game.blob_impulse_with(dir, &mut |step| {
                passed.push(step.blob);
                ControlFlow::Continue(())
            })?;

            let depth = entry.depth + 1;
            let mut trace = entry.trace.clone();
            trace.push(dir.letter());
            for pos in passed {
                if reach.record(pos, depth, &trace) && targets.contains(&pos) {
                    covered += 1;
                }
            }

            if seen.insert(game.serialize()) {
                frontier.push_back(Frontier { game, depth, trace });
            }
        }
    }
}

/// Scans from `max_depth` downwards for the first tile-free recorded cell.
fn select_goal(
    grid: &Grid,
    reach: &ReachMap,
    max_depth: usize,
    attempt: u32,
    log: &mut GenerationLog,
) -> Option<(Vec2, usize, String)> {
    let mut threshold = max_depth;
    let mut rejected: HashSet<Vec2> = HashSet::new();
    loop {
        for (pos, entry) in reach.iter() {
            if entry.depth < threshold || rejected.contains(&pos) {
                continue;
            }
            if let Some(tile) = grid.tile(pos) {
                log.push(GenerationEvent::GoalRejected { attempt, pos, tile });
                rejected.insert(pos);
                continue;
            }
            return Some((pos, threshold, entry.trace.clone()));
        }

        threshold -= 1;
        if threshold <= MIN_ACCEPTABLE_DEPTH {
            return None;
        }
        log.push(GenerationEvent::ThresholdLowered {
            attempt,
            depth: threshold,
        });
    }
}

/// Draws grids from `rng` until one has a tile-free goal more than
/// `MIN_ACCEPTABLE_DEPTH` impulses away from the start, giving up after
/// `MAX_BFS_ATTEMPTS` grids.
pub fn create_puzzle_bfs(
    width: i32,
    height: i32,
    rng: &mut Rng,
    options: &GeneratorOptions,
    log: &mut GenerationLog,
) -> Result<GeneratedPuzzle> {
    validate_dimensions(width, height, MIN_BFS_GRID_SIDE)?;
    for _ in 0..MAX_BFS_ATTEMPTS {
        let attempt = log.begin_attempt();
        let (grid, start) = generate_grid(
            width,
            height,
            rng,
            &options.mask,
            options.min_density,
            options.max_density,
        )?;
        let (reach, saturated) = explore(&grid, start)?;
        if saturated {
            log.push(GenerationEvent::SearchSaturated {
                attempt,
                states: reach.len(),
            });
        }

        let max_depth = reach.max_depth();
        if max_depth <= MIN_ACCEPTABLE_DEPTH {
            log.push(GenerationEvent::ShallowAttemptDiscarded { attempt, max_depth });
            continue;
        }

        let Some((goal, depth, solution)) = select_goal(&grid, &reach, max_depth, attempt, log)
        else {
            log.push(GenerationEvent::ThresholdExhausted { attempt });
            continue;
        };
        log.push(GenerationEvent::GoalSelected {
            attempt,
            goal,
            depth,
            solution: solution.clone(),
        });
        return Ok(GeneratedPuzzle {
            grid,
            start,
            goal,
            depth,
            solution,
        });
    }
    Err(PuzzleError::GenerationExhausted {
        attempts: MAX_BFS_ATTEMPTS,
    })
}

/// Builds a playable BFS puzzle for `seed` with a star on its goal.
pub fn setup_game_bfs(
    width: i32,
    height: i32,
    seed: &str,
    options: &GeneratorOptions,
    log: &mut GenerationLog,
) -> Result<PuzzleSetup> {
    let mut rng = Rng::from_seed_str(seed);
    loop {
        let puzzle = create_puzzle_bfs(width, height, &mut rng, options, log)?;
        let mut grid = puzzle.grid;
        if grid.tile(puzzle.goal).is_some() {
            log.push(GenerationEvent::GoalOccupiedAtSetup {
                attempt: log.attempts(),
                goal: puzzle.goal,
            });
            continue;
        }
        grid.set_tile(puzzle.goal, Some(Tile::Star))?;
        return Ok(PuzzleSetup {
            game: Game::new_game(grid, puzzle.start)?,
            goal: puzzle.goal,
            min_moves: puzzle.depth,
            solution: Some(puzzle.solution),
        });
    }
}

/// Fewest impulses that carry the blob over `goal`, searching outward from
/// `start` in first-in-first-out order.
pub fn calc_min(grid: &Grid, start: Vec2, goal: Vec2) -> Result<usize> {
    if start == goal {
        return Ok(0);
    }

    let root = Game::new_game(grid.clone(), start)?;
    let mut seen: HashSet<String> = HashSet::from([root.serialize()]);
    let mut queue = VecDeque::from([(root, 0usize)]);

    while let Some((state, moves)) = queue.pop_front() {
        for dir in Direction::ALL {
            let mut next = state.clone();
            let flow = next.blob_impulse_with(dir, &mut |step| {
                if step.blob == goal {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })?;
            if flow.is_break() {
                return Ok(moves + 1);
            }
            if seen.insert(next.serialize()) {
                queue.push_back((next, moves + 1));
            }
        }
    }

    Err(PuzzleError::UnreachableGoal { start, goal })
}
