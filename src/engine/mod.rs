use std::ops::ControlFlow;
use std::str::FromStr;

use crate::constants::MAX_BOUNCES_PER_CELL;
use crate::error::{PuzzleError, Result};
use crate::grid::Grid;
use crate::types::{Direction, Entity, Impulse, Mover, Step, Tile, Vec2};

mod bounce;

/// Receives every atomic step of an impulse; `Break` stops the impulse and
/// leaves the grid as the delivered steps left it.
pub type StepObserver<'a> = dyn FnMut(&Step) -> ControlFlow<()> + 'a;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    Finished(bool),
    Halted,
}

impl Resolution {
    /// Outcome of a call that moved its actor and then delegated the rest.
    fn after_delegation(self) -> Self {
        match self {
            Self::Halted => Self::Halted,
            Self::Finished(_) => Self::Finished(true),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    grid: Grid,
    blob_pos: Vec2,
}

impl Game {
    pub fn new_game(mut grid: Grid, start: Vec2) -> Result<Self> {
        let out_of_bounds = grid.out_of_bounds(start);
        let cell = grid.cell_mut(start).ok_or(out_of_bounds)?;
        if cell.entity.is_some() {
            return Err(PuzzleError::PlacementConflict { pos: start });
        }
        cell.entity = Some(Entity::Blob);
        Ok(Self {
            grid,
            blob_pos: start,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn into_grid(self) -> Grid {
        self.grid
    }

    pub fn blob_pos(&self) -> Vec2 {
        self.blob_pos
    }

    pub fn serialize(&self) -> String {
        self.grid.serialize()
    }

    /// True once the blob rests on a star.
    pub fn is_solved(&self) -> bool {
        self.grid.tile(self.blob_pos) == Some(Tile::Star)
    }

    pub fn blob_impulse(&mut self, dir: Direction) -> Result<Impulse> {
        let mut steps = Vec::new();
        let _ = self.blob_impulse_with(dir, &mut |step| {
            steps.push(*step);
            ControlFlow::Continue(())
        })?;
        let pushed = !steps.is_empty();
        Ok(Impulse { steps, pushed })
    }

    /// Pushes the blob, reporting each step to `observer` as it happens.
    pub fn blob_impulse_with(
        &mut self,
        dir: Direction,
        observer: &mut StepObserver<'_>,
    ) -> Result<ControlFlow<()>> {
        Ok(match self.drive_blob(dir, 0, observer)? {
            Resolution::Halted => ControlFlow::Break(()),
            Resolution::Finished(_) => ControlFlow::Continue(()),
        })
    }

    pub fn ball_impulse(&mut self, pos: Vec2, dir: Direction) -> Result<Impulse> {
        if self.grid.entity(pos) != Some(Entity::Ball) {
            return Err(PuzzleError::NoBallAt { pos });
        }
        let mut steps = Vec::new();
        let resolution = self.drive_ball(pos, dir, 0, &mut |step| {
            steps.push(*step);
            ControlFlow::Continue(())
        })?;
        Ok(Impulse {
            steps,
            pushed: resolution == Resolution::Finished(true),
        })
    }

    /// Plays a sequence of blob impulses, returning each one's outcome.
    pub fn apply_moves(&mut self, moves: &[Direction]) -> Result<Vec<Impulse>> {
        moves.iter().map(|&dir| self.blob_impulse(dir)).collect()
    }

    fn drive_blob(
        &mut self,
        dir: Direction,
        bounces: usize,
        observer: &mut StepObserver<'_>,
    ) -> Result<Resolution> {
        let mut moved = false;
        loop {
            let from = self.blob_pos;
            let next = from.step(dir);
            let Some(cell) = self.grid.cell(next).copied() else {
                return Ok(Resolution::Finished(moved));
            };

            match cell.entity {
                Some(Entity::Ball) => {
                    return match self.drive_ball(next, dir, bounces, observer)? {
                        Resolution::Halted => Ok(Resolution::Halted),
                        Resolution::Finished(false) => Ok(Resolution::Finished(moved)),
                        Resolution::Finished(true) => {
                            self.relocate_blob(next);
                            if observer(&self.step(Mover::Blob, from, next)).is_break() {
                                return Ok(Resolution::Halted);
                            }
                            Ok(Resolution::Finished(true))
                        }
                    };
                }
                Some(Entity::Blob) => return Ok(Resolution::Finished(moved)),
                None => {}
            }

            let Some(tile) = cell.tile else {
                self.relocate_blob(next);
                moved = true;
                if observer(&self.step(Mover::Blob, from, next)).is_break() {
                    return Ok(Resolution::Halted);
                }
                continue;
            };
            if !tile.enterable(dir) {
                return Ok(Resolution::Finished(moved));
            }

            match tile {
                Tile::Star => {
                    self.relocate_blob(next);
                    if observer(&self.step(Mover::Blob, from, next)).is_break() {
                        return Ok(Resolution::Halted);
                    }
                    return Ok(Resolution::Finished(true));
                }
                Tile::Grate => {
                    self.relocate_blob(next);
                    self.grid.set_tile(next, Some(Tile::hole()))?;
                }
                Tile::Hole { filled: true } => self.relocate_blob(next),
                Tile::Hole { filled: false } => return Err(PuzzleError::FellInHole { pos: next }),
                Tile::Triangle { .. } | Tile::Slash { .. } => {
                    if !self.can_exit_bounce(next, dir, Mover::Blob)? {
                        return Ok(Resolution::Finished(moved));
                    }
                    self.check_bounce_limit(next, bounces)?;
                    self.relocate_blob(next);
                    let exit = tile.exit_dir(dir)?;
                    self.rotate_tile(next);
                    return Ok(self
                        .drive_blob(exit, bounces + 1, observer)?
                        .after_delegation());
                }
                Tile::Wall => return Ok(Resolution::Finished(moved)),
            }
            moved = true;
            if observer(&self.step(Mover::Blob, from, next)).is_break() {
                return Ok(Resolution::Halted);
            }
        }
    }

    fn drive_ball(
        &mut self,
        mut pos: Vec2,
        dir: Direction,
        bounces: usize,
        observer: &mut StepObserver<'_>,
    ) -> Result<Resolution> {
        let mut moved = false;
        loop {
            let next = pos.step(dir);
            let Some(cell) = self.grid.cell(next).copied() else {
                return Ok(Resolution::Finished(moved));
            };
            if cell.entity.is_some() {
                return Ok(Resolution::Finished(moved));
            }

            if let Some(tile) = cell.tile {
                if tile.is_unfilled_hole() {
                    self.grid.set_tile(next, Some(Tile::Hole { filled: true }))?;
                    if let Some(here) = self.grid.cell_mut(pos) {
                        here.entity = None;
                    }
                    return Ok(Resolution::Finished(true));
                }
                if !tile.enterable(dir) {
                    return Ok(Resolution::Finished(moved));
                }
                match tile {
                    Tile::Grate => {
                        self.move_entity(pos, next);
                        self.grid.set_tile(next, Some(Tile::hole()))?;
                    }
                    Tile::Hole { .. } | Tile::Star => self.move_entity(pos, next),
                    Tile::Triangle { .. } | Tile::Slash { .. } => {
                        if !self.can_exit_bounce(next, dir, Mover::Ball)? {
                            return Ok(Resolution::Finished(moved));
                        }
                        self.check_bounce_limit(next, bounces)?;
                        self.move_entity(pos, next);
                        let exit = tile.exit_dir(dir)?;
                        self.rotate_tile(next);
                        return Ok(self
                            .drive_ball(next, exit, bounces + 1, observer)?
                            .after_delegation());
                    }
                    Tile::Wall => return Ok(Resolution::Finished(moved)),
                }
            } else {
                self.move_entity(pos, next);
            }

            moved = true;
            let step = self.step(Mover::Ball, pos, next);
            pos = next;
            if observer(&step).is_break() {
                return Ok(Resolution::Halted);
            }
        }
    }

    /// Deflector chains are bounded so a rotating ring can never recurse
    /// without end.
    fn check_bounce_limit(&self, pos: Vec2, bounces: usize) -> Result<()> {
        let area = self.grid.width() as usize * self.grid.height() as usize;
        let limit = area * MAX_BOUNCES_PER_CELL;
        if bounces >= limit {
            return Err(PuzzleError::RunawayBounce { pos, bounces });
        }
        Ok(())
    }

    fn step(&self, mover: Mover, from: Vec2, to: Vec2) -> Step {
        Step {
            mover,
            from,
            to,
            blob: self.blob_pos,
        }
    }

    fn relocate_blob(&mut self, to: Vec2) {
        self.move_entity(self.blob_pos, to);
        self.blob_pos = to;
    }

    fn move_entity(&mut self, from: Vec2, to: Vec2) {
        let mover = self.grid.cell_mut(from).and_then(|cell| cell.entity.take());
        if let Some(cell) = self.grid.cell_mut(to) {
            cell.entity = mover;
        }
    }

    fn rotate_tile(&mut self, pos: Vec2) {
        if let Some(tile) = self.grid.cell_mut(pos).and_then(|cell| cell.tile.as_mut()) {
            tile.rotate();
        }
    }
}

impl FromStr for Game {
    type Err = PuzzleError;

    fn from_str(s: &str) -> Result<Self> {
        let grid = Grid::parse(s)?;
        let blobs: Vec<Vec2> = grid
            .positions()
            .filter(|&pos| grid.entity(pos) == Some(Entity::Blob))
            .collect();
        let blob_pos = match blobs.as_slice() {
            [] => return Err(PuzzleError::MissingBlob),
            [only] => *only,
            [_, second, ..] => return Err(PuzzleError::DuplicateBlob { pos: *second }),
        };
        Ok(Self { grid, blob_pos })
    }
}
