use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::error::Result;
use crate::types::{Direction, Entity, Mover, Vec2};

use super::{Game, Resolution};

impl Game {
    /// Whether an actor entering the deflector at `pos` moving `dir` can
    /// leave it again. Never mutates the game.
    pub fn can_exit_bounce(&self, pos: Vec2, dir: Direction, actor: Mover) -> Result<bool> {
        let mut visited = HashSet::new();
        self.exit_clear(pos, dir, actor, &mut visited)
    }

    fn exit_clear(
        &self,
        pos: Vec2,
        dir: Direction,
        actor: Mover,
        visited: &mut HashSet<(Vec2, Direction)>,
    ) -> Result<bool> {
        let Some(tile) = self.grid.tile(pos).filter(|tile| tile.is_deflector()) else {
            return Ok(true);
        };
        // A ring of deflectors is treated as open: each real traversal
        // rotates them, so the actor does not stay on this path.
        if !visited.insert((pos, dir)) {
            return Ok(true);
        }

        let exit = tile.exit_dir(dir)?;
        let beyond = pos.step(exit);
        let Some(cell) = self.grid.cell(beyond).copied() else {
            return Ok(false);
        };

        match cell.entity {
            // The blob is leaving that cell, so only it may pass.
            Some(Entity::Blob) => return Ok(actor == Mover::Blob),
            Some(Entity::Ball) => {
                if actor == Mover::Ball {
                    return Ok(false);
                }
                return self.trial_ball_push(beyond, exit);
            }
            None => {}
        }

        match cell.tile {
            None => Ok(true),
            Some(next) if next.is_unfilled_hole() => Ok(actor == Mover::Ball),
            Some(next) if !next.enterable(exit) => Ok(false),
            Some(next) if next.is_deflector() => self.exit_clear(beyond, exit, actor, visited),
            Some(_) => Ok(true),
        }
    }

    /// Pushes the ball at `pos` on a scratch copy and reports whether it
    /// would move at all.
    fn trial_ball_push(&self, pos: Vec2, dir: Direction) -> Result<bool> {
        let mut scratch = self.clone();
        let outcome = scratch.drive_ball(pos, dir, 0, &mut |_| ControlFlow::Break(()))?;
        Ok(match outcome {
            Resolution::Halted => true,
            Resolution::Finished(pushed) => pushed,
        })
    }
}
