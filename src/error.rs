use thiserror::Error;

use crate::types::{Direction, Vec2};

pub type Result<T> = std::result::Result<T, PuzzleError>;

/// Every failure the engine and generator can report.
///
/// Movement faults (`FellInHole`, `UnsupportedBounce`) and `UnreachableGoal`
/// indicate a logic defect rather than bad input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("cannot place blob at {pos}: cell already holds an entity")]
    PlacementConflict { pos: Vec2 },
    #[error("position {pos} is outside the {width}x{height} grid")]
    OutOfBounds { pos: Vec2, width: i32, height: i32 },
    #[error("no ball at {pos}")]
    NoBallAt { pos: Vec2 },
    #[error("blob fell into an unfilled hole at {pos}")]
    FellInHole { pos: Vec2 },
    #[error("deflector {glyph} cannot be entered moving {from}")]
    UnsupportedBounce { glyph: char, from: Direction },
    #[error("impulse still bouncing at {pos} after {bounces} deflections")]
    RunawayBounce { pos: Vec2, bounces: usize },
    #[error("no empty cell left for the blob start")]
    NoValidStart,
    #[error("goal {goal} is unreachable from {start}")]
    UnreachableGoal { start: Vec2, goal: Vec2 },
    #[error("grid sides must be within {min}..={max}, got {width}x{height}")]
    InvalidDimensions {
        width: i32,
        height: i32,
        min: i32,
        max: i32,
    },
    #[error("no acceptable puzzle after {attempts} generated grids")]
    GenerationExhausted { attempts: u32 },
    #[error("density range {min}..{max} is invalid")]
    InvalidDensity { min: String, max: String },
    #[error("tile mask enables no element kinds")]
    EmptyTileMask,
    #[error("invalid tile mask {0:?}: expected six 0/1 characters")]
    InvalidTileMask(String),
    #[error("unknown glyph {glyph:?} at {pos}")]
    UnknownGlyph { glyph: char, pos: Vec2 },
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: i32,
        expected: i32,
        found: i32,
    },
    #[error("grid text is empty")]
    EmptyGrid,
    #[error("grid text has no blob")]
    MissingBlob,
    #[error("grid text has a second blob at {pos}")]
    DuplicateBlob { pos: Vec2 },
    #[error("unknown move {0:?}")]
    UnknownMove(char),
}
