pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
pub const FNV_PRIME: u32 = 16_777_619;
pub const RNG_INCREMENT: u32 = 0x6d2b_79f5;

pub const DEFAULT_WIDTH: i32 = 10;
pub const DEFAULT_HEIGHT: i32 = 10;
pub const MIN_GRID_SIDE: i32 = 3;
pub const MAX_GRID_SIDE: i32 = 1024;

pub const DEFAULT_MIN_DENSITY: f64 = 0.05;
pub const DEFAULT_MAX_DENSITY: f64 = 0.2;

/// A BFS puzzle must need strictly more impulses than this.
pub const MIN_ACCEPTABLE_DEPTH: usize = 4;

/// BFS grids need an interior at least `MIN_ACCEPTABLE_DEPTH` cells wide
/// and tall; smaller ones never yield a deep enough goal.
pub const MIN_BFS_GRID_SIDE: i32 = MIN_ACCEPTABLE_DEPTH as i32 + 2;

/// Grids drawn by the BFS generator before it gives up on a seed.
pub const MAX_BFS_ATTEMPTS: u32 = 10_000;

/// Upper bound on deflector traversals per impulse, scaled by grid area.
pub const MAX_BOUNCES_PER_CELL: usize = 8;

pub const SCRAMBLE_MIN_MOVES: i32 = 5;
pub const SCRAMBLE_MAX_MOVES: i32 = 20;

/// Candidate attempt counts drawn by the scramble setup when none is given.
pub const SCRAMBLE_ATTEMPT_CHOICES: [u32; 8] = [50, 100, 500, 1000, 5000, 10_000, 50_000, 100_000];

pub const TRIANGLE_ROTATION_CHOICES: [u8; 4] = [0, 1, 2, 3];
pub const SLASH_ROTATION_CHOICES: [u8; 2] = [0, 1];
