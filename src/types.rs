use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        match dir {
            Direction::Up => Self::new(self.x, self.y - 1),
            Direction::Down => Self::new(self.x, self.y + 1),
            Direction::Left => Self::new(self.x - 1, self.y),
            Direction::Right => Self::new(self.x + 1, self.y),
        }
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Single-letter code used in solution traces.
    pub fn letter(self) -> char {
        match self {
            Self::Up => 'U',
            Self::Down => 'D',
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'U' => Some(Self::Up),
            'D' => Some(Self::Down),
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            _ => None,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// Parses a `UDLR` instruction string.
pub fn parse_moves(text: &str) -> Result<Vec<Direction>> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| Direction::from_letter(c).ok_or(PuzzleError::UnknownMove(c)))
        .collect()
}

pub fn moves_to_string(moves: &[Direction]) -> String {
    moves.iter().map(|dir| dir.letter()).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Blob,
    Ball,
}

impl Entity {
    pub fn glyph(self) -> char {
        match self {
            Self::Blob => '@',
            Self::Ball => '*',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tile {
    Wall,
    Star,
    Hole { filled: bool },
    Grate,
    /// Open on the `facing` side and the side anticlockwise from it, so
    /// facing up is `◢`.
    Triangle { facing: Direction },
    /// `/` when `facing_up`, `\` otherwise.
    Slash { facing_up: bool },
}

impl Tile {
    pub const fn hole() -> Self {
        Self::Hole { filled: false }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Star => '%',
            Self::Hole { filled: false } => 'o',
            Self::Hole { filled: true } => ',',
            Self::Grate => '=',
            Self::Triangle { facing } => match facing {
                Direction::Up => '◢',
                Direction::Down => '◤',
                Direction::Left => '◥',
                Direction::Right => '◣',
            },
            Self::Slash { facing_up: true } => '/',
            Self::Slash { facing_up: false } => '\\',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        let tile = match glyph {
            '#' => Self::Wall,
            '%' => Self::Star,
            'o' => Self::Hole { filled: false },
            ',' => Self::Hole { filled: true },
            '=' => Self::Grate,
            '◢' => Self::Triangle {
                facing: Direction::Up,
            },
            '◤' => Self::Triangle {
                facing: Direction::Down,
            },
            '◥' => Self::Triangle {
                facing: Direction::Left,
            },
            '◣' => Self::Triangle {
                facing: Direction::Right,
            },
            '/' => Self::Slash { facing_up: true },
            '\\' => Self::Slash { facing_up: false },
            _ => return None,
        };
        Some(tile)
    }

    pub fn is_deflector(self) -> bool {
        matches!(self, Self::Triangle { .. } | Self::Slash { .. })
    }

    pub fn is_unfilled_hole(self) -> bool {
        matches!(self, Self::Hole { filled: false })
    }

    pub fn enterable(self, from: Direction) -> bool {
        match self {
            Self::Wall => false,
            Self::Star | Self::Grate | Self::Slash { .. } => true,
            Self::Hole { filled } => filled,
            Self::Triangle { facing } => match facing {
                Direction::Up => matches!(from, Direction::Down | Direction::Right),
                Direction::Down => matches!(from, Direction::Up | Direction::Left),
                Direction::Left => matches!(from, Direction::Up | Direction::Right),
                Direction::Right => matches!(from, Direction::Down | Direction::Left),
            },
        }
    }

    /// Direction an actor leaves a deflector after entering it moving `from`.
    pub fn exit_dir(self, from: Direction) -> Result<Direction> {
        use Direction::{Down, Left, Right, Up};

        let exit = match self {
            Self::Triangle { facing } => match (facing, from) {
                (Up, Down) => Some(Left),
                (Up, Right) => Some(Up),
                (Down, Up) => Some(Right),
                (Down, Left) => Some(Down),
                (Left, Up) => Some(Left),
                (Left, Right) => Some(Down),
                (Right, Down) => Some(Right),
                (Right, Left) => Some(Up),
                _ => None,
            },
            Self::Slash { facing_up: true } => Some(match from {
                Up => Right,
                Down => Left,
                Left => Down,
                Right => Up,
            }),
            Self::Slash { facing_up: false } => Some(match from {
                Up => Left,
                Down => Right,
                Left => Up,
                Right => Down,
            }),
            _ => None,
        };
        exit.ok_or(PuzzleError::UnsupportedBounce {
            glyph: self.glyph(),
            from,
        })
    }

    /// Advances a deflector to its next facing; other tiles are unchanged.
    pub fn rotate(&mut self) {
        match self {
            Self::Triangle { facing } => *facing = facing.clockwise(),
            Self::Slash { facing_up } => *facing_up = !*facing_up,
            _ => {}
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub entity: Option<Entity>,
    pub tile: Option<Tile>,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        entity: None,
        tile: None,
    };

    pub fn with_tile(tile: Tile) -> Self {
        Self {
            entity: None,
            tile: Some(tile),
        }
    }

    pub fn with_entity(entity: Entity) -> Self {
        Self {
            entity: Some(entity),
            tile: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity.is_none() && self.tile.is_none()
    }

    pub fn glyph(&self) -> char {
        self.entity
            .map(Entity::glyph)
            .or_else(|| self.tile.map(Tile::glyph))
            .unwrap_or('.')
    }
}

/// Element kinds the generator may scatter, in mask order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Wall,
    Ball,
    Triangle,
    Slash,
    Hole,
    Grate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileMask {
    pub wall: bool,
    pub ball: bool,
    pub triangle: bool,
    pub slash: bool,
    pub hole: bool,
    pub grate: bool,
}

impl Default for TileMask {
    fn default() -> Self {
        Self {
            wall: true,
            ball: true,
            triangle: true,
            slash: true,
            hole: true,
            grate: true,
        }
    }
}

impl TileMask {
    pub fn enabled_kinds(&self) -> Vec<ElementKind> {
        [
            (self.wall, ElementKind::Wall),
            (self.ball, ElementKind::Ball),
            (self.triangle, ElementKind::Triangle),
            (self.slash, ElementKind::Slash),
            (self.hole, ElementKind::Hole),
            (self.grate, ElementKind::Grate),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

impl FromStr for TileMask {
    type Err = PuzzleError;

    fn from_str(s: &str) -> Result<Self> {
        let bits: Vec<bool> = s
            .chars()
            .map(|c| match c {
                '1' => Some(true),
                '0' => Some(false),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .filter(|bits| bits.len() == 6)
            .ok_or_else(|| PuzzleError::InvalidTileMask(s.to_string()))?;
        Ok(Self {
            wall: bits[0],
            ball: bits[1],
            triangle: bits[2],
            slash: bits[3],
            hole: bits[4],
            grate: bits[5],
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mover {
    Blob,
    Ball,
}

/// One atomic relocation during an impulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
    pub mover: Mover,
    pub from: Vec2,
    pub to: Vec2,
    /// Blob position once this step has been applied.
    pub blob: Vec2,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Impulse {
    pub steps: Vec<Step>,
    /// Whether anything moved or a hole was filled.
    pub pushed: bool,
}

impl Impulse {
    pub fn blob_path(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.steps.iter().map(|step| step.blob)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    SearchSaturated {
        attempt: u32,
        states: usize,
    },
    ShallowAttemptDiscarded {
        attempt: u32,
        #[serde(rename = "maxDepth")]
        max_depth: usize,
    },
    GoalRejected {
        attempt: u32,
        pos: Vec2,
        tile: Tile,
    },
    ThresholdLowered {
        attempt: u32,
        depth: usize,
    },
    ThresholdExhausted {
        attempt: u32,
    },
    GoalOccupiedAtSetup {
        attempt: u32,
        goal: Vec2,
    },
    GoalSelected {
        attempt: u32,
        goal: Vec2,
        depth: usize,
        solution: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_returns_to_start_after_four_rotations() {
        for facing in Direction::ALL {
            let original = Tile::Triangle { facing };
            let mut tile = original;
            for _ in 0..4 {
                tile.rotate();
            }
            assert_eq!(tile, original);
            for from in Direction::ALL {
                assert_eq!(tile.enterable(from), original.enterable(from));
            }
        }
    }

    #[test]
    fn slash_returns_to_start_after_two_rotations() {
        let original = Tile::Slash { facing_up: true };
        let mut tile = original;
        tile.rotate();
        assert_ne!(tile, original);
        tile.rotate();
        assert_eq!(tile, original);
    }

    #[test]
    fn triangle_accepts_exactly_its_two_entries() {
        for facing in Direction::ALL {
            let tile = Tile::Triangle { facing };
            let mut legal = 0;
            for from in Direction::ALL {
                assert_eq!(tile.enterable(from), tile.exit_dir(from).is_ok());
                if tile.enterable(from) {
                    legal += 1;
                }
            }
            assert_eq!(legal, 2);
        }
    }

    #[test]
    fn unsupported_entry_is_reported() {
        let tile = Tile::Triangle {
            facing: Direction::Up,
        };
        assert_eq!(
            tile.exit_dir(Direction::Up),
            Err(PuzzleError::UnsupportedBounce {
                glyph: '◢',
                from: Direction::Up
            })
        );
        assert!(Tile::Wall.exit_dir(Direction::Left).is_err());
    }

    #[test]
    fn deflector_exits_are_bijective_per_facing() {
        let deflectors = [
            Tile::Slash { facing_up: true },
            Tile::Slash { facing_up: false },
            Tile::Triangle {
                facing: Direction::Up,
            },
            Tile::Triangle {
                facing: Direction::Down,
            },
            Tile::Triangle {
                facing: Direction::Left,
            },
            Tile::Triangle {
                facing: Direction::Right,
            },
        ];
        for tile in deflectors {
            let mut exits: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter_map(|from| tile.exit_dir(from).ok())
                .collect();
            let count = exits.len();
            exits.sort_by_key(|dir| dir.letter());
            exits.dedup();
            assert_eq!(exits.len(), count);
        }
    }

    #[test]
    fn glyphs_round_trip_for_every_tile_state() {
        let mut tiles = vec![
            Tile::Wall,
            Tile::Star,
            Tile::Hole { filled: false },
            Tile::Hole { filled: true },
            Tile::Grate,
            Tile::Slash { facing_up: true },
            Tile::Slash { facing_up: false },
        ];
        tiles.extend(Direction::ALL.map(|facing| Tile::Triangle { facing }));
        let mut glyphs: Vec<char> = tiles.iter().map(|tile| tile.glyph()).collect();
        for tile in &tiles {
            assert_eq!(Tile::from_glyph(tile.glyph()), Some(*tile));
        }
        glyphs.extend(['@', '*', '.']);
        let count = glyphs.len();
        glyphs.sort_unstable();
        glyphs.dedup();
        assert_eq!(glyphs.len(), count);
    }

    #[test]
    fn entity_glyph_hides_tile() {
        let cell = Cell {
            entity: Some(Entity::Ball),
            tile: Some(Tile::Star),
        };
        assert_eq!(cell.glyph(), '*');
        assert_eq!(Cell::EMPTY.glyph(), '.');
    }

    #[test]
    fn tile_mask_parses_and_rejects() {
        let mask: TileMask = "101010".parse().expect("valid mask");
        assert_eq!(
            mask.enabled_kinds(),
            vec![ElementKind::Wall, ElementKind::Triangle, ElementKind::Hole]
        );
        assert!("10101".parse::<TileMask>().is_err());
        assert!("10102x".parse::<TileMask>().is_err());
        assert_eq!(TileMask::default().enabled_kinds().len(), 6);
    }

    #[test]
    fn moves_parse_from_letters() {
        let moves = parse_moves("UD lr").expect("valid moves");
        assert_eq!(
            moves,
            vec![
                Direction::Up,
                Direction::Down,
                Direction::Left,
                Direction::Right
            ]
        );
        assert_eq!(moves_to_string(&moves), "UDLR");
        assert_eq!(parse_moves("UX"), Err(PuzzleError::UnknownMove('X')));
        assert_eq!(Direction::parse_move("left"), Some(Direction::Left));
        assert_eq!(Direction::parse_move("Left"), None);
    }
}
