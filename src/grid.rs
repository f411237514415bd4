use crate::error::{PuzzleError, Result};
use crate::types::{Cell, Entity, Tile, Vec2};

/// Rectangular board of cells addressed by `(x, y)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Open floor surrounded by a one-cell wall border.
    pub fn empty_bordered(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let mut cells = vec![Cell::EMPTY; width as usize * height as usize];
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    cells[y as usize * width as usize + x as usize] = Cell::with_tile(Tile::Wall);
                }
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Vec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Vec2) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn cell(&self, pos: Vec2) -> Option<&Cell> {
        self.index(pos).and_then(|idx| self.cells.get(idx))
    }

    pub fn cell_mut(&mut self, pos: Vec2) -> Option<&mut Cell> {
        self.index(pos).and_then(move |idx| self.cells.get_mut(idx))
    }

    pub fn tile(&self, pos: Vec2) -> Option<Tile> {
        self.cell(pos).and_then(|cell| cell.tile)
    }

    pub fn entity(&self, pos: Vec2) -> Option<Entity> {
        self.cell(pos).and_then(|cell| cell.entity)
    }

    pub fn set_cell(&mut self, pos: Vec2, cell: Cell) -> Result<()> {
        let out_of_bounds = self.out_of_bounds(pos);
        let slot = self.cell_mut(pos).ok_or(out_of_bounds)?;
        *slot = cell;
        Ok(())
    }

    pub fn set_tile(&mut self, pos: Vec2, tile: Option<Tile>) -> Result<()> {
        let out_of_bounds = self.out_of_bounds(pos);
        let slot = self.cell_mut(pos).ok_or(out_of_bounds)?;
        slot.tile = tile;
        Ok(())
    }

    pub(crate) fn out_of_bounds(&self, pos: Vec2) -> PuzzleError {
        PuzzleError::OutOfBounds {
            pos,
            width: self.width,
            height: self.height,
        }
    }

    /// Coordinates in column-major order (`x` outer, `y` inner).
    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Vec2::new(x, y)))
    }

    /// Cells with neither tile nor entity.
    pub fn empty_spaces(&self) -> Vec<Vec2> {
        self.positions()
            .filter(|&pos| self.cell(pos).is_some_and(Cell::is_empty))
            .collect()
    }

    /// Cells without a tile; entities are ignored.
    pub fn tile_free_positions(&self) -> Vec<Vec2> {
        self.positions()
            .filter(|&pos| self.cell(pos).is_some_and(|cell| cell.tile.is_none()))
            .collect()
    }

    /// Non-empty cells inside the outer border.
    pub fn interior_occupied(&self) -> usize {
        self.positions()
            .filter(|pos| {
                pos.x > 0 && pos.y > 0 && pos.x < self.width - 1 && pos.y < self.height - 1
            })
            .filter(|&pos| self.cell(pos).is_some_and(|cell| !cell.is_empty()))
            .count()
    }

    pub fn count_entities(&self, entity: Entity) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.entity == Some(entity))
            .count()
    }

    pub fn find_entity(&self, entity: Entity) -> Option<Vec2> {
        self.positions()
            .find(|&pos| self.entity(pos) == Some(entity))
    }

    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize * 3);
        for y in 0..self.height {
            if y > 0 {
                out.push('\n');
            }
            for x in 0..self.width {
                out.push(self.cells[y as usize * self.width as usize + x as usize].glyph());
            }
        }
        out
    }

    /// Serialized grid with an `x mod 10` header and row numbers.
    pub fn render_with_axes(&self) -> String {
        let mut out = String::from("  ");
        for x in 0..self.width {
            out.push_str(&(x % 10).to_string());
        }
        for (y, row) in self.serialize().lines().enumerate() {
            out.push('\n');
            out.push_str(&format!("{y} {row}"));
        }
        out
    }

    /// Reads the canonical serialized text back into a grid. Entities parse
    /// onto bare floor since their glyph hides any tile underneath.
    pub fn parse(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|row| !row.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(PuzzleError::EmptyGrid);
        };
        let width = first.chars().count() as i32;
        let height = rows.len() as i32;
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count() as i32;
            if found != width {
                return Err(PuzzleError::RaggedRow {
                    row: y as i32,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let cell = match glyph {
                    '.' => Cell::EMPTY,
                    '@' => Cell::with_entity(Entity::Blob),
                    '*' => Cell::with_entity(Entity::Ball),
                    other => Cell::with_tile(Tile::from_glyph(other).ok_or(
                        PuzzleError::UnknownGlyph {
                            glyph: other,
                            pos: Vec2::new(x as i32, y as i32),
                        },
                    )?),
                };
                cells.push(cell);
            }
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_occupancy_ignores_the_border() {
        let grid = Grid::parse("#####\n#@*.#\n#=.o#\n#####").expect("grid");
        assert_eq!(grid.interior_occupied(), 4);
        assert_eq!(Grid::empty_bordered(6, 6).interior_occupied(), 0);
    }

    #[test]
    fn empty_grid_is_wall_bordered() {
        let grid = Grid::empty_bordered(5, 4);
        assert_eq!(grid.serialize(), "#####\n#...#\n#...#\n#####");
        assert_eq!(grid.empty_spaces().len(), 3 * 2);
        assert_eq!(grid.tile_free_positions().len(), 3 * 2);
    }

    #[test]
    fn out_of_bounds_lookups_are_none() {
        let mut grid = Grid::empty_bordered(3, 3);
        assert!(grid.cell(Vec2::new(-1, 0)).is_none());
        assert!(grid.cell(Vec2::new(3, 1)).is_none());
        assert_eq!(
            grid.set_tile(Vec2::new(0, 3), None),
            Err(PuzzleError::OutOfBounds {
                pos: Vec2::new(0, 3),
                width: 3,
                height: 3
            })
        );
    }

    #[test]
    fn positions_are_column_major() {
        let grid = Grid::empty_bordered(3, 3);
        let first: Vec<Vec2> = grid.positions().take(4).collect();
        assert_eq!(
            first,
            vec![
                Vec2::new(0, 0),
                Vec2::new(0, 1),
                Vec2::new(0, 2),
                Vec2::new(1, 0)
            ]
        );
    }

    #[test]
    fn parse_round_trips_serialized_text() {
        let text = "######\n#@*o,#\n#=◢◤/#\n#\\◥◣%#\n######";
        let grid = Grid::parse(text).expect("valid grid");
        assert_eq!(grid.width(), 6);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.serialize(), text);
        assert_eq!(grid.find_entity(Entity::Blob), Some(Vec2::new(1, 1)));
        assert_eq!(grid.count_entities(Entity::Ball), 1);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(Grid::parse("\n\n"), Err(PuzzleError::EmptyGrid));
        assert_eq!(
            Grid::parse("###\n##\n###"),
            Err(PuzzleError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            Grid::parse("###\n#x#\n###"),
            Err(PuzzleError::UnknownGlyph {
                glyph: 'x',
                pos: Vec2::new(1, 1)
            })
        );
    }

    #[test]
    fn axes_rendering_numbers_rows_and_columns() {
        let grid = Grid::empty_bordered(3, 3);
        assert_eq!(grid.render_with_axes(), "  012\n0 ###\n1 #.#\n2 ###");
    }
}
