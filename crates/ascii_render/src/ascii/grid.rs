/// One rasterized character cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphCell {
    pub ch: char,
    /// Source pixel color as RGB bytes, independent of alpha.
    pub color: [u8; 3],
    /// Whether the cell is painted at all.
    pub opaque: bool,
}

impl GlyphCell {
    pub fn new(ch: char, color: [u8; 3], opaque: bool) -> Self {
        Self { ch, color, opaque }
    }
}

/// Row-major grid of glyph cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<GlyphCell>,
}

impl GlyphGrid {
    pub(crate) fn new(width: u32, height: u32, cells: Vec<GlyphCell>) -> Self {
        debug_assert_eq!(width as usize * height as usize, cells.len());
        Self { width, height, cells }
    }

    pub fn cell(&self, column: u32, row: u32) -> Option<&GlyphCell> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(row as usize * self.width as usize + column as usize)
    }

    /// Cells paired with their `(column, row)` position.
    pub fn positioned(&self) -> impl Iterator<Item = (u32, u32, &GlyphCell)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (index as u32 % width, index as u32 / width, cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_row_major() {
        let cells = (0..6).map(|i| GlyphCell::new(char::from(b'a' + i), [i; 3], true)).collect();
        let grid = GlyphGrid::new(3, 2, cells);

        assert_eq!(grid.cell(1, 1).map(|cell| cell.ch), Some('e'));
        assert_eq!(grid.cell(3, 0), None);

        let positions: Vec<_> = grid.positioned().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }
}
