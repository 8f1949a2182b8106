/// Empty braille cell (U+2800)
pub const BLANK: char = '\u{2800}';

/// Dot bit for each (y, x) position inside a 2x4 braille cell
const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// A monochrome bitmap drawn with braille glyphs. One terminal cell holds
/// 2x4 pixels, so a `w` x `h` canvas addresses `2w` x `4h` pixels.
///
/// The map keeps one canvas per color layer and merges them when drawing.
#[derive(Clone)]
pub struct BrailleCanvas {
    cols: usize,
    rows: usize,
    /// Dot bits per cell, row-major
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0u8; cols * rows],
        }
    }

    #[cfg(test)]
    fn pixel_size(&self) -> (usize, usize) {
        (self.cols * 2, self.rows * 4)
    }

    fn cell_index(&self, x: usize, y: usize) -> Option<usize> {
        let (col, row) = (x / 2, y / 4);
        (col < self.cols && row < self.rows).then_some(row * self.cols + col)
    }

    /// Pixels outside the canvas are dropped
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        if let Some(i) = self.cell_index(x, y) {
            self.cells[i] |= DOT_BITS[y % 4][x % 2];
        }
    }

    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    #[cfg(test)]
    fn is_set(&self, x: usize, y: usize) -> bool {
        self.cell_index(x, y)
            .is_some_and(|i| self.cells[i] & DOT_BITS[y % 4][x % 2] != 0)
    }

    pub fn char_at(&self, col: usize, row: usize) -> char {
        if col >= self.cols || row >= self.rows {
            return BLANK;
        }
        glyph(self.cells[row * self.cols + col])
    }

    /// Non-blank cells as (col, row, glyph)
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &bits)| bits != 0)
            .map(move |(i, &bits)| (i % self.cols, i / self.cols, glyph(bits)))
    }

    #[cfg(test)]
    fn row_text(&self, row: usize) -> String {
        (0..self.cols).map(|col| self.char_at(col, row)).collect()
    }

    #[cfg(test)]
    fn text(&self) -> String {
        (0..self.rows)
            .map(|row| self.row_text(row))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[inline]
fn glyph(bits: u8) -> char {
    char::from_u32(0x2800 + bits as u32).unwrap_or(BLANK)
}
