//! Render RGB frames as ASCII art with face boxes and labels on top.

use image::RgbImage;
use rollcall_core::BoundingBox;

const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// A character grid `cols` wide and `rows` tall.
pub struct AsciiGrid {
    cols: usize,
    rows: usize,
    cells: Vec<u8>,
    /// Source image size, for mapping pixel coordinates into the grid.
    source: (u32, u32),
}

impl AsciiGrid {
    /// Sample `image` into a grid by luminance.
    pub fn from_image(image: &RgbImage, cols: usize, rows: usize) -> Self {
        let (w, h) = image.dimensions();
        let mut cells = vec![b' '; cols * rows];
        if w > 0 && h > 0 {
            for row in 0..rows {
                for col in 0..cols {
                    let x = ((col as u64 * w as u64) / cols as u64) as u32;
                    let y = ((row as u64 * h as u64) / rows as u64) as u32;
                    let [r, g, b] = image.get_pixel(x.min(w - 1), y.min(h - 1)).0;
                    let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
                    let idx = luma as usize * (ASCII_RAMP.len() - 1) / 255;
                    cells[row * cols + col] = ASCII_RAMP[idx];
                }
            }
        }
        Self {
            cols,
            rows,
            cells,
            source: (w, h),
        }
    }

    fn to_col(&self, x: f32) -> usize {
        let (w, _) = self.source;
        if w == 0 {
            return 0;
        }
        ((x.max(0.0) / w as f32) * self.cols as f32) as usize
    }

    fn to_row(&self, y: f32) -> usize {
        let (_, h) = self.source;
        if h == 0 {
            return 0;
        }
        ((y.max(0.0) / h as f32) * self.rows as f32) as usize
    }

    fn set(&mut self, col: usize, row: usize, ch: u8) {
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = ch;
        }
    }

    /// Outline `region` (source pixel coordinates) and write `label` on the
    /// box's bottom edge.
    pub fn draw_face(&mut self, region: &BoundingBox, label: &str) {
        if self.cols == 0 || self.rows == 0 {
            return;
        }
        let left = self.to_col(region.x).min(self.cols - 1);
        let right = self.to_col(region.right()).min(self.cols - 1).max(left);
        let top = self.to_row(region.y).min(self.rows - 1);
        let bottom = self.to_row(region.bottom()).min(self.rows - 1).max(top);

        for col in left..=right {
            self.set(col, top, b'-');
            self.set(col, bottom, b'=');
        }
        for row in top..=bottom {
            self.set(left, row, b'|');
            self.set(right, row, b'|');
        }
        for (col, row) in [(left, top), (right, top), (left, bottom), (right, bottom)] {
            self.set(col, row, b'+');
        }
        self.text(left + 1, bottom, label);
    }

    /// Write `text` starting at (`col`, `row`), clipped to the grid.
    pub fn text(&mut self, col: usize, row: usize, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            let ch = if ch.is_ascii() && !ch.is_ascii_control() { ch as u8 } else { b'?' };
            self.set(col + i, row, ch);
        }
    }

    /// Print `text` in the bottom-left corner.
    pub fn footer(&mut self, text: &str) {
        if self.rows > 0 {
            self.text(1, self.rows - 1, text);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        if self.cols == 0 {
            return vec![String::new(); self.rows];
        }
        self.cells
            .chunks(self.cols)
            .map(|row| String::from_utf8_lossy(row).into_owned())
            .collect()
    }
}
