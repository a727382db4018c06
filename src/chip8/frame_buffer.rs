use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

/// 64x32 monochrome display, one 64-bit mask per row.
///
/// Bit 63 of a row is column 0. Each row is updated atomically, so a
/// renderer on another thread never observes a torn row.
pub struct FrameBuffer {
    rows: [AtomicU64; DISPLAY_Y],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            rows: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn clear(&self) {
        for row in &self.rows {
            row.store(0, Ordering::Release);
        }
    }

    /// XORs `sprite` onto the display with its top-left corner at (`x`, `y`).
    ///
    /// Columns wrap by rotation and rows wrap modulo the display height.
    /// Returns true if any lit pixel was switched off.
    pub fn draw_sprite(&self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (offset, &byte) in sprite.iter().enumerate() {
            let pattern = sprite_row(byte, x);
            let row = (y as usize + offset) % DISPLAY_Y;

            let old = self.rows[row].fetch_xor(pattern, Ordering::AcqRel);
            let new = old ^ pattern;
            if (old | pattern) ^ new != 0 {
                collision = true;
            }
        }

        collision
    }

    /// Returns the mask of row `y`; panics if `y` is not below [`DISPLAY_Y`].
    pub fn row(&self, y: usize) -> u64 {
        self.rows[y].load(Ordering::Acquire)
    }

    /// Copies every row.
    pub fn rows(&self) -> [u64; DISPLAY_Y] {
        std::array::from_fn(|y| self.row(y))
    }

    /// Whether the pixel at column `x`, row `y` is lit.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_X && y < DISPLAY_Y && self.row(y) & column_bit(x) != 0
    }
}

/// Mask of column `x` within a row.
pub fn column_bit(x: usize) -> u64 {
    1 << (DISPLAY_X - 1 - x)
}

/// Places an 8-pixel sprite row at column `x`, wrapping past column 63 to column 0.
pub fn sprite_row(byte: u8, x: u8) -> u64 {
    ((byte as u64) << (DISPLAY_X - 8)).rotate_right(x as u32 % DISPLAY_X as u32)
}

impl fmt::Display for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row:064b}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_row_at_origin_fills_the_leftmost_columns() {
        assert_eq!(sprite_row(0xF0, 0), 0xF000_0000_0000_0000);
        assert_eq!(sprite_row(0xFF, 56), 0x0000_0000_0000_00FF);
    }

    #[test]
    fn sprite_row_wraps_past_the_right_edge() {
        // The highest bit lands on column 63, the other seven on columns 0-6.
        assert_eq!(sprite_row(0xFF, 63), 0xFE00_0000_0000_0001);
        assert_eq!(sprite_row(0b1010_0101, 60), 0x5000_0000_0000_000A);
        assert_eq!(sprite_row(0x81, 57), 0x8000_0000_0000_0040);
    }

    #[test]
    fn sprite_row_treats_x_modulo_width() {
        assert_eq!(sprite_row(0xC3, 64), sprite_row(0xC3, 0));
        assert_eq!(sprite_row(0xC3, 200), sprite_row(0xC3, 200 - 192));
    }

    #[test]
    fn draw_without_overlap_reports_no_collision() {
        let fb = FrameBuffer::new();
        assert!(!fb.draw_sprite(0, 0, &[0xF0]));
        assert!(!fb.draw_sprite(4, 0, &[0xF0]));
        assert_eq!(fb.row(0), 0xFF00_0000_0000_0000);
    }

    #[test]
    fn redrawing_erases_and_collides() {
        let fb = FrameBuffer::new();
        let sprite = [0x3C, 0x42, 0x81];

        assert!(!fb.draw_sprite(10, 5, &sprite));
        let drawn = fb.rows();
        assert!(fb.draw_sprite(10, 5, &sprite));

        assert_ne!(drawn, [0; DISPLAY_Y]);
        assert_eq!(fb.rows(), [0; DISPLAY_Y]);
    }

    #[test]
    fn rows_wrap_to_the_top() {
        let fb = FrameBuffer::new();
        fb.draw_sprite(0, 30, &[0x80, 0x80, 0x80, 0x80]);

        assert!(fb.pixel(0, 30));
        assert!(fb.pixel(0, 31));
        assert!(fb.pixel(0, 0));
        assert!(fb.pixel(0, 1));
        assert!(!fb.pixel(0, 2));
    }

    #[test]
    fn collision_in_a_single_row_flags_the_whole_draw() {
        let fb = FrameBuffer::new();
        fb.draw_sprite(0, 2, &[0x01]);
        assert!(fb.draw_sprite(0, 0, &[0x00, 0x00, 0x01, 0x00]));
    }

    #[test]
    fn clear_zeroes_every_row() {
        let fb = FrameBuffer::new();
        for y in 0..DISPLAY_Y as u8 {
            fb.draw_sprite(y, y, &[0xFF]);
        }
        fb.clear();
        assert_eq!(fb.rows(), [0; DISPLAY_Y]);
    }

    #[test]
    fn pixel_is_false_outside_the_display() {
        let fb = FrameBuffer::new();
        fb.draw_sprite(0, 0, &[0xFF]);
        assert!(fb.pixel(7, 0));
        assert!(!fb.pixel(64, 0));
        assert!(!fb.pixel(0, 32));
    }
}
