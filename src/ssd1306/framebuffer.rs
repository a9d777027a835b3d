use super::font::{
	self,
	ADVANCE,
};
use super::{
	FRAME_SIZE,
	HEIGHT,
	WIDTH,
};

/// 128x64 raster in controller RAM layout: 8 pages of 128 columns, bit N of
/// a byte is row `page * 8 + N`.
#[derive(Clone)]
pub struct FrameBuffer {
	bytes: [u8; FRAME_SIZE],
}

impl Default for FrameBuffer {
	fn default() -> Self {
		FrameBuffer::new()
	}
}

impl FrameBuffer {
	pub fn new() -> Self {
		FrameBuffer { bytes: [0u8; FRAME_SIZE] }
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes[..]
	}

	pub fn clear(&mut self) {
		self.bytes = [0u8; FRAME_SIZE];
	}

	fn locate(x: usize, y: usize) -> Option<(usize, u8)> {
		if x >= WIDTH || y >= HEIGHT {
			return None;
		}
		Some(((y / 8) * WIDTH + x, 1u8 << (y % 8)))
	}

	pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
		if let Some((index, mask)) = FrameBuffer::locate(x, y) {
			if on {
				self.bytes[index] |= mask;
			} else {
				self.bytes[index] &= !mask;
			}
		}
	}

	pub fn pixel(&self, x: usize, y: usize) -> bool {
		match FrameBuffer::locate(x, y) {
			Some((index, mask)) => 0 != self.bytes[index] & mask,
			None => false,
		}
	}

	pub fn draw_char(&mut self, x: usize, y: usize, c: char, scale: usize) {
		let scale = scale.max(1);
		for (col, bits) in font::glyph(c).iter().enumerate() {
			for row in 0..8 {
				if 0 == bits & (1 << row) {
					continue;
				}
				for dx in 0..scale {
					for dy in 0..scale {
						self.set_pixel(x + col * scale + dx, y + row * scale + dy, true);
					}
				}
			}
		}
	}

	pub fn draw_text(&mut self, x: usize, y: usize, text: &str, scale: usize) -> usize {
		let advance = ADVANCE * scale.max(1);
		let mut x = x;
		for c in text.chars() {
			self.draw_char(x, y, c, scale);
			x += advance;
		}
		x
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pixel_maps_to_page_bit() {
		let mut fb = FrameBuffer::new();
		fb.set_pixel(5, 10, true);
		assert_eq!(fb.as_bytes()[WIDTH + 5], 0x04);
		assert!(fb.pixel(5, 10));
		fb.set_pixel(5, 10, false);
		assert!(fb.as_bytes().iter().all(|b| *b == 0));
	}

	#[test]
	fn out_of_bounds_is_clipped() {
		let mut fb = FrameBuffer::new();
		fb.set_pixel(WIDTH, 0, true);
		fb.set_pixel(0, HEIGHT, true);
		assert!(fb.as_bytes().iter().all(|b| *b == 0));
		// partially visible glyph at the right edge
		fb.draw_char(WIDTH - 2, 0, 'H', 1);
		assert_eq!(&fb.as_bytes()[WIDTH - 2..WIDTH], &[0x7f, 0x08]);
	}

	#[test]
	fn text_uses_font_columns_and_advance() {
		let mut fb = FrameBuffer::new();
		let end = fb.draw_text(0, 0, "10", 1);
		assert_eq!(end, 12);
		assert_eq!(&fb.as_bytes()[0..12], &[
			0x00, 0x42, 0x7f, 0x40, 0x00, 0x00,
			0x3e, 0x51, 0x49, 0x45, 0x3e, 0x00,
		]);
	}

	#[test]
	fn scaled_text_doubles_pixels() {
		let mut fb = FrameBuffer::new();
		assert_eq!(fb.draw_text(0, 0, "-", 2), 12);
		// '-' is row 3 of columns 0..5, now rows 6..8 of columns 0..10
		for x in 0..10 {
			assert!(fb.pixel(x, 6) && fb.pixel(x, 7));
			assert!(!fb.pixel(x, 5) && !fb.pixel(x, 8));
		}
		assert!(!fb.pixel(10, 6));
	}
}
