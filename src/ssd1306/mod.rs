/// Driver for SSD1306 based 128x64 monochrome OLED panels.
///
/// Every transfer starts with a control byte: `0x00` makes the rest of the
/// transfer commands, `0x40` makes it display RAM data. The panel is run in
/// horizontal addressing mode; data fills the current address window
/// column by column and wraps to the next page on the controller side.

use crate::bus::I2cBus;
use crate::error::{
	DeviceError,
	transfer_buffer,
};

pub mod font;
mod framebuffer;

pub use self::framebuffer::FrameBuffer;

pub const DEFAULT_ADDRESS: u8 = 0x3c;

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
pub const PAGES: usize = HEIGHT / 8;
pub const FRAME_SIZE: usize = WIDTH * PAGES;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

#[allow(dead_code)]
pub mod cmd {
	pub const SET_MEMORY_MODE: u8 = 0x20;
	pub const SET_COLUMN_ADDRESS: u8 = 0x21;
	pub const SET_PAGE_ADDRESS: u8 = 0x22;
	pub const SET_START_LINE: u8 = 0x40;
	pub const SET_CONTRAST: u8 = 0x81;
	pub const CHARGE_PUMP: u8 = 0x8d;
	pub const SEGMENT_REMAP: u8 = 0xa1;
	pub const DISPLAY_RAM: u8 = 0xa4;
	pub const NORMAL: u8 = 0xa6; // | 1: inverted
	pub const MULTIPLEX: u8 = 0xa8;
	pub const DISPLAY_OFF: u8 = 0xae; // | 1: on
	pub const DISPLAY_ON: u8 = 0xaf;
	pub const PAGE_START: u8 = 0xb0; // | page
	pub const COLUMN_LOW: u8 = 0x00; // | low nibble
	pub const COLUMN_HIGH: u8 = 0x10; // | high nibble
	pub const COM_SCAN_DEC: u8 = 0xc8;
	pub const DISPLAY_OFFSET: u8 = 0xd3;
	pub const CLOCK_DIV: u8 = 0xd5;
	pub const PRECHARGE: u8 = 0xd9;
	pub const COM_PINS: u8 = 0xda;
	pub const VCOMH: u8 = 0xdb;
}

/// Power-up sequence for a 128x64 panel with internal charge pump; each
/// entry (command plus arguments) is sent as its own command transfer.
pub const INIT_SEQUENCE: &[&[u8]] = &[
	&[cmd::DISPLAY_OFF],
	&[cmd::CLOCK_DIV, 0x80],
	&[cmd::MULTIPLEX, 0x3f],
	&[cmd::DISPLAY_OFFSET, 0x00],
	&[cmd::SET_START_LINE],
	&[cmd::CHARGE_PUMP, 0x14],
	&[cmd::SET_MEMORY_MODE, 0x00], // horizontal
	&[cmd::SEGMENT_REMAP],
	&[cmd::COM_SCAN_DEC],
	&[cmd::COM_PINS, 0x12],
	&[cmd::SET_CONTRAST, 0x7f],
	&[cmd::PRECHARGE, 0xf1],
	&[cmd::VCOMH, 0x40],
	&[cmd::DISPLAY_RAM],
	&[cmd::NORMAL],
	&[cmd::DISPLAY_ON],
];

pub struct Ssd1306<B: I2cBus> {
	bus: B,
	address: u8,
}

impl<B: I2cBus> Ssd1306<B> {
	pub fn new(bus: B, address: u8) -> Self {
		Ssd1306 { bus, address }
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn bus(&self) -> &B {
		&self.bus
	}

	pub fn bus_mut(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn release(self) -> B {
		self.bus
	}

	// payload bytes per transfer after the control byte
	fn chunk_size(&self) -> crate::AResult<usize> {
		let max = self.bus.max_transfer();
		if max < 2 {
			return Err(DeviceError::invalid(format!("maximum transfer size {} leaves no room for data", max)).into());
		}
		Ok(max - 1)
	}

	fn send(&mut self, control: u8, bytes: &[u8]) -> crate::AResult<()> {
		let chunk = self.chunk_size()?;
		let mut buf = transfer_buffer(chunk.min(bytes.len()) + 1)?;
		for part in bytes.chunks(chunk) {
			buf.clear();
			buf.push(control);
			buf.extend_from_slice(part);
			self.bus.write(self.address, &buf)?;
		}
		Ok(())
	}

	pub fn command(&mut self, command: &[u8]) -> crate::AResult<()> {
		debug!("SSD1306 0x{:02x}: command {:02x?}", self.address, command);
		self.send(CONTROL_COMMAND, command)
	}

	pub fn data(&mut self, data: &[u8]) -> crate::AResult<()> {
		self.send(CONTROL_DATA, data)
	}

	pub fn init(&mut self) -> crate::AResult<()> {
		for command in INIT_SEQUENCE {
			self.command(command)?;
		}
		info!("SSD1306 0x{:02x}: initialized", self.address);
		Ok(())
	}

	pub fn set_address_window(&mut self, col_start: u8, col_end: u8, page_start: u8, page_end: u8) -> crate::AResult<()> {
		if col_start > col_end || col_end as usize >= WIDTH {
			return Err(DeviceError::invalid(format!("column window {}..={} not within 0..={}", col_start, col_end, WIDTH - 1)).into());
		}
		if page_start > page_end || page_end as usize >= PAGES {
			return Err(DeviceError::invalid(format!("page window {}..={} not within 0..={}", page_start, page_end, PAGES - 1)).into());
		}
		self.command(&[cmd::SET_COLUMN_ADDRESS, col_start, col_end])?;
		self.command(&[cmd::SET_PAGE_ADDRESS, page_start, page_end])
	}

	pub fn set_cursor(&mut self, page: u8, column: u8) -> crate::AResult<()> {
		if page as usize >= PAGES || column as usize >= WIDTH {
			return Err(DeviceError::invalid(format!("cursor page {} column {} off screen", page, column)).into());
		}
		self.command(&[
			cmd::PAGE_START | page,
			cmd::COLUMN_LOW | (column & 0x0f),
			cmd::COLUMN_HIGH | (column >> 4),
		])
	}

	pub fn write_frame(&mut self, frame: &[u8]) -> crate::AResult<()> {
		if frame.len() != FRAME_SIZE {
			return Err(DeviceError::invalid(format!("frame has {} bytes, expected {}", frame.len(), FRAME_SIZE)).into());
		}
		self.set_address_window(0, (WIDTH - 1) as u8, 0, (PAGES - 1) as u8)?;
		self.data(frame)?;
		trace!("SSD1306 0x{:02x}: frame written", self.address);
		Ok(())
	}

	pub fn clear(&mut self) -> crate::AResult<()> {
		self.write_frame(&[0u8; FRAME_SIZE])
	}

	pub fn put_char(&mut self, c: char) -> crate::AResult<()> {
		let mut columns = [0u8; font::ADVANCE];
		columns[..font::GLYPH_WIDTH].copy_from_slice(&font::glyph(c));
		self.data(&columns)
	}

	pub fn put_str(&mut self, s: &str) -> crate::AResult<()> {
		let count = s.chars().count();
		let mut columns = transfer_buffer(count * font::ADVANCE)?;
		for c in s.chars() {
			columns.extend_from_slice(&font::glyph(c));
			columns.push(0x00);
		}
		self.data(&columns)
	}

	pub fn set_contrast(&mut self, contrast: u8) -> crate::AResult<()> {
		self.command(&[cmd::SET_CONTRAST, contrast])
	}

	pub fn set_inverted(&mut self, inverted: bool) -> crate::AResult<()> {
		self.command(&[cmd::NORMAL | inverted as u8])
	}

	pub fn set_display_on(&mut self, on: bool) -> crate::AResult<()> {
		self.command(&[cmd::DISPLAY_OFF | on as u8])
	}
}
