use super::{
	BitBangBus,
	Delay,
	Lines,
	OutPins,
};

// Line level primitives. Every transition is followed by one settle delay.
impl<L: Lines, D: Delay> BitBangBus<L, D> {
	fn drive(&mut self, pins: OutPins) -> crate::AResult<()> {
		self.lines.set_pins(pins)?;
		self.pins = pins;
		self.delay.settle();
		Ok(())
	}

	fn set_clock(&mut self, clock: bool) -> crate::AResult<()> {
		let pins = self.pins.with_clock(clock);
		self.drive(pins)
	}

	fn set_data(&mut self, data: bool) -> crate::AResult<()> {
		let pins = self.pins.with_data(data);
		self.drive(pins)
	}

	/// DATA falls while CLOCK is high, then CLOCK is pulled low.
	///
	/// Also used as repeated start: CLOCK is low after the previous ACK
	/// clock, so DATA gets released first and only then CLOCK.
	pub fn start(&mut self) -> crate::AResult<()> {
		self.set_data(true)?;
		self.set_clock(true)?;
		self.set_data(false)?;
		self.set_clock(false)
	}

	pub fn stop(&mut self) -> crate::AResult<()> {
		self.set_data(false)?;
		self.set_clock(true)?;
		self.set_data(true)
	}

	fn write_bit(&mut self, bit: bool) -> crate::AResult<()> {
		self.set_data(bit)?;
		self.set_clock(true)?;
		self.set_clock(false)
	}

	// DATA must already be released
	fn read_bit(&mut self) -> crate::AResult<bool> {
		self.set_clock(true)?;
		let bit = self.lines.read_data()?;
		self.set_clock(false)?;
		Ok(bit)
	}

	pub fn write_byte(&mut self, byte: u8) -> crate::AResult<()> {
		for bit in (0..8).rev() {
			self.write_bit(0 != byte & (1u8 << bit))?;
		}
		Ok(())
	}

	/// release DATA for the ninth clock; `true` if the receiver pulled it
	/// low (ACK)
	pub fn wait_ack(&mut self) -> crate::AResult<bool> {
		self.set_data(true)?;
		Ok(!self.read_bit()?)
	}

	/// receive 8 bits, starting with the highest, then ACK (`send_ack`) or
	/// NACK the byte
	pub fn read_byte(&mut self, send_ack: bool) -> crate::AResult<u8> {
		self.set_data(true)?;
		let mut byte = 0u8;
		for _ in 0..8 {
			byte <<= 1;
			if self.read_bit()? {
				byte |= 1;
			}
		}
		self.write_bit(!send_ack)?;
		Ok(byte)
	}
}
