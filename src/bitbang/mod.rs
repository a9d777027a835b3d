/// Software ("bit-banged") I2C master over two open drain lines.
///
/// Line protocol:
/// - START: DATA falls while CLOCK is high
/// - STOP: DATA rises while CLOCK is high
/// - everything else changes DATA only while CLOCK is low; the receiver
///   samples DATA while CLOCK is high
/// - bytes are sent most significant bit first, followed by a ninth clock
///   in which the receiver pulls DATA low to acknowledge (ACK) or leaves it
///   high (NACK)
/// - a master reading bytes ACKs every byte but the last one
///
/// A transaction is START, address byte (7-bit address, R/W bit), data
/// bytes, STOP. A second START without STOP ("repeated start") switches
/// from writing to reading without releasing the bus.

mod lines;
mod low_level;
mod sim;
mod transaction;

pub use self::lines::{
	DEFAULT_SETTLE,
	Delay,
	Lines,
	NoDelay,
	OutPins,
	SleepDelay,
	reliable_sleep,
};

pub use self::sim::{
	RegisterDevice,
	Registers,
	Segment,
	SimDevice,
	SimEvent,
	SimLines,
	SinkDevice,
};

pub use self::transaction::Transaction;

use crate::bus::{
	AckPolicy,
	DEFAULT_MAX_TRANSFER,
	I2cBus,
};
use crate::error::DeviceError;

pub struct BitBangBus<L: Lines, D: Delay> {
	lines: L,
	delay: D,
	pins: OutPins,
	policy: AckPolicy,
	max_transfer: usize,
}

impl<L: Lines, D: Delay> BitBangBus<L, D> {
	/// assumes the lines are idle (both released)
	pub fn new(lines: L, delay: D) -> Self {
		BitBangBus {
			lines,
			delay,
			pins: OutPins::IDLE,
			policy: AckPolicy::default(),
			max_transfer: DEFAULT_MAX_TRANSFER,
		}
	}

	pub fn with_policy(mut self, policy: AckPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn with_max_transfer(mut self, max_transfer: usize) -> Self {
		self.max_transfer = max_transfer;
		self
	}

	pub fn policy(&self) -> AckPolicy {
		self.policy
	}

	pub fn set_policy(&mut self, policy: AckPolicy) {
		self.policy = policy;
	}

	pub fn lines(&self) -> &L {
		&self.lines
	}

	pub fn lines_mut(&mut self) -> &mut L {
		&mut self.lines
	}
}

// once addressed for reading the device drives DATA until the master
// NACKs a byte; without any byte to NACK STOP can't release the bus
fn check_read_len(buf: &[u8]) -> crate::AResult<()> {
	if buf.is_empty() {
		return Err(DeviceError::invalid("empty read").into());
	}
	Ok(())
}

impl<L: Lines, D: Delay> I2cBus for BitBangBus<L, D> {
	fn write(&mut self, address: u8, data: &[u8]) -> crate::AResult<()> {
		let mut tx = self.begin_write(address)?;
		tx.write(data)
	}

	fn read(&mut self, address: u8, buf: &mut [u8]) -> crate::AResult<()> {
		check_read_len(buf)?;
		let mut tx = self.begin_read(address)?;
		tx.read(buf)
	}

	fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> crate::AResult<()> {
		check_read_len(buf)?;
		let mut tx = self.begin_write(address)?;
		tx.write(data)?;
		tx.restart_read()?;
		tx.read(buf)
	}

	fn max_transfer(&self) -> usize {
		self.max_transfer
	}
}
