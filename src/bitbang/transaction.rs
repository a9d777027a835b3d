use std::ops::{
	Deref,
	DerefMut,
};

use super::{
	BitBangBus,
	Delay,
	Lines,
};
use crate::bus::AckPolicy;
use crate::error::{
	DeviceError,
	Stage,
};

/// An open transaction: created after START, sends STOP when dropped.
pub struct Transaction<'a, L: Lines + 'a, D: Delay + 'a> {
	bus: &'a mut BitBangBus<L, D>,
	address: u8,
	written: usize,
}

impl<L: Lines, D: Delay> BitBangBus<L, D> {
	fn begin(&mut self, address: u8) -> crate::AResult<Transaction<L, D>> {
		if address > 0x7f {
			return Err(DeviceError::invalid(format!("device address 0x{:02x} doesn't fit in 7 bits", address)).into());
		}
		self.start()?;
		Ok(Transaction {
			bus: self,
			address,
			written: 0,
		})
	}

	pub fn begin_write(&mut self, address: u8) -> crate::AResult<Transaction<L, D>> {
		let mut tx = self.begin(address)?;
		tx.send_address(false)?;
		Ok(tx)
	}

	pub fn begin_read(&mut self, address: u8) -> crate::AResult<Transaction<L, D>> {
		let mut tx = self.begin(address)?;
		tx.send_address(true)?;
		Ok(tx)
	}
}

impl<'a, L: Lines, D: Delay> Transaction<'a, L, D> {
	// a missing ACK only fails the transaction with `AckPolicy::Abort`
	fn check_ack(&mut self, stage: Stage) -> crate::AResult<()> {
		if self.bus.wait_ack()? {
			return Ok(());
		}
		match self.bus.policy {
			AckPolicy::Abort => Err(DeviceError::Nack {
				address: self.address,
				stage,
			}.into()),
			AckPolicy::Continue => {
				warn!("I2C 0x{:02x}: no ACK for {}, continuing", self.address, stage);
				Ok(())
			},
		}
	}

	fn send_address(&mut self, read: bool) -> crate::AResult<()> {
		let byte = (self.address << 1) | (read as u8);
		trace!("I2C 0x{:02x}: address byte 0x{:02x}", self.address, byte);
		self.bus.write_byte(byte)?;
		self.check_ack(if read { Stage::AddressRead } else { Stage::AddressWrite })
	}

	pub fn write(&mut self, data: &[u8]) -> crate::AResult<()> {
		for &byte in data {
			trace!("I2C 0x{:02x}: write 0x{:02x}", self.address, byte);
			self.bus.write_byte(byte)?;
			let stage = Stage::Data(self.written);
			self.written += 1;
			self.check_ack(stage)?;
		}
		Ok(())
	}

	pub fn restart_read(&mut self) -> crate::AResult<()> {
		self.bus.start()?;
		self.send_address(true)
	}

	pub fn read(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		let len = target.len();
		for (i, t) in target.iter_mut().enumerate() {
			*t = self.bus.read_byte(i + 1 < len)?;
			trace!("I2C 0x{:02x}: read 0x{:02x}", self.address, *t);
		}
		Ok(())
	}
}

impl<'a, L: Lines, D: Delay> Drop for Transaction<'a, L, D> {
	fn drop(&mut self) {
		if let Err(e) = self.bus.stop() {
			error!("I2C 0x{:02x}: failed to send STOP: {}", self.address, e);
		}
	}
}

impl<'a, L: Lines, D: Delay> Deref for Transaction<'a, L, D> {
	type Target = BitBangBus<L, D>;

	fn deref(&self) -> &Self::Target {
		&self.bus
	}
}

impl<'a, L: Lines, D: Delay> DerefMut for Transaction<'a, L, D> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.bus
	}
}
