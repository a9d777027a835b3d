use embedded_hal::i2c::{
	Error as _,
	ErrorKind,
	I2c,
	NoAcknowledgeSource,
};
use linux_embedded_hal::{
	I2CError,
	I2cdev,
};

use crate::bus::{
	DEFAULT_MAX_TRANSFER,
	I2cBus,
};
use crate::error::{
	DeviceError,
	Stage,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Op {
	Write,
	Read,
	WriteRead,
}

// only the kind of a missing ACK is known, not the byte it happened on
fn nack_stage(kind: ErrorKind, op: Op) -> Option<Stage> {
	match kind {
		ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => Some(match op {
			Op::Write => Stage::AddressWrite,
			Op::Read => Stage::AddressRead,
			Op::WriteRead => Stage::Address,
		}),
		ErrorKind::NoAcknowledge(_) => Some(Stage::Unknown),
		_ => None,
	}
}

// kernel messages carry a 16-bit length
fn check_len(len: usize) -> crate::AResult<()> {
	if len > u16::max_value() as usize {
		return Err(DeviceError::invalid(format!("transfer of {} bytes too long", len)).into());
	}
	Ok(())
}

pub struct LinuxI2c {
	dev: I2cdev,
	bus: u32,
	max_transfer: usize,
}

impl LinuxI2c {
	pub fn open(bus: u32) -> crate::AResult<Self> {
		let path = format!("/dev/i2c-{}", bus);
		with_context!(("couldn't open {}", path), {
			let dev = I2cdev::new(&path).map_err(|e| format_err!("{}", e))?;
			info!("native I2C on {}", path);
			Ok(LinuxI2c {
				dev,
				bus,
				max_transfer: DEFAULT_MAX_TRANSFER,
			})
		})
	}

	pub fn with_max_transfer(mut self, max_transfer: usize) -> Self {
		self.max_transfer = max_transfer;
		self
	}

	fn transfer_error(&self, address: u8, op: Op, e: I2CError) -> failure::Error {
		match nack_stage(e.kind(), op) {
			Some(stage) => DeviceError::Nack { address, stage }.into(),
			None => format_err!("I2C-{} 0x{:02x}: transfer failed: {:?}", self.bus, address, e),
		}
	}
}

impl I2cBus for LinuxI2c {
	fn write(&mut self, address: u8, data: &[u8]) -> crate::AResult<()> {
		check_len(data.len())?;
		trace!("I2C-{} 0x{:02x}: write {:02x?}", self.bus, address, data);
		match self.dev.write(address, data) {
			Ok(()) => Ok(()),
			Err(e) => Err(self.transfer_error(address, Op::Write, e)),
		}
	}

	fn read(&mut self, address: u8, buf: &mut [u8]) -> crate::AResult<()> {
		check_len(buf.len())?;
		if let Err(e) = self.dev.read(address, buf) {
			return Err(self.transfer_error(address, Op::Read, e));
		}
		trace!("I2C-{} 0x{:02x}: read {:02x?}", self.bus, address, buf);
		Ok(())
	}

	fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> crate::AResult<()> {
		check_len(data.len())?;
		check_len(buf.len())?;
		if let Err(e) = self.dev.write_read(address, data, buf) {
			return Err(self.transfer_error(address, Op::WriteRead, e));
		}
		trace!("I2C-{} 0x{:02x}: write {:02x?}, read {:02x?}", self.bus, address, data, buf);
		Ok(())
	}

	fn max_transfer(&self) -> usize {
		self.max_transfer
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_oversized_message() {
		assert!(check_len(33).is_ok());
		assert!(check_len(70_000).is_err());
	}

	#[test]
	fn missing_adapter_reports_path() {
		let err = match LinuxI2c::open(9999) {
			Ok(_) => panic!("/dev/i2c-9999 shouldn't exist"),
			Err(e) => e,
		};
		assert!(err.to_string().starts_with("couldn't open /dev/i2c-9999"));
	}

	#[test]
	fn missing_ack_names_known_stage_only() {
		let address = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
		assert_eq!(nack_stage(address, Op::Write), Some(Stage::AddressWrite));
		assert_eq!(nack_stage(address, Op::Read), Some(Stage::AddressRead));
		// the read half of a combined transfer may be the one that failed
		assert_eq!(nack_stage(address, Op::WriteRead), Some(Stage::Address));
		let data = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data);
		assert_eq!(nack_stage(data, Op::Write), Some(Stage::Unknown));
		assert_eq!(nack_stage(ErrorKind::Bus, Op::Read), None);
	}
}
