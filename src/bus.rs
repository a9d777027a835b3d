use std::fmt;
use std::str;
use std::sync::Arc;

use parking_lot::{
	Mutex,
	MutexGuard,
};

use crate::error::DeviceError;

pub const DEFAULT_MAX_TRANSFER: usize = 33;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AckPolicy {
	Abort,
	Continue,
}

impl Default for AckPolicy {
	fn default() -> Self {
		AckPolicy::Abort
	}
}

impl fmt::Display for AckPolicy {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			AckPolicy::Abort => write!(f, "abort"),
			AckPolicy::Continue => write!(f, "continue"),
		}
	}
}

impl str::FromStr for AckPolicy {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"abort" => Ok(AckPolicy::Abort),
			"continue" => Ok(AckPolicy::Continue),
			_ => Err(DeviceError::invalid(format!("unknown ACK policy {:?} (expected abort or continue)", s)).into()),
		}
	}
}

pub trait I2cBus {
	fn write(&mut self, address: u8, data: &[u8]) -> crate::AResult<()>;

	fn read(&mut self, address: u8, buf: &mut [u8]) -> crate::AResult<()>;

	fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> crate::AResult<()>;

	fn max_transfer(&self) -> usize {
		DEFAULT_MAX_TRANSFER
	}
}

impl<'a, B: ?Sized + I2cBus> I2cBus for &'a mut B {
	fn write(&mut self, address: u8, data: &[u8]) -> crate::AResult<()> {
		B::write(*self, address, data)
	}

	fn read(&mut self, address: u8, buf: &mut [u8]) -> crate::AResult<()> {
		B::read(*self, address, buf)
	}

	fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> crate::AResult<()> {
		B::write_read(*self, address, data, buf)
	}

	fn max_transfer(&self) -> usize {
		B::max_transfer(*self)
	}
}

impl<B: ?Sized + I2cBus> I2cBus for Box<B> {
	fn write(&mut self, address: u8, data: &[u8]) -> crate::AResult<()> {
		B::write(self, address, data)
	}

	fn read(&mut self, address: u8, buf: &mut [u8]) -> crate::AResult<()> {
		B::read(self, address, buf)
	}

	fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> crate::AResult<()> {
		B::write_read(self, address, data, buf)
	}

	fn max_transfer(&self) -> usize {
		B::max_transfer(self)
	}
}

/// Bus shared between several device drivers (and threads).
///
/// The lock is held for one transaction at a time, so transactions from
/// different users never interleave on the wire.
pub struct SharedBus<B: ?Sized> {
	inner: Arc<Mutex<B>>,
}

impl<B: ?Sized> Clone for SharedBus<B> {
	fn clone(&self) -> Self {
		SharedBus { inner: self.inner.clone() }
	}
}

impl<B: I2cBus> SharedBus<B> {
	pub fn new(bus: B) -> Self {
		SharedBus { inner: Arc::new(Mutex::new(bus)) }
	}
}

impl<B: ?Sized + I2cBus> SharedBus<B> {
	pub fn lock(&self) -> MutexGuard<B> {
		self.inner.lock()
	}
}

impl SharedBus<dyn I2cBus + Send> {
	pub fn boxed<B: I2cBus + Send + 'static>(bus: B) -> Self {
		let inner: Arc<Mutex<dyn I2cBus + Send>> = Arc::new(Mutex::new(bus));
		SharedBus { inner }
	}
}

impl<B: ?Sized + I2cBus> I2cBus for SharedBus<B> {
	fn write(&mut self, address: u8, data: &[u8]) -> crate::AResult<()> {
		self.inner.lock().write(address, data)
	}

	fn read(&mut self, address: u8, buf: &mut [u8]) -> crate::AResult<()> {
		self.inner.lock().read(address, buf)
	}

	fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> crate::AResult<()> {
		self.inner.lock().write_read(address, data, buf)
	}

	fn max_transfer(&self) -> usize {
		self.inner.lock().max_transfer()
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use super::*;
	use crate::bitbang::{
		BitBangBus,
		NoDelay,
		RegisterDevice,
		SimEvent,
		SimLines,
	};

	#[test]
	fn parses_policy() {
		assert_eq!("abort".parse::<AckPolicy>().unwrap(), AckPolicy::Abort);
		assert_eq!("continue".parse::<AckPolicy>().unwrap(), AckPolicy::Continue);
		assert!("retry".parse::<AckPolicy>().is_err());
		assert_eq!(AckPolicy::default(), AckPolicy::Abort);
	}

	#[test]
	fn concurrent_users_do_not_interleave() {
		let lines = SimLines::new()
			.with_device(RegisterDevice::new(0x68))
			.with_device(RegisterDevice::new(0x3c));
		let shared = SharedBus::new(BitBangBus::new(lines, NoDelay));

		let workers: Vec<_> = [0x68u8, 0x3c].iter().map(|&address| {
			let mut bus = shared.clone();
			thread::spawn(move || {
				for i in 0..20u8 {
					bus.write(address, &[0x00, i, i, i]).unwrap();
				}
			})
		}).collect();
		for w in workers {
			w.join().unwrap();
		}

		let guard = shared.lock();
		let events = guard.lines().events();
		// every START is followed by its own address and exactly four data
		// bytes before the STOP
		let mut transactions = 0;
		for window in events.split(|e| *e == SimEvent::Stop).filter(|w| !w.is_empty()) {
			assert_eq!(window[0], SimEvent::Start);
			assert_eq!(window.len(), 6);
			transactions += 1;
		}
		assert_eq!(transactions, 40);
	}
}
