use std::io;
use std::thread;
use std::time::Duration;

use linux_embedded_hal::sysfs_gpio::{
	self,
	Direction,
};
use linux_embedded_hal::SysfsPin;

use crate::bitbang::{
	Lines,
	OutPins,
};

fn gpio_error(e: sysfs_gpio::Error) -> io::Error {
	io::Error::new(io::ErrorKind::Other, e.to_string())
}

/// One sysfs GPIO used open drain: released means input (the pull-up
/// takes the line high), low means output driving 0.
pub struct GpioPin {
	pin: SysfsPin,
	released: Option<bool>,
}

impl GpioPin {
	pub fn open(number: u32) -> crate::AResult<Self> {
		with_context!(("couldn't open GPIO {}", number), {
			let pin = SysfsPin::new(number as u64);
			pin.export().map_err(gpio_error)?;
			let mut pin = GpioPin {
				pin,
				released: None,
			};
			// udev needs a moment to fix permissions of a fresh export
			let mut tries = 0;
			while let Err(e) = pin.set(true) {
				tries += 1;
				if tries >= 50 {
					return Err(e.into());
				}
				thread::sleep(Duration::from_millis(2));
			}
			Ok(pin)
		})
	}

	pub fn number(&self) -> u64 {
		self.pin.get_pin_num()
	}

	pub fn set(&mut self, level: bool) -> io::Result<()> {
		if self.released == Some(level) {
			return Ok(());
		}
		// "low" switches to output with value 0 in one step
		let direction = if level { Direction::In } else { Direction::Low };
		self.pin.set_direction(direction).map_err(gpio_error)?;
		self.released = Some(level);
		Ok(())
	}

	pub fn get(&mut self) -> io::Result<bool> {
		Ok(self.pin.get_value().map_err(gpio_error)? != 0)
	}
}

impl Drop for GpioPin {
	fn drop(&mut self) {
		// leave the line released for other bus users
		let _ = self.set(true);
	}
}

pub struct GpioLines {
	clock: GpioPin,
	data: GpioPin,
}

impl GpioLines {
	pub fn open(sda: u32, scl: u32) -> crate::AResult<Self> {
		if sda == scl {
			bail!("SDA and SCL need different GPIOs (both {})", sda);
		}
		let data = GpioPin::open(sda)?;
		let clock = GpioPin::open(scl)?;
		info!("bit-banged I2C on GPIO {} (SDA) / {} (SCL)", data.number(), clock.number());
		Ok(GpioLines { clock, data })
	}
}

impl Lines for GpioLines {
	fn set_pins(&mut self, pins: OutPins) -> io::Result<()> {
		// keep DATA stable while CLOCK is high
		if pins.clock {
			self.data.set(pins.data)?;
			self.clock.set(true)
		} else {
			self.clock.set(false)?;
			self.data.set(pins.data)
		}
	}

	fn read_data(&mut self) -> io::Result<bool> {
		self.data.get()
	}
}
