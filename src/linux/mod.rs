// Real hardware backends. For now linux only.

mod gpio;
mod i2cdev;

pub use self::gpio::{
	GpioLines,
	GpioPin,
};

pub use self::i2cdev::LinuxI2c;
