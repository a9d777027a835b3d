// Startup configuration: which bus backend to use and where the devices
// are. Fixed once the buses are opened.

use std::fmt;
use std::str;
use std::time::Duration;

use crate::bitbang::{
	BitBangBus,
	DEFAULT_SETTLE,
	NoDelay,
	RegisterDevice,
	SimLines,
	SinkDevice,
	SleepDelay,
};
use crate::bus::{
	AckPolicy,
	DEFAULT_MAX_TRANSFER,
	I2cBus,
	SharedBus,
};
use crate::error::DeviceError;
use crate::linux::{
	GpioLines,
	LinuxI2c,
};
use crate::mpu6050::{
	self,
	SensorSample,
};
use crate::ssd1306;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Backend {
	Sim,
	BitBang,
	Native,
}

impl Default for Backend {
	fn default() -> Self {
		Backend::Sim
	}
}

impl fmt::Display for Backend {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Backend::Sim => write!(f, "sim"),
			Backend::BitBang => write!(f, "bitbang"),
			Backend::Native => write!(f, "native"),
		}
	}
}

impl str::FromStr for Backend {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sim" => Ok(Backend::Sim),
			"bitbang" => Ok(Backend::BitBang),
			"native" => Ok(Backend::Native),
			_ => Err(DeviceError::invalid(format!("unknown backend {:?} (expected sim, bitbang or native)", s)).into()),
		}
	}
}

pub fn parse_number(s: &str) -> crate::AResult<u32> {
	let r = if s.starts_with("0x") || s.starts_with("0X") {
		u32::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<u32>()
	};
	r.map_err(|e| DeviceError::invalid(format!("invalid number {:?}: {}", s, e)).into())
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DeviceAddress(pub u8);

impl fmt::Display for DeviceAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl str::FromStr for DeviceAddress {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let a = parse_number(s)?;
		if a > 0x7f {
			return Err(DeviceError::invalid(format!("device address {} doesn't fit in 7 bits", s)).into());
		}
		Ok(DeviceAddress(a as u8))
	}
}

/// Register content of the simulated sensor: at rest, flat, about 26°C.
pub const SIM_SAMPLE: SensorSample = SensorSample {
	accel_x: 312,
	accel_y: -148,
	accel_z: 16384,
	temperature: -3500,
	gyro_x: 12,
	gyro_y: -7,
	gyro_z: 3,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Config {
	pub backend: Backend,
	pub bus: u32,
	pub sda: u32,
	pub scl: u32,
	pub sensor_address: u8,
	pub display_address: u8,
	pub policy: AckPolicy,
	pub settle: Duration,
	pub max_transfer: usize,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			backend: Backend::default(),
			bus: 1,
			sda: 2,
			scl: 3,
			sensor_address: mpu6050::DEFAULT_ADDRESS,
			display_address: ssd1306::DEFAULT_ADDRESS,
			policy: AckPolicy::default(),
			settle: DEFAULT_SETTLE,
			max_transfer: DEFAULT_MAX_TRANSFER,
		}
	}
}

impl Config {
	pub fn validate(&self) -> crate::AResult<()> {
		for &address in &[self.sensor_address, self.display_address] {
			if address > 0x7f {
				return Err(DeviceError::invalid(format!("device address 0x{:02x} doesn't fit in 7 bits", address)).into());
			}
		}
		if self.sensor_address == self.display_address {
			return Err(DeviceError::invalid(format!("sensor and display share address 0x{:02x}", self.sensor_address)).into());
		}
		if self.max_transfer < 2 {
			return Err(DeviceError::invalid(format!("maximum transfer size {} too small", self.max_transfer)).into());
		}
		if self.backend == Backend::BitBang && self.sda == self.scl {
			return Err(DeviceError::invalid(format!("SDA and SCL both on GPIO {}", self.sda)).into());
		}
		Ok(())
	}

	pub fn sim_lines(&self) -> SimLines {
		let sensor = RegisterDevice::new(self.sensor_address);
		let registers = sensor.registers();
		registers.set(mpu6050::regs::WHO_AM_I, mpu6050::WHO_AM_I_VALUE);
		registers.set(mpu6050::regs::PWR_MGMT_1, 0x40);
		registers.load(mpu6050::regs::ACCEL_XOUT_H, &SIM_SAMPLE.to_registers());
		SimLines::new()
			.quiet()
			.with_device(sensor)
			.with_device(SinkDevice::new(self.display_address))
	}

	pub fn open_bus(&self) -> crate::AResult<SharedBus<dyn I2cBus + Send>> {
		self.validate()?;
		let bus: SharedBus<dyn I2cBus + Send> = match self.backend {
			Backend::Sim => {
				info!("simulated I2C bus (sensor 0x{:02x}, display 0x{:02x})", self.sensor_address, self.display_address);
				SharedBus::boxed(BitBangBus::new(self.sim_lines(), NoDelay)
					.with_policy(self.policy)
					.with_max_transfer(self.max_transfer))
			},
			Backend::BitBang => {
				let lines = GpioLines::open(self.sda, self.scl)?;
				SharedBus::boxed(BitBangBus::new(lines, SleepDelay { edge: self.settle })
					.with_policy(self.policy)
					.with_max_transfer(self.max_transfer))
			},
			Backend::Native => {
				if self.policy != AckPolicy::Abort {
					warn!("native I2C always aborts on NACK, ignoring policy {}", self.policy);
				}
				SharedBus::boxed(LinuxI2c::open(self.bus)?.with_max_transfer(self.max_transfer))
			},
		};
		Ok(bus)
	}
}
