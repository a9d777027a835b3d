// Character device style access: fixed size binary sensor records and
// whole-frame display writes, also usable through `std::io`.

use std::fmt;
use std::io;
use std::str;

use crate::bus::I2cBus;
use crate::error::{
	DeviceError,
	into_io_error,
};
use crate::mpu6050::{
	Mpu6050,
	SensorSample,
};
use crate::ssd1306::{
	FRAME_SIZE,
	Ssd1306,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RecordLayout {
	// accel X/Y/Z as little endian i16 (6 bytes)
	AccelOnly,
	// all seven values in register order as native endian i16 (14 bytes)
	Full,
}

impl Default for RecordLayout {
	fn default() -> Self {
		RecordLayout::Full
	}
}

impl RecordLayout {
	pub fn record_size(self) -> usize {
		match self {
			RecordLayout::AccelOnly => 6,
			RecordLayout::Full => 14,
		}
	}

	pub fn encode(self, sample: &SensorSample, out: &mut [u8]) -> crate::AResult<usize> {
		let size = self.record_size();
		if out.len() < size {
			return Err(DeviceError::invalid(format!("buffer of {} bytes too small for a {} byte record", out.len(), size)).into());
		}
		match self {
			RecordLayout::AccelOnly => {
				let accel = [sample.accel_x, sample.accel_y, sample.accel_z];
				for (dst, value) in out.chunks_mut(2).zip(accel.iter()) {
					dst.copy_from_slice(&value.to_le_bytes());
				}
			},
			RecordLayout::Full => {
				for (dst, value) in out.chunks_mut(2).zip(sample.values().iter()) {
					dst.copy_from_slice(&value.to_ne_bytes());
				}
			},
		}
		Ok(size)
	}
}

impl fmt::Display for RecordLayout {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			RecordLayout::AccelOnly => write!(f, "accel"),
			RecordLayout::Full => write!(f, "full"),
		}
	}
}

impl str::FromStr for RecordLayout {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"accel" => Ok(RecordLayout::AccelOnly),
			"full" => Ok(RecordLayout::Full),
			_ => Err(DeviceError::invalid(format!("unknown record layout {:?} (expected accel or full)", s)).into()),
		}
	}
}

pub struct SensorDevice<B: I2cBus> {
	sensor: Mpu6050<B>,
	layout: RecordLayout,
}

impl<B: I2cBus> SensorDevice<B> {
	pub fn new(sensor: Mpu6050<B>, layout: RecordLayout) -> Self {
		SensorDevice { sensor, layout }
	}

	pub fn layout(&self) -> RecordLayout {
		self.layout
	}

	pub fn sensor_mut(&mut self) -> &mut Mpu6050<B> {
		&mut self.sensor
	}

	/// fill the start of `buf` with one record; short buffers are rejected
	/// without touching the bus
	pub fn read_record(&mut self, buf: &mut [u8]) -> crate::AResult<usize> {
		let size = self.layout.record_size();
		if buf.len() < size {
			return Err(DeviceError::invalid(format!("read of {} bytes, record needs {}", buf.len(), size)).into());
		}
		let sample = self.sensor.read_sample()?;
		self.layout.encode(&sample, buf)
	}
}

impl<B: I2cBus> io::Read for SensorDevice<B> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.read_record(buf).map_err(into_io_error)
	}
}

pub struct DisplayDevice<B: I2cBus> {
	display: Ssd1306<B>,
}

impl<B: I2cBus> DisplayDevice<B> {
	pub fn new(display: Ssd1306<B>) -> Self {
		DisplayDevice { display }
	}

	pub fn display_mut(&mut self) -> &mut Ssd1306<B> {
		&mut self.display
	}

	pub fn write_frame(&mut self, buf: &[u8]) -> crate::AResult<usize> {
		if buf.len() != FRAME_SIZE {
			return Err(DeviceError::invalid(format!("write of {} bytes, display takes exactly {}", buf.len(), FRAME_SIZE)).into());
		}
		self.display.write_frame(buf)?;
		Ok(buf.len())
	}
}

impl<B: I2cBus> io::Write for DisplayDevice<B> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.write_frame(buf).map_err(into_io_error)
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}
