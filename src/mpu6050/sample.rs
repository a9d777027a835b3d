use std::fmt;

pub const SAMPLE_REGISTERS: usize = 14;

// calibration for the ±2g / ±250°/s ranges
pub const STANDARD_GRAVITY: f64 = 9.80665;
pub const ACCEL_LSB_PER_G: f64 = 16384.0;
pub const GYRO_LSB_PER_DPS: f64 = 131.0;
pub const TEMP_LSB_PER_DEGREE: f64 = 340.0;
pub const TEMP_OFFSET: f64 = 36.53;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Axis {
	AccelX,
	AccelY,
	AccelZ,
	Temperature,
	GyroX,
	GyroY,
	GyroZ,
}

impl Axis {
	pub const ALL: [Axis; 7] = [
		Axis::AccelX,
		Axis::AccelY,
		Axis::AccelZ,
		Axis::Temperature,
		Axis::GyroX,
		Axis::GyroY,
		Axis::GyroZ,
	];

	fn index(self) -> usize {
		self as usize
	}

	pub fn register(self) -> u8 {
		super::regs::ACCEL_XOUT_H + 2 * self.index() as u8
	}

	pub fn name(self) -> &'static str {
		match self {
			Axis::AccelX => "accel_x",
			Axis::AccelY => "accel_y",
			Axis::AccelZ => "accel_z",
			Axis::Temperature => "temp",
			Axis::GyroX => "gyro_x",
			Axis::GyroY => "gyro_y",
			Axis::GyroZ => "gyro_z",
		}
	}

	// physical value: m/s², °C or °/s
	pub fn scale(self, raw: i16) -> f64 {
		let raw = raw as f64;
		match self {
			Axis::AccelX | Axis::AccelY | Axis::AccelZ => raw * STANDARD_GRAVITY / ACCEL_LSB_PER_G,
			Axis::Temperature => raw / TEMP_LSB_PER_DEGREE + TEMP_OFFSET,
			Axis::GyroX | Axis::GyroY | Axis::GyroZ => raw / GYRO_LSB_PER_DPS,
		}
	}

	pub fn unit(self) -> &'static str {
		match self {
			Axis::AccelX | Axis::AccelY | Axis::AccelZ => "m/s²",
			Axis::Temperature => "°C",
			Axis::GyroX | Axis::GyroY | Axis::GyroZ => "°/s",
		}
	}
}

impl fmt::Display for Axis {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SensorSample {
	pub accel_x: i16,
	pub accel_y: i16,
	pub accel_z: i16,
	pub temperature: i16,
	pub gyro_x: i16,
	pub gyro_y: i16,
	pub gyro_z: i16,
}

impl SensorSample {
	pub fn from_values(v: [i16; 7]) -> Self {
		SensorSample {
			accel_x: v[0],
			accel_y: v[1],
			accel_z: v[2],
			temperature: v[3],
			gyro_x: v[4],
			gyro_y: v[5],
			gyro_z: v[6],
		}
	}

	pub fn values(&self) -> [i16; 7] {
		[
			self.accel_x,
			self.accel_y,
			self.accel_z,
			self.temperature,
			self.gyro_x,
			self.gyro_y,
			self.gyro_z,
		]
	}

	pub fn from_registers(raw: &[u8; SAMPLE_REGISTERS]) -> Self {
		let mut v = [0i16; 7];
		for (value, pair) in v.iter_mut().zip(raw.chunks(2)) {
			*value = i16::from_be_bytes([pair[0], pair[1]]);
		}
		SensorSample::from_values(v)
	}

	pub fn to_registers(&self) -> [u8; SAMPLE_REGISTERS] {
		let mut raw = [0u8; SAMPLE_REGISTERS];
		for (pair, value) in raw.chunks_mut(2).zip(self.values().iter()) {
			pair.copy_from_slice(&value.to_be_bytes());
		}
		raw
	}

	pub fn get(&self, axis: Axis) -> i16 {
		self.values()[axis.index()]
	}

	pub fn accel_ms2(&self) -> [f64; 3] {
		[
			Axis::AccelX.scale(self.accel_x),
			Axis::AccelY.scale(self.accel_y),
			Axis::AccelZ.scale(self.accel_z),
		]
	}

	pub fn gyro_dps(&self) -> [f64; 3] {
		[
			Axis::GyroX.scale(self.gyro_x),
			Axis::GyroY.scale(self.gyro_y),
			Axis::GyroZ.scale(self.gyro_z),
		]
	}

	pub fn temperature_celsius(&self) -> f64 {
		Axis::Temperature.scale(self.temperature)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DUMP: [u8; SAMPLE_REGISTERS] = [
		0x04, 0xd2, 0xfb, 0x2e, 0x00, 0x00, 0x13, 0x88,
		0x00, 0x0a, 0xff, 0xf6, 0x00, 0x00,
	];

	#[test]
	fn decodes_big_endian_pairs_in_order() {
		let s = SensorSample::from_registers(&DUMP);
		assert_eq!(s, SensorSample {
			accel_x: 1234,
			accel_y: -1234,
			accel_z: 0,
			temperature: 5000,
			gyro_x: 10,
			gyro_y: -10,
			gyro_z: 0,
		});
		assert_eq!(s.get(Axis::Temperature), 5000);
		assert_eq!(s.get(Axis::GyroY), -10);
	}

	#[test]
	fn register_dump_round_trips() {
		let mut extremes = [0u8; SAMPLE_REGISTERS];
		for (i, b) in extremes.iter_mut().enumerate() {
			*b = if i % 4 < 2 { 0x80 } else { 0x7f };
		}
		for dump in &[DUMP, extremes, [0xff; SAMPLE_REGISTERS]] {
			assert_eq!(&SensorSample::from_registers(dump).to_registers(), dump);
		}
	}

	#[test]
	fn registers_are_consecutive_pairs() {
		assert_eq!(Axis::AccelX.register(), 0x3b);
		assert_eq!(Axis::Temperature.register(), 0x41);
		assert_eq!(Axis::GyroX.register(), 0x43);
		assert_eq!(Axis::GyroZ.register(), 0x47);
	}

	#[test]
	fn scaling_uses_fixed_calibration() {
		assert!((Axis::AccelZ.scale(16384) - 9.80665).abs() < 1e-12);
		assert!((Axis::GyroX.scale(131) - 1.0).abs() < 1e-12);
		assert!((Axis::Temperature.scale(0) - 36.53).abs() < 1e-12);
		assert!((Axis::Temperature.scale(-340) - 35.53).abs() < 1e-9);

		let s = SensorSample { accel_z: -16384, gyro_y: 262, ..Default::default() };
		assert!((s.accel_ms2()[2] + 9.80665).abs() < 1e-12);
		assert!((s.gyro_dps()[1] - 2.0).abs() < 1e-12);
	}
}
