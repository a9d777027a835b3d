/// Driver for the InvenSense MPU-6050 accelerometer/gyroscope.
///
/// The device powers up sleeping; `wake` clears the sleep bit. All seven
/// values are read with a single burst read (register auto-increment), so
/// they belong to the same sampling instant.

use std::thread;
use std::time::Duration;

use crate::bus::I2cBus;
use crate::error::DeviceError;

mod attributes;
mod sample;

pub use self::attributes::{
	format_attribute,
	sample_attributes,
};

pub use self::sample::{
	ACCEL_LSB_PER_G,
	Axis,
	GYRO_LSB_PER_DPS,
	SAMPLE_REGISTERS,
	STANDARD_GRAVITY,
	SensorSample,
	TEMP_LSB_PER_DEGREE,
	TEMP_OFFSET,
};

pub const DEFAULT_ADDRESS: u8 = 0x68;

pub const WHO_AM_I_VALUE: u8 = 0x68;

#[allow(dead_code)]
pub mod regs {
	pub const SMPLRT_DIV: u8 = 0x19;
	pub const CONFIG: u8 = 0x1a; // DLPF_CFG in bits 2..0
	pub const GYRO_CONFIG: u8 = 0x1b; // FS_SEL in bits 4..3
	pub const ACCEL_CONFIG: u8 = 0x1c; // AFS_SEL in bits 4..3
	pub const ACCEL_XOUT_H: u8 = 0x3b;
	pub const TEMP_OUT_H: u8 = 0x41;
	pub const GYRO_XOUT_H: u8 = 0x43;
	pub const PWR_MGMT_1: u8 = 0x6b; // bit 6: SLEEP
	pub const WHO_AM_I: u8 = 0x75;
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum GyroRange {
	Dps250,
	Dps500,
	Dps1000,
	Dps2000,
}

impl GyroRange {
	fn bits(self) -> u8 {
		(self as u8) << 3
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AccelRange {
	G2,
	G4,
	G8,
	G16,
}

impl AccelRange {
	fn bits(self) -> u8 {
		(self as u8) << 3
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SensorConfig {
	// sample rate = gyro output rate / (1 + divider)
	pub sample_rate_divider: u8,
	// DLPF_CFG, 0..=6
	pub low_pass: u8,
	pub gyro_range: GyroRange,
	pub accel_range: AccelRange,
}

impl Default for SensorConfig {
	fn default() -> Self {
		SensorConfig {
			sample_rate_divider: 0x07,
			low_pass: 0x01,
			gyro_range: GyroRange::Dps250,
			accel_range: AccelRange::G2,
		}
	}
}

pub struct Mpu6050<B: I2cBus> {
	bus: B,
	address: u8,
}

impl<B: I2cBus> Mpu6050<B> {
	pub fn new(bus: B, address: u8) -> Self {
		Mpu6050 { bus, address }
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn bus(&self) -> &B {
		&self.bus
	}

	pub fn bus_mut(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn release(self) -> B {
		self.bus
	}

	pub fn write_register(&mut self, register: u8, value: u8) -> crate::AResult<()> {
		debug!("MPU6050 0x{:02x}: reg 0x{:02x} <- 0x{:02x}", self.address, register, value);
		self.bus.write(self.address, &[register, value])
	}

	pub fn read_register(&mut self, register: u8) -> crate::AResult<u8> {
		let mut buf = [0u8];
		self.bus.write_read(self.address, &[register], &mut buf)?;
		Ok(buf[0])
	}

	pub fn who_am_i(&mut self) -> crate::AResult<u8> {
		self.read_register(regs::WHO_AM_I)
	}

	pub fn wake(&mut self) -> crate::AResult<()> {
		self.write_register(regs::PWR_MGMT_1, 0x00)
	}

	pub fn configure(&mut self, config: &SensorConfig) -> crate::AResult<()> {
		if config.low_pass > 6 {
			return Err(DeviceError::invalid(format!("low pass setting {} out of range 0..=6", config.low_pass)).into());
		}
		self.write_register(regs::SMPLRT_DIV, config.sample_rate_divider)?;
		self.write_register(regs::CONFIG, config.low_pass)?;
		self.write_register(regs::GYRO_CONFIG, config.gyro_range.bits())?;
		self.write_register(regs::ACCEL_CONFIG, config.accel_range.bits())
	}

	pub fn init(&mut self, config: &SensorConfig) -> crate::AResult<u8> {
		let who = self.who_am_i()?;
		if who != WHO_AM_I_VALUE {
			warn!("MPU6050 0x{:02x}: unexpected WHO_AM_I 0x{:02x}", self.address, who);
		}
		self.wake()?;
		// oscillator start-up
		thread::sleep(Duration::from_millis(10));
		self.configure(config)?;
		info!("MPU6050 0x{:02x}: initialized (WHO_AM_I 0x{:02x})", self.address, who);
		Ok(who)
	}

	pub fn read_axis(&mut self, axis: Axis) -> crate::AResult<i16> {
		let mut buf = [0u8; 2];
		self.bus.write_read(self.address, &[axis.register()], &mut buf)?;
		Ok(i16::from_be_bytes(buf))
	}

	pub fn read_sample(&mut self) -> crate::AResult<SensorSample> {
		let mut raw = [0u8; SAMPLE_REGISTERS];
		self.bus.write_read(self.address, &[regs::ACCEL_XOUT_H], &mut raw)?;
		let sample = SensorSample::from_registers(&raw);
		trace!("MPU6050 0x{:02x}: {:?}", self.address, sample);
		Ok(sample)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bitbang::{
		BitBangBus,
		NoDelay,
		RegisterDevice,
		Registers,
		SimEvent,
		SimLines,
	};
	use crate::bus::AckPolicy;
	use crate::error::{
		Stage,
		device_error,
	};

	fn sensor_at(device_address: u8) -> (Mpu6050<BitBangBus<SimLines, NoDelay>>, Registers) {
		let device = RegisterDevice::new(device_address);
		let registers = device.registers();
		registers.set(regs::PWR_MGMT_1, 0x40);
		registers.set(regs::WHO_AM_I, WHO_AM_I_VALUE);
		let bus = BitBangBus::new(SimLines::new().with_device(device), NoDelay);
		(Mpu6050::new(bus, DEFAULT_ADDRESS), registers)
	}

	#[test]
	fn wake_is_one_transaction_clearing_sleep() {
		let (mut mpu, registers) = sensor_at(DEFAULT_ADDRESS);
		mpu.wake().unwrap();
		assert_eq!(registers.get(regs::PWR_MGMT_1), 0x00);
		assert_eq!(mpu.bus().lines().events(), &[
			SimEvent::Start,
			SimEvent::Address { address: 0x68, read: false, acked: true },
			SimEvent::Write { byte: 0x6b, acked: true },
			SimEvent::Write { byte: 0x00, acked: true },
			SimEvent::Stop,
		][..]);
		// idempotent
		mpu.wake().unwrap();
		assert_eq!(registers.get(regs::PWR_MGMT_1), 0x00);
	}

	#[test]
	fn configure_writes_four_registers() {
		let (mut mpu, registers) = sensor_at(DEFAULT_ADDRESS);
		mpu.configure(&SensorConfig {
			sample_rate_divider: 0x09,
			low_pass: 0x03,
			gyro_range: GyroRange::Dps1000,
			accel_range: AccelRange::G4,
		}).unwrap();
		assert_eq!(registers.get(regs::SMPLRT_DIV), 0x09);
		assert_eq!(registers.get(regs::CONFIG), 0x03);
		assert_eq!(registers.get(regs::GYRO_CONFIG), 0x10);
		assert_eq!(registers.get(regs::ACCEL_CONFIG), 0x08);
		assert_eq!(mpu.bus().lines().start_count(), 4);
	}

	#[test]
	fn configure_rejects_bad_low_pass_before_bus_activity() {
		let (mut mpu, _) = sensor_at(DEFAULT_ADDRESS);
		let config = SensorConfig { low_pass: 7, ..Default::default() };
		assert!(mpu.configure(&config).is_err());
		assert_eq!(mpu.bus().lines().start_count(), 0);
	}

	#[test]
	fn wake_then_read_sample() {
		let (mut mpu, registers) = sensor_at(DEFAULT_ADDRESS);
		registers.load(regs::ACCEL_XOUT_H, &[
			0x04, 0xd2, 0xfb, 0x2e, 0x00, 0x00, 0x13, 0x88,
			0x00, 0x0a, 0xff, 0xf6, 0x00, 0x00,
		]);
		mpu.wake().unwrap();
		let sample = mpu.read_sample().unwrap();
		assert_eq!(sample, SensorSample {
			accel_x: 1234,
			accel_y: -1234,
			accel_z: 0,
			temperature: 5000,
			gyro_x: 10,
			gyro_y: -10,
			gyro_z: 0,
		});

		// pointer write, repeated start, 14 reads with the last one NACKed
		let segments = mpu.bus().lines().segments();
		assert_eq!(segments.len(), 3);
		assert_eq!(segments[1].bytes, vec![regs::ACCEL_XOUT_H]);
		assert!(segments[2].read);
		assert_eq!(segments[2].bytes.len(), SAMPLE_REGISTERS);
		let reads: Vec<bool> = mpu.bus().lines().events().iter().filter_map(|e| match *e {
			SimEvent::Read { acked, .. } => Some(acked),
			_ => None,
		}).collect();
		assert_eq!(reads.len(), 14);
		assert!(reads[..13].iter().all(|a| *a));
		assert!(!reads[13]);
	}

	#[test]
	fn nack_on_address_yields_no_sample() {
		let (mut mpu, _) = sensor_at(0x69);
		let err = mpu.read_sample().unwrap_err();
		match device_error(&err) {
			Some(DeviceError::Nack { address: 0x68, stage: Stage::AddressWrite }) => (),
			other => panic!("unexpected error: {:?}", other),
		}
		// aborted before the repeated start
		assert_eq!(mpu.bus().lines().start_count(), 1);
		assert!(mpu.bus().lines().events().iter().all(|e| match e {
			SimEvent::Read { .. } => false,
			_ => true,
		}));
	}

	#[test]
	fn continue_policy_reads_garbage() {
		let (mpu, _) = sensor_at(0x69);
		let mut mpu = Mpu6050::new(mpu.release().with_policy(AckPolicy::Continue), DEFAULT_ADDRESS);
		let sample = mpu.read_sample().unwrap();
		assert_eq!(sample.values(), [-1i16; 7]);
	}

	#[test]
	fn init_reads_who_am_i_and_configures() {
		let (mut mpu, registers) = sensor_at(DEFAULT_ADDRESS);
		assert_eq!(mpu.init(&SensorConfig::default()).unwrap(), WHO_AM_I_VALUE);
		assert_eq!(registers.get(regs::PWR_MGMT_1), 0x00);
		assert_eq!(registers.get(regs::SMPLRT_DIV), 0x07);
		assert_eq!(registers.get(regs::CONFIG), 0x01);
	}

	#[test]
	fn read_axis_reads_one_pair() {
		let (mut mpu, registers) = sensor_at(DEFAULT_ADDRESS);
		registers.load(regs::GYRO_XOUT_H + 4, &[0xff, 0x38]);
		assert_eq!(mpu.read_axis(Axis::GyroZ).unwrap(), -200);
	}
}
