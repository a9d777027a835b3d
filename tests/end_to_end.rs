extern crate mpu_oled;

use std::thread;

use mpu_oled::bitbang::{
	BitBangBus,
	NoDelay,
	RegisterDevice,
	Registers,
	SimEvent,
	SimLines,
	SinkDevice,
};
use mpu_oled::bus::{
	AckPolicy,
	SharedBus,
};
use mpu_oled::error::device_error;
use mpu_oled::mpu6050::{
	self,
	Axis,
	Mpu6050,
	SensorSample,
	format_attribute,
};
use mpu_oled::ssd1306::{
	self,
	FRAME_SIZE,
	Ssd1306,
};
use mpu_oled::{
	DeviceError,
	Stage,
};

const DUMP: [u8; 14] = [
	0x04, 0xd2, 0xfb, 0x2e, 0x00, 0x00, 0x13, 0x88,
	0x00, 0x0a, 0xff, 0xf6, 0x00, 0x00,
];

type SimBus = BitBangBus<SimLines, NoDelay>;

fn board() -> (SimBus, Registers) {
	let sensor = RegisterDevice::new(mpu6050::DEFAULT_ADDRESS);
	let registers = sensor.registers();
	registers.set(mpu6050::regs::PWR_MGMT_1, 0x40);
	registers.load(mpu6050::regs::ACCEL_XOUT_H, &DUMP);
	let lines = SimLines::new()
		.with_device(sensor)
		.with_device(SinkDevice::new(ssd1306::DEFAULT_ADDRESS));
	(BitBangBus::new(lines, NoDelay), registers)
}

#[test]
fn wake_and_burst_read() {
	let (bus, registers) = board();
	let mut sensor = Mpu6050::new(bus, mpu6050::DEFAULT_ADDRESS);
	sensor.wake().unwrap();
	assert_eq!(registers.get(mpu6050::regs::PWR_MGMT_1), 0);

	let sample = sensor.read_sample().unwrap();
	assert_eq!(sample, SensorSample {
		accel_x: 1234,
		accel_y: -1234,
		accel_z: 0,
		temperature: 5000,
		gyro_x: 10,
		gyro_y: -10,
		gyro_z: 0,
	});
	assert_eq!(&sample.to_registers(), &DUMP);
	assert_eq!(format_attribute(Axis::Temperature, sample.temperature), "5000\t51.24\n");

	// wake: START..STOP; read: START, pointer, repeated START, 14 bytes, STOP
	let events = sensor.bus().lines().events();
	let starts = events.iter().filter(|e| **e == SimEvent::Start).count();
	let stops = events.iter().filter(|e| **e == SimEvent::Stop).count();
	assert_eq!((starts, stops), (3, 2));
	assert_eq!(events.last(), Some(&SimEvent::Stop));
}

#[test]
fn missing_sensor_aborts_without_sample() {
	let lines = SimLines::new().with_device(SinkDevice::new(ssd1306::DEFAULT_ADDRESS));
	let mut sensor = Mpu6050::new(BitBangBus::new(lines, NoDelay), mpu6050::DEFAULT_ADDRESS);
	let err = sensor.read_sample().unwrap_err();
	match device_error(&err) {
		Some(&DeviceError::Nack { address, stage }) => {
			assert_eq!(address, mpu6050::DEFAULT_ADDRESS);
			assert_eq!(stage, Stage::AddressWrite);
		},
		other => panic!("unexpected error {:?}", other),
	}
	// the aborted transaction still released the bus
	assert_eq!(sensor.bus().lines().events().last(), Some(&SimEvent::Stop));

	// best effort keeps going and reads an idle (high) bus
	sensor.bus_mut().set_policy(AckPolicy::Continue);
	assert_eq!(sensor.read_sample().unwrap().values(), [-1; 7]);
}

#[test]
fn display_scenarios() {
	let (bus, _) = board();
	let mut display = Ssd1306::new(bus, ssd1306::DEFAULT_ADDRESS);

	display.init().unwrap();
	let segments = display.bus().lines().segments();
	let charge_pump = segments.iter().position(|s| s.bytes == vec![0x00, 0x8d, 0x14]).unwrap();
	let display_on = segments.iter().position(|s| s.bytes == vec![0x00, 0xaf]).unwrap();
	assert!(charge_pump < display_on);

	display.bus_mut().lines_mut().clear_events();
	display.set_cursor(2, 5).unwrap();
	assert_eq!(display.bus().lines().segments()[0].bytes, vec![0x00, 0xb2, 0x05, 0x10]);

	display.bus_mut().lines_mut().clear_events();
	let frame: Vec<u8> = (0..FRAME_SIZE).map(|i| (i % 256) as u8).collect();
	display.write_frame(&frame).unwrap();
	let data: Vec<u8> = display.bus().lines().segments().into_iter()
		.filter(|s| s.bytes[0] == 0x40)
		.flat_map(|s| s.bytes.into_iter().skip(1))
		.collect();
	assert_eq!(data, frame);

	display.bus_mut().lines_mut().clear_events();
	let err = display.write_frame(&frame[..1000]).unwrap_err();
	match device_error(&err) {
		Some(DeviceError::InvalidArgument(_)) => (),
		other => panic!("unexpected error {:?}", other),
	}
	assert_eq!(display.bus().lines().start_count(), 0);
}

#[test]
fn shared_bus_keeps_transactions_whole() {
	let (bus, _) = board();
	let bus = SharedBus::new(bus);

	let sensor_bus = bus.clone();
	let poller = thread::spawn(move || {
		let mut sensor = Mpu6050::new(sensor_bus, mpu6050::DEFAULT_ADDRESS);
		for _ in 0..10 {
			assert_eq!(sensor.read_sample().unwrap().temperature, 5000);
		}
	});
	let display_bus = bus.clone();
	let updater = thread::spawn(move || {
		let mut display = Ssd1306::new(display_bus, ssd1306::DEFAULT_ADDRESS);
		for page in 0..8 {
			display.set_cursor(page, 0).unwrap();
			display.put_str("12:34").unwrap();
		}
	});
	poller.join().unwrap();
	updater.join().unwrap();

	// every START is followed by its own STOP before the next transaction
	let guard = bus.lock();
	let mut open = false;
	let mut restarted = false;
	for event in guard.lines().events() {
		match event {
			SimEvent::Start if open => {
				// only the sensor's repeated start may nest
				assert!(!restarted);
				restarted = true;
			},
			SimEvent::Start => open = true,
			SimEvent::Stop => {
				assert!(open);
				open = false;
				restarted = false;
			},
			SimEvent::Address { address, .. } if restarted => assert_eq!(*address, mpu6050::DEFAULT_ADDRESS),
			_ => (),
		}
	}
	assert!(!open);
}
