use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
	Lines,
	OutPins,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SimEvent {
	Start,
	Stop,
	Address {
		address: u8,
		read: bool,
		acked: bool,
	},
	Write {
		byte: u8,
		acked: bool,
	},
	Read {
		byte: u8,
		acked: bool,
	},
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Segment {
	pub address: u8,
	pub read: bool,
	pub acked: bool,
	pub bytes: Vec<u8>,
}

pub trait SimDevice {
	fn address(&self) -> u8;

	fn select(&mut self, _read: bool) {}

	fn receive(&mut self, byte: u8) -> bool;

	fn transmit(&mut self) -> u8;

	fn deselect(&mut self) {}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Next {
	Receive,
	Transmit,
	Ignore,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
	Idle,
	// shifting in the address byte or a data byte
	Receive {
		bits: u8,
		value: u8,
		address: bool,
	},
	// device drives the ninth clock
	DeviceAck {
		next: Next,
	},
	Transmit {
		byte: u8,
		bits: u8,
	},
	// master drives the ninth clock
	MasterAck {
		byte: u8,
	},
	Ignore,
}

/// Deterministic open drain bus with simulated devices attached.
///
/// Decodes the master's line changes into START/STOP conditions and bytes
/// and answers like a real slave would: pulls DATA low for ACK and shifts
/// out data bits while CLOCK is low.
pub struct SimLines {
	master: OutPins,
	// device pulls DATA low
	pull: bool,
	state: State,
	master_ack: bool,
	devices: Vec<Box<dyn SimDevice + Send>>,
	selected: Option<usize>,
	record: bool,
	events: Vec<SimEvent>,
}

impl Default for SimLines {
	fn default() -> Self {
		SimLines::new()
	}
}

impl SimLines {
	pub fn new() -> Self {
		SimLines {
			master: OutPins::IDLE,
			pull: false,
			state: State::Idle,
			master_ack: false,
			devices: Vec::new(),
			selected: None,
			record: true,
			events: Vec::new(),
		}
	}

	pub fn with_device<S: SimDevice + Send + 'static>(mut self, device: S) -> Self {
		self.devices.push(Box::new(device));
		self
	}

	pub fn quiet(mut self) -> Self {
		self.record = false;
		self
	}

	pub fn pins(&self) -> OutPins {
		self.master
	}

	pub fn events(&self) -> &[SimEvent] {
		&self.events
	}

	pub fn clear_events(&mut self) {
		self.events.clear();
	}

	pub fn start_count(&self) -> usize {
		self.events.iter().filter(|e| **e == SimEvent::Start).count()
	}

	pub fn segments(&self) -> Vec<Segment> {
		let mut result: Vec<Segment> = Vec::new();
		let mut open = false;
		for event in &self.events {
			match *event {
				SimEvent::Start | SimEvent::Stop => open = false,
				SimEvent::Address { address, read, acked } => {
					result.push(Segment { address, read, acked, bytes: Vec::new() });
					open = true;
				},
				SimEvent::Write { byte, .. } | SimEvent::Read { byte, .. } => {
					if open {
						if let Some(segment) = result.last_mut() {
							segment.bytes.push(byte);
						}
					}
				},
			}
		}
		result
	}

	fn log(&mut self, event: SimEvent) {
		trace!("sim bus: {:?}", event);
		if self.record {
			self.events.push(event);
		}
	}

	fn line(&self) -> bool {
		self.master.data && !self.pull
	}

	fn on_start(&mut self) {
		self.log(SimEvent::Start);
		self.pull = false;
		self.selected = None;
		self.state = State::Receive { bits: 0, value: 0, address: true };
	}

	fn on_stop(&mut self) {
		self.log(SimEvent::Stop);
		if let Some(i) = self.selected.take() {
			self.devices[i].deselect();
		}
		self.pull = false;
		self.state = State::Idle;
	}

	fn on_rise(&mut self) {
		let line = self.line();
		match self.state {
			State::Receive { bits, value, address } => {
				self.state = State::Receive {
					bits: bits + 1,
					value: (value << 1) | (line as u8),
					address,
				};
			},
			State::Transmit { byte, bits } => {
				self.state = State::Transmit { byte, bits: bits + 1 };
			},
			State::MasterAck { .. } => {
				self.master_ack = !line;
			},
			_ => (),
		}
	}

	fn on_fall(&mut self) {
		match self.state {
			State::Receive { bits: 8, value, address: true } => {
				let read = 0 != value & 1;
				let address = value >> 1;
				self.selected = self.devices.iter().position(|d| d.address() == address);
				let acked = self.selected.is_some();
				if let Some(i) = self.selected {
					self.devices[i].select(read);
				}
				self.log(SimEvent::Address { address, read, acked });
				self.pull = acked;
				let next = match (read, acked) {
					(true, true) => Next::Transmit,
					(true, false) => Next::Ignore,
					(false, _) => Next::Receive,
				};
				self.state = State::DeviceAck { next };
			},
			State::Receive { bits: 8, value, address: false } => {
				let acked = match self.selected {
					Some(i) => self.devices[i].receive(value),
					None => false,
				};
				self.log(SimEvent::Write { byte: value, acked });
				self.pull = acked;
				self.state = State::DeviceAck { next: Next::Receive };
			},
			State::DeviceAck { next } => {
				self.pull = false;
				match next {
					Next::Receive => self.state = State::Receive { bits: 0, value: 0, address: false },
					Next::Transmit => self.load_byte(),
					Next::Ignore => self.state = State::Ignore,
				}
			},
			State::Transmit { byte, bits } => {
				if bits >= 8 {
					self.pull = false;
					self.state = State::MasterAck { byte };
				} else {
					self.pull = 0 == byte & (0x80 >> bits);
				}
			},
			State::MasterAck { byte } => {
				let acked = self.master_ack;
				self.log(SimEvent::Read { byte, acked });
				if acked {
					self.load_byte();
				} else {
					self.state = State::Ignore;
				}
			},
			_ => (),
		}
	}

	fn load_byte(&mut self) {
		let byte = match self.selected {
			Some(i) => self.devices[i].transmit(),
			None => 0xff,
		};
		self.pull = 0 == byte & 0x80;
		self.state = State::Transmit { byte, bits: 0 };
	}
}

impl Lines for SimLines {
	fn set_pins(&mut self, pins: OutPins) -> io::Result<()> {
		let old = self.master;
		self.master = pins;

		if old.clock && pins.clock {
			// DATA changing while CLOCK is high: START or STOP (devices
			// never pull DATA across a high CLOCK)
			if old.data != pins.data && !self.pull {
				if pins.data {
					self.on_stop();
				} else {
					self.on_start();
				}
			}
		} else if !old.clock && pins.clock {
			self.on_rise();
		} else if old.clock && !pins.clock {
			self.on_fall();
		}
		Ok(())
	}

	fn read_data(&mut self) -> io::Result<bool> {
		Ok(self.line())
	}
}

#[derive(Clone)]
pub struct Registers(Arc<Mutex<[u8; 256]>>);

impl Registers {
	pub fn new() -> Self {
		Registers(Arc::new(Mutex::new([0u8; 256])))
	}

	pub fn get(&self, register: u8) -> u8 {
		self.0.lock()[register as usize]
	}

	pub fn set(&self, register: u8, value: u8) {
		self.0.lock()[register as usize] = value;
	}

	pub fn load(&self, register: u8, values: &[u8]) {
		let mut regs = self.0.lock();
		let mut r = register;
		for &v in values {
			regs[r as usize] = v;
			r = r.wrapping_add(1);
		}
	}
}

impl Default for Registers {
	fn default() -> Self {
		Registers::new()
	}
}

/// Register file device: the first byte written after addressing selects
/// the register, further bytes are stored with auto-increment; reads
/// continue at the selected register, also with auto-increment.
pub struct RegisterDevice {
	address: u8,
	registers: Registers,
	pointer: u8,
	pointer_set: bool,
}

impl RegisterDevice {
	pub fn new(address: u8) -> Self {
		RegisterDevice::with_registers(address, Registers::new())
	}

	pub fn with_registers(address: u8, registers: Registers) -> Self {
		RegisterDevice {
			address,
			registers,
			pointer: 0,
			pointer_set: false,
		}
	}

	pub fn registers(&self) -> Registers {
		self.registers.clone()
	}
}

impl SimDevice for RegisterDevice {
	fn address(&self) -> u8 {
		self.address
	}

	fn select(&mut self, read: bool) {
		if !read {
			self.pointer_set = false;
		}
	}

	fn receive(&mut self, byte: u8) -> bool {
		if self.pointer_set {
			self.registers.set(self.pointer, byte);
			self.pointer = self.pointer.wrapping_add(1);
		} else {
			self.pointer = byte;
			self.pointer_set = true;
		}
		true
	}

	fn transmit(&mut self) -> u8 {
		let value = self.registers.get(self.pointer);
		self.pointer = self.pointer.wrapping_add(1);
		value
	}
}

pub struct SinkDevice {
	address: u8,
	received: Arc<Mutex<usize>>,
}

impl SinkDevice {
	pub fn new(address: u8) -> Self {
		SinkDevice {
			address,
			received: Arc::new(Mutex::new(0)),
		}
	}

	pub fn received(&self) -> Arc<Mutex<usize>> {
		self.received.clone()
	}
}

impl SimDevice for SinkDevice {
	fn address(&self) -> u8 {
		self.address
	}

	fn receive(&mut self, _byte: u8) -> bool {
		*self.received.lock() += 1;
		true
	}

	fn transmit(&mut self) -> u8 {
		0xff
	}
}
