use std::io;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub const DEFAULT_SETTLE: Duration = Duration::from_micros(5);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Levels the master drives onto the bus.
///
/// Both lines are open drain: `true` releases the line (pulled up), `false`
/// pulls it low. The data line reads low if either side pulls it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OutPins {
	pub clock: bool,
	pub data: bool,
}

impl OutPins {
	pub const IDLE: OutPins = OutPins { clock: true, data: true };

	pub fn with_clock(self, clock: bool) -> Self {
		OutPins { clock, ..self }
	}

	pub fn with_data(self, data: bool) -> Self {
		OutPins { data, ..self }
	}
}

pub trait Lines {
	fn set_pins(&mut self, pins: OutPins) -> io::Result<()>;
	fn read_data(&mut self) -> io::Result<bool>;
}

impl<'a, L: ?Sized + Lines> Lines for &'a mut L {
	fn set_pins(&mut self, pins: OutPins) -> io::Result<()> {
		L::set_pins(*self, pins)
	}

	fn read_data(&mut self) -> io::Result<bool> {
		L::read_data(*self)
	}
}

impl<L: ?Sized + Lines> Lines for Box<L> {
	fn set_pins(&mut self, pins: OutPins) -> io::Result<()> {
		L::set_pins(self, pins)
	}

	fn read_data(&mut self) -> io::Result<bool> {
		L::read_data(self)
	}
}

pub trait Delay {
	fn settle(&mut self);
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SleepDelay {
	pub edge: Duration,
}

impl Default for SleepDelay {
	fn default() -> Self {
		SleepDelay { edge: DEFAULT_SETTLE }
	}
}

impl Delay for SleepDelay {
	fn settle(&mut self) {
		reliable_sleep(self.edge);
	}
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
	fn settle(&mut self) {}
}

impl<D: ?Sized + Delay> Delay for Box<D> {
	fn settle(&mut self) {
		D::settle(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sleep_delay_waits_at_least_edge() {
		let mut delay = SleepDelay { edge: Duration::from_millis(2) };
		let started = Instant::now();
		delay.settle();
		delay.settle();
		assert!(started.elapsed() >= Duration::from_millis(4));
	}
}
