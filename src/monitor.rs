// Periodic dashboard: one worker thread polls the sensor and redraws the
// display, then sleeps for a fixed interval.

use std::sync::atomic::{
	AtomicBool,
	Ordering,
};
use std::sync::Arc;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

use crate::bus::I2cBus;
use crate::mpu6050::{
	Mpu6050,
	SensorSample,
};
use crate::ssd1306::{
	FrameBuffer,
	Ssd1306,
};

// longest uninterrupted sleep, so `stop` doesn't wait a full interval
const STOP_POLL: Duration = Duration::from_millis(10);

fn format_uptime(uptime: Duration) -> String {
	let secs = uptime.as_secs();
	format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

pub fn render(sample: &SensorSample, uptime: Duration) -> FrameBuffer {
	let mut fb = FrameBuffer::new();
	fb.draw_text(0, 0, "MPU6050", 2);
	fb.draw_text(0, 18, &format!("UP {}", format_uptime(uptime)), 1);
	fb.draw_text(0, 30, &format!("T {:.1}°C", sample.temperature_celsius()), 1);
	let a = sample.accel_ms2();
	fb.draw_text(0, 42, &format!("A{:6.2}{:6.2}{:6.2}", a[0], a[1], a[2]), 1);
	let g = sample.gyro_dps();
	fb.draw_text(0, 54, &format!("G{:6.0}{:6.0}{:6.0}", g[0], g[1], g[2]), 1);
	fb
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct MonitorStats {
	pub cycles: usize,
	pub updates: usize,
	pub skipped: usize,
}

struct Worker<B: I2cBus> {
	sensor: Mpu6050<B>,
	display: Ssd1306<B>,
	started: Instant,
	stats: MonitorStats,
}

impl<B: I2cBus> Worker<B> {
	fn cycle(&mut self) -> crate::AResult<()> {
		let sample = self.sensor.read_sample()?;
		let frame = render(&sample, self.started.elapsed());
		self.display.write_frame(frame.as_bytes())
	}

	fn run(mut self, interval: Duration, cycles: Option<usize>, stop: &AtomicBool) -> MonitorStats {
		let done = |n: usize| cycles.map_or(false, |limit| n >= limit);
		while !done(self.stats.cycles) && !stop.load(Ordering::SeqCst) {
			self.stats.cycles += 1;
			match self.cycle() {
				Ok(()) => self.stats.updates += 1,
				Err(e) => {
					self.stats.skipped += 1;
					warn!("monitor: skipping cycle {}: {}", self.stats.cycles, e);
				},
			}
			if done(self.stats.cycles) {
				break;
			}

			let wake = Instant::now() + interval;
			loop {
				let now = Instant::now();
				if now >= wake || stop.load(Ordering::SeqCst) {
					break;
				}
				thread::sleep((wake - now).min(STOP_POLL));
			}
		}
		debug!("monitor: finished {:?}", self.stats);
		self.stats
	}
}

/// Handle of a running dashboard worker; dropping it stops the worker.
pub struct Monitor {
	stop: Arc<AtomicBool>,
	handle: Option<thread::JoinHandle<MonitorStats>>,
}

impl Monitor {
	pub fn spawn<B>(sensor: Mpu6050<B>, display: Ssd1306<B>, interval: Duration, cycles: Option<usize>) -> crate::AResult<Self>
	where
		B: I2cBus + Send + 'static,
	{
		let stop = Arc::new(AtomicBool::new(false));
		let worker = Worker {
			sensor,
			display,
			started: Instant::now(),
			stats: MonitorStats::default(),
		};
		let worker_stop = stop.clone();
		let handle = thread::Builder::new()
			.name("monitor".into())
			.spawn(move || worker.run(interval, cycles, &worker_stop))?;
		info!("monitor: refreshing every {:?}", interval);
		Ok(Monitor {
			stop,
			handle: Some(handle),
		})
	}

	pub fn request_stop(&self) {
		self.stop.store(true, Ordering::SeqCst);
	}

	pub fn join(mut self) -> crate::AResult<MonitorStats> {
		match self.handle.take() {
			Some(handle) => handle.join().map_err(|_| format_err!("monitor thread panicked")),
			None => Ok(MonitorStats::default()),
		}
	}

	pub fn stop(self) -> crate::AResult<MonitorStats> {
		self.request_stop();
		self.join()
	}
}

impl Drop for Monitor {
	fn drop(&mut self) {
		if let Some(handle) = self.handle.take() {
			self.request_stop();
			if handle.join().is_err() {
				error!("monitor thread panicked");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;

	use super::*;
	use crate::bitbang::{
		BitBangBus,
		NoDelay,
		RegisterDevice,
		SimLines,
		SinkDevice,
	};
	use crate::bus::SharedBus;
	use crate::mpu6050;
	use crate::ssd1306::{
		self,
		FRAME_SIZE,
	};

	fn shared_bus(sensor_address: u8) -> (SharedBus<BitBangBus<SimLines, NoDelay>>, Arc<Mutex<usize>>) {
		let sensor = RegisterDevice::new(sensor_address);
		sensor.registers().load(mpu6050::regs::ACCEL_XOUT_H, &[0x40, 0x00]);
		let sink = SinkDevice::new(ssd1306::DEFAULT_ADDRESS);
		let received = sink.received();
		let lines = SimLines::new().quiet().with_device(sensor).with_device(sink);
		(SharedBus::new(BitBangBus::new(lines, NoDelay)), received)
	}

	fn monitor(bus: &SharedBus<BitBangBus<SimLines, NoDelay>>, cycles: Option<usize>, interval: Duration) -> Monitor {
		Monitor::spawn(
			Mpu6050::new(bus.clone(), mpu6050::DEFAULT_ADDRESS),
			Ssd1306::new(bus.clone(), ssd1306::DEFAULT_ADDRESS),
			interval,
			cycles,
		).unwrap()
	}

	#[test]
	fn runs_requested_cycles() {
		let (bus, received) = shared_bus(mpu6050::DEFAULT_ADDRESS);
		let stats = monitor(&bus, Some(3), Duration::from_millis(1)).join().unwrap();
		assert_eq!(stats, MonitorStats { cycles: 3, updates: 3, skipped: 0 });
		// window commands plus control bytes on top of the frame data
		assert!(*received.lock() > 3 * FRAME_SIZE);
	}

	#[test]
	fn zero_cycles_touch_nothing() {
		let (bus, received) = shared_bus(mpu6050::DEFAULT_ADDRESS);
		let stats = monitor(&bus, Some(0), Duration::from_secs(3600)).join().unwrap();
		assert_eq!(stats, MonitorStats::default());
		assert_eq!(*received.lock(), 0);
	}

	#[test]
	fn failed_reads_skip_the_cycle() {
		let (bus, received) = shared_bus(0x69);
		let stats = monitor(&bus, Some(2), Duration::from_millis(1)).join().unwrap();
		assert_eq!(stats, MonitorStats { cycles: 2, updates: 0, skipped: 2 });
		assert_eq!(*received.lock(), 0);
	}

	#[test]
	fn stop_interrupts_the_interval() {
		let (bus, _) = shared_bus(mpu6050::DEFAULT_ADDRESS);
		let m = monitor(&bus, None, Duration::from_secs(3600));
		let started = Instant::now();
		thread::sleep(Duration::from_millis(20));
		let stats = m.stop().unwrap();
		assert!(stats.cycles >= 1);
		assert!(started.elapsed() < Duration::from_secs(60));
	}

	#[test]
	fn dashboard_shows_values() {
		let sample = SensorSample { accel_z: 16384, ..Default::default() };
		let fb = render(&sample, Duration::from_secs(3725));
		assert_eq!(format_uptime(Duration::from_secs(3725)), "01:02:05");
		assert!(fb.as_bytes().iter().any(|b| *b != 0));
	}
}
