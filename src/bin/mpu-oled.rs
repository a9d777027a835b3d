#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate mpu_oled;
use mpu_oled::*;

use std::fs;
use std::io::{
	self,
	Write,
};
use std::process::exit;
use std::time::Duration;

use mpu_oled::bus::{
	I2cBus,
	SharedBus,
};
use mpu_oled::config::{
	Config,
	DeviceAddress,
	parse_number,
};
use mpu_oled::device::{
	DisplayDevice,
	RecordLayout,
	SensorDevice,
};
use mpu_oled::monitor::Monitor;
use mpu_oled::mpu6050::{
	Mpu6050,
	SensorConfig,
	sample_attributes,
};
use mpu_oled::ssd1306::{
	FrameBuffer,
	HEIGHT,
	Ssd1306,
};

type Bus = SharedBus<dyn I2cBus + Send>;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_param_or<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name)
	} else {
		Ok(default)
	}
}

fn get_number_or(matches: &clap::ArgMatches, name: &str, default: u32) -> AResult<u32> {
	match matches.value_of(name) {
		Some(p) => parse_number(p).map_err(|e| {
			let msg = format!("invalid parameter {}: {}", name, e);
			e.context(msg).into()
		}),
		None => Ok(default),
	}
}

fn load_config(matches: &clap::ArgMatches) -> AResult<Config> {
	let d = Config::default();
	Ok(Config {
		backend: get_param_or(matches, "backend", d.backend)?,
		bus: get_number_or(matches, "bus", d.bus)?,
		sda: get_number_or(matches, "sda", d.sda)?,
		scl: get_number_or(matches, "scl", d.scl)?,
		sensor_address: get_param_or(matches, "sensor_address", DeviceAddress(d.sensor_address))?.0,
		display_address: get_param_or(matches, "display_address", DeviceAddress(d.display_address))?.0,
		policy: get_param_or(matches, "policy", d.policy)?,
		settle: match matches.value_of("delay_us") {
			Some(_) => Duration::from_micros(get_number_or(matches, "delay_us", 0)? as u64),
			None => d.settle,
		},
		max_transfer: get_number_or(matches, "max_transfer", d.max_transfer as u32)? as usize,
	})
}

fn read(config: &Config, bus: Bus) -> AResult<()> {
	let mut sensor = Mpu6050::new(bus, config.sensor_address);
	sensor.init(&SensorConfig::default())?;
	let sample = sensor.read_sample()?;
	for (name, text) in sample_attributes(&sample) {
		print!("{}: {}", name, text);
	}
	Ok(())
}

fn record(config: &Config, bus: Bus, sub_m: &clap::ArgMatches) -> AResult<()> {
	let layout: RecordLayout = get_param_or(sub_m, "layout", RecordLayout::default())?;
	let count = get_number_or(sub_m, "count", 1)?;

	let mut sensor = Mpu6050::new(bus, config.sensor_address);
	sensor.wake()?;
	let mut dev = SensorDevice::new(sensor, layout);
	let mut buf = vec![0u8; layout.record_size()];
	let stdout = io::stdout();
	let mut out = stdout.lock();
	for _ in 0..count {
		let len = dev.read_record(&mut buf)?;
		out.write_all(&buf[..len])?;
	}
	out.flush()?;
	Ok(())
}

fn text(config: &Config, bus: Bus, sub_m: &clap::ArgMatches) -> AResult<()> {
	let page = get_number_or(sub_m, "PAGE", 0)?;
	let column = get_number_or(sub_m, "COLUMN", 0)?;
	let text = sub_m.value_of("TEXT").unwrap_or("");
	ensure!(page < 256 && column < 256, "cursor position {}/{} out of range", page, column);

	let mut display = Ssd1306::new(bus, config.display_address);
	display.set_cursor(page as u8, column as u8)?;
	display.put_str(text)
}

fn frame(config: &Config, bus: Bus, sub_m: &clap::ArgMatches) -> AResult<()> {
	let path = sub_m.value_of("FILE").unwrap_or("-");
	let data = if path == "-" {
		let mut data = Vec::new();
		io::Read::read_to_end(&mut io::stdin(), &mut data)?;
		data
	} else {
		fs::read(path).map_err(|e| format_err!("couldn't read frame from {}: {}", path, e))?
	};
	let mut dev = DisplayDevice::new(Ssd1306::new(bus, config.display_address));
	dev.write_frame(&data)?;
	Ok(())
}

fn banner(config: &Config, bus: Bus, sub_m: &clap::ArgMatches) -> AResult<()> {
	let text = sub_m.value_of("TEXT").unwrap_or("");
	let scale = get_number_or(sub_m, "scale", 2)?.max(1) as usize;

	let mut fb = FrameBuffer::new();
	let y = HEIGHT.saturating_sub(8 * scale) / 2;
	fb.draw_text(0, y, text, scale);

	let mut display = Ssd1306::new(bus, config.display_address);
	display.write_frame(fb.as_bytes())
}

fn monitor(config: &Config, bus: Bus, sub_m: &clap::ArgMatches) -> AResult<()> {
	let interval = Duration::from_millis(get_number_or(sub_m, "interval_ms", 1000)? as u64);
	let cycles = match sub_m.value_of("cycles") {
		Some(_) => Some(get_number_or(sub_m, "cycles", 0)? as usize),
		None => None,
	};

	let mut sensor = Mpu6050::new(bus.clone(), config.sensor_address);
	sensor.init(&SensorConfig::default())?;
	let mut display = Ssd1306::new(bus, config.display_address);
	display.init()?;

	let stats = Monitor::spawn(sensor, display, interval, cycles)?.join()?;
	info!("monitor: {} cycles, {} updates, {} skipped", stats.cycles, stats.updates, stats.skipped);
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg backend: --backend +takes_value "bus backend: sim, bitbang or native (default sim)")
		(@arg bus: --bus +takes_value "I2C adapter number for the native backend (default 1)")
		(@arg sda: --sda +takes_value "SDA GPIO for the bitbang backend (default 2)")
		(@arg scl: --scl +takes_value "SCL GPIO for the bitbang backend (default 3)")
		(@arg sensor_address: --("sensor-address") +takes_value "sensor address (default 0x68)")
		(@arg display_address: --("display-address") +takes_value "display address (default 0x3c)")
		(@arg policy: --policy +takes_value "on missing ACK: abort or continue (default abort)")
		(@arg delay_us: --("delay-us") +takes_value "settle delay per line transition in µs (default 5)")
		(@arg max_transfer: --("max-transfer") +takes_value "largest single write in bytes (default 33)")
		(@subcommand read =>
			(about: "read one sensor sample and show raw and scaled values")
		)
		(@subcommand record =>
			(about: "write binary sensor records to stdout")
			(@arg layout: -l --layout +takes_value "record layout: accel or full (default full)")
			(@arg count: -n --count +takes_value "number of records (default 1)")
		)
		(@subcommand init_display =>
			(about: "send the display power-up sequence")
		)
		(@subcommand clear =>
			(about: "blank the display")
		)
		(@subcommand text =>
			(about: "write text at a cursor position")
			(@arg PAGE: +required "page (0-7)")
			(@arg COLUMN: +required "column (0-127)")
			(@arg TEXT: +required "text to show")
		)
		(@subcommand frame =>
			(about: "write a raw 1024 byte frame")
			(@arg FILE: +required "frame file (- for stdin)")
		)
		(@subcommand banner =>
			(about: "render text into a frame and show it")
			(@arg scale: -s --scale +takes_value "pixel scale (default 2)")
			(@arg TEXT: +required "text to show")
		)
		(@subcommand monitor =>
			(about: "periodically show sensor values on the display")
			(@arg interval_ms: -i --("interval-ms") +takes_value "refresh interval in ms (default 1000)")
			(@arg cycles: -c --cycles +takes_value "stop after this many refreshes")
		)
	).get_matches();

	let config = load_config(&matches)?;
	debug!("{:?}", config);
	let bus = config.open_bus()?;

	match matches.subcommand() {
		("read", _) => {
			read(&config, bus)
		}
		("record", Some(sub_m)) => {
			record(&config, bus, sub_m)
		}
		("init_display", _) => {
			Ssd1306::new(bus, config.display_address).init()
		}
		("clear", _) => {
			Ssd1306::new(bus, config.display_address).clear()
		}
		("text", Some(sub_m)) => {
			text(&config, bus, sub_m)
		}
		("frame", Some(sub_m)) => {
			frame(&config, bus, sub_m)
		}
		("banner", Some(sub_m)) => {
			banner(&config, bus, sub_m)
		}
		("monitor", Some(sub_m)) => {
			monitor(&config, bus, sub_m)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
