// Human readable per-axis attributes: "<raw>\t<scaled>\n"

use super::{
	Axis,
	SensorSample,
};

fn decimals(axis: Axis) -> usize {
	match axis {
		Axis::AccelX | Axis::AccelY | Axis::AccelZ => 3,
		Axis::Temperature | Axis::GyroX | Axis::GyroY | Axis::GyroZ => 2,
	}
}

pub fn format_attribute(axis: Axis, raw: i16) -> String {
	format!("{}\t{:.*}\n", raw, decimals(axis), axis.scale(raw))
}

pub fn sample_attributes(sample: &SensorSample) -> Vec<(&'static str, String)> {
	Axis::ALL.iter()
		.map(|&axis| (axis.name(), format_attribute(axis, sample.get(axis))))
		.collect()
}
