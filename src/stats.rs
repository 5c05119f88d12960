//! System readings shown on the bar.
//!
//! Every reader here swallows its own failures: a missing or odd-looking source reads as 0, or as
//! [`Battery::unavailable`] for the battery, and is simply tried again on the next refresh.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";
const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Where each reading comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
	pub stat: PathBuf,
	pub meminfo: PathBuf,
	/// Directory of one power supply device, containing `capacity` and `status`.
	pub battery: PathBuf,
}

impl Sources {
	pub fn new(battery: &str) -> Self {
		Sources {
			stat: PathBuf::from(PROC_STAT),
			meminfo: PathBuf::from(PROC_MEMINFO),
			battery: Path::new(POWER_SUPPLY_DIR).join(battery),
		}
	}
}

/// Percentage of CPU time spent busy since boot.
pub fn cpu_usage(path: &Path) -> f64 {
	match fs::read_to_string(path) {
		Ok(text) => parse_cpu(&text).unwrap_or_else(|| {
			log::debug!("No aggregate cpu line in {}", path.display());
			0.0
		}),
		Err(e) => {
			log::debug!("Failed to read {}: {}", path.display(), e);
			0.0
		}
	}
}

/// Reads the aggregate `cpu` line of `/proc/stat`.
///
/// Only the user, nice, system and idle columns are counted.
pub fn parse_cpu(text: &str) -> Option<f64> {
	let line = text.lines().find(|line| line.split_whitespace().next() == Some("cpu"))?;
	let ticks = line
		.split_whitespace()
		.skip(1)
		.take(4)
		.map(|field| field.parse::<u64>().ok())
		.collect::<Option<Vec<_>>>()?;
	if ticks.len() < 4 {
		return None;
	}
	let total = ticks.iter().try_fold(0u64, |sum, &tick| sum.checked_add(tick))?;
	Some(percentage((total - ticks[3]) as f64, total as f64))
}

/// Percentage of memory not reported as free.
pub fn mem_usage(path: &Path) -> f64 {
	match fs::read_to_string(path) {
		Ok(text) => parse_meminfo(&text).unwrap_or_else(|| {
			log::debug!("MemTotal or MemFree missing from {}", path.display());
			0.0
		}),
		Err(e) => {
			log::debug!("Failed to read {}: {}", path.display(), e);
			0.0
		}
	}
}

pub fn parse_meminfo(text: &str) -> Option<f64> {
	let mut total = None;
	let mut free = None;
	for line in text.lines() {
		let mut fields = line.split_whitespace();
		let slot = match fields.next() {
			Some("MemTotal:") => &mut total,
			Some("MemFree:") => &mut free,
			_ => continue,
		};
		*slot = fields.next().and_then(|kb| kb.parse::<u64>().ok());
		if total.is_some() && free.is_some() {
			break;
		}
	}
	let (total, free) = (total? as f64, free? as f64);
	Some(percentage(total - free, total))
}

fn percentage(part: f64, total: f64) -> f64 {
	if total <= 0.0 {
		return 0.0;
	}
	(part * 100.0 / total).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battery {
	/// Charge in percent, -1 when unknown.
	pub percent: i32,
	/// Kernel charging state, such as `Charging` or `Discharging`.
	pub status: String,
}

impl Battery {
	pub const UNAVAILABLE: &'static str = "N/A";

	pub fn unavailable() -> Self {
		Battery {
			percent: -1,
			status: String::from(Self::UNAVAILABLE),
		}
	}
}

/// Reads charge and charging state of the power supply at `dir`.
pub fn battery(dir: &Path) -> Battery {
	let percent = match read_trimmed(&dir.join("capacity")).and_then(|text| text.parse::<i32>().ok()) {
		Some(percent) => percent.clamp(0, 100),
		None => {
			log::debug!("No battery capacity under {}", dir.display());
			return Battery::unavailable();
		}
	};
	let status = read_trimmed(&dir.join("status"))
		.filter(|status| !status.is_empty())
		.unwrap_or_else(|| String::from(Battery::UNAVAILABLE));
	Battery { percent, status }
}

fn read_trimmed(path: &Path) -> Option<String> {
	fs::read_to_string(path).ok().map(|text| text.trim().to_string())
}

/// `ctime`-style wall clock text, e.g. `Mon Oct 19 14:03:07 2026`.
pub fn clock_text<Tz>(now: &chrono::DateTime<Tz>) -> String
where
	Tz: chrono::TimeZone,
	Tz::Offset: fmt::Display,
{
	now.format("%a %b %e %H:%M:%S %Y").to_string()
}

/// Everything shown in one refresh of the bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
	pub time: String,
	pub cpu: f64,
	pub mem: f64,
	pub battery: Battery,
}

impl Snapshot {
	pub fn sample(sources: &Sources, time: String) -> Self {
		Snapshot {
			time,
			cpu: cpu_usage(&sources.stat),
			mem: mem_usage(&sources.meminfo),
			battery: battery(&sources.battery),
		}
	}
}

impl fmt::Display for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"{} | {} Bat: {}% | CPU: {:.1}% | Mem: {:.1}%",
			self.time, self.battery.status, self.battery.percent, self.cpu, self.mem
		)
	}
}
