use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^\s*([^=]+)=([^#\n]*)").expect("line pattern is valid"));

/// A 24-bit `0xRRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u32);

impl Rgb {
	pub const MAX: u32 = 0x00ff_ffff;

	/// Parses a hex color, with or without a leading `0x`.
	pub fn from_hex(value: &str) -> Option<Rgb> {
		let digits = value
			.strip_prefix("0x")
			.or_else(|| value.strip_prefix("0X"))
			.unwrap_or(value);
		match u32::from_str_radix(digits, 16) {
			Ok(rgb) if rgb <= Self::MAX => Some(Rgb(rgb)),
			_ => None,
		}
	}

	/// The pixel value handed to the X server.
	pub fn pixel(self) -> u32 {
		self.0
	}

	/// Channels scaled to `0.0..=1.0` for cairo.
	pub fn components(self) -> (f64, f64, f64) {
		let channel = |shift: u32| ((self.0 >> shift) & 0xff) as f64 / 255.0;
		(channel(16), channel(8), channel(0))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarConfig {
	pub height: u32,
	/// 0 means the full screen width.
	pub width: u32,
	pub x: i32,
	pub y: i32,
	/// Seconds between redraws, never 0.
	pub refresh: u64,
	pub background_color: Rgb,
	pub font_color: Rgb,
	/// Parsed but not used when drawing.
	pub corner_radius: u32,
	pub border: u32,
	/// Gap between the end of the text and the right edge of the bar.
	pub text_offset: i32,
	pub font_size: f64,
	/// Name of the device under `/sys/class/power_supply`.
	pub battery: String,
}

impl Default for BarConfig {
	fn default() -> Self {
		BarConfig {
			height: 20,
			width: 0,
			x: 0,
			y: 0,
			refresh: 1,
			background_color: Rgb(0xffffff),
			font_color: Rgb(0x000000),
			corner_radius: 10,
			border: 0,
			text_offset: 10,
			font_size: 12.0,
			battery: String::from("BAT0"),
		}
	}
}

impl BarConfig {
	/// Reads and parses a config file.
	pub fn load(path: &Path) -> Result<(BarConfig, Vec<Diagnostic>), ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Ok(BarConfig::parse(&text))
	}

	/// Applies every `key=value` line of `text` on top of the defaults.
	///
	/// Bad lines are reported back and skipped, they never stop the parse.
	pub fn parse(text: &str) -> (BarConfig, Vec<Diagnostic>) {
		let mut config = BarConfig::default();
		let mut diagnostics = Vec::new();

		for (idx, line) in text.lines().enumerate() {
			let line_num = idx + 1;
			let captures = match LINE_PATTERN.captures(line) {
				Some(captures) => captures,
				None => {
					let trimmed = line.trim_start();
					if !trimmed.is_empty() && !trimmed.starts_with('#') {
						diagnostics.push(Diagnostic::Malformed {
							line: line_num,
							text: line.to_string(),
						});
					}
					continue;
				}
			};

			let key = captures[1].trim();
			let value = captures[2].trim();
			if key.starts_with('#') {
				continue;
			}
			if let Err(diagnostic) = config.apply(key, value, line_num) {
				diagnostics.push(diagnostic);
			}
		}

		(config, diagnostics)
	}

	fn apply(&mut self, key: &str, value: &str, line: usize) -> Result<(), Diagnostic> {
		let invalid = || Diagnostic::InvalidValue {
			line,
			key: key.to_string(),
			value: value.to_string(),
		};
		match key {
			"height" => self.height = value.parse().map_err(|_| invalid())?,
			"width" => self.width = value.parse().map_err(|_| invalid())?,
			"x" => self.x = value.parse().map_err(|_| invalid())?,
			"y" => self.y = value.parse().map_err(|_| invalid())?,
			"border" => self.border = value.parse().map_err(|_| invalid())?,
			"refresh" => match value.parse::<u64>() {
				Ok(secs) if secs > 0 => self.refresh = secs,
				_ => return Err(invalid()),
			},
			"bgcolor" => self.background_color = Rgb::from_hex(value).ok_or_else(invalid)?,
			"fgcolor" => self.font_color = Rgb::from_hex(value).ok_or_else(invalid)?,
			"corner_radius" => self.corner_radius = value.parse().map_err(|_| invalid())?,
			"text_offset" => self.text_offset = value.parse().map_err(|_| invalid())?,
			"font_size" => match value.parse::<f64>() {
				Ok(size) if size > 0.0 && size.is_finite() => self.font_size = size,
				_ => return Err(invalid()),
			},
			"battery" if !value.is_empty() && !value.contains('/') => self.battery = value.to_string(),
			"battery" => return Err(invalid()),
			_ => {
				return Err(Diagnostic::UnknownKey {
					line,
					key: key.to_string(),
				})
			}
		}
		Ok(())
	}
}

/// Loads the config at `path`, falling back to the defaults for anything that goes wrong.
pub fn load_or_default(path: Option<&Path>) -> BarConfig {
	let path = match path {
		Some(path) => path,
		None => {
			log::info!("No config file given, using defaults");
			return BarConfig::default();
		}
	};

	match BarConfig::load(path) {
		Ok((config, diagnostics)) => {
			for diagnostic in &diagnostics {
				log::warn!("{} in {}", diagnostic, path.display());
			}
			log::info!("Loaded config from {}", path.display());
			config
		}
		Err(e) => {
			log::error!("{}, using defaults", e);
			BarConfig::default()
		}
	}
}

/// A problem with a single config line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
	Malformed { line: usize, text: String },
	UnknownKey { line: usize, key: String },
	InvalidValue { line: usize, key: String, value: String },
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Diagnostic::Malformed { line, text } => write!(f, "Malformed line {}: {}", line, text),
			Diagnostic::UnknownKey { line, key } => write!(f, "Unknown key '{}' at line {}", key, line),
			Diagnostic::InvalidValue { line, key, value } => {
				write!(f, "Invalid value '{}' for key '{}' at line {}", value, key, line)
			}
		}
	}
}

#[derive(Debug)]
pub enum ConfigError {
	Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ConfigError::Io { path, source } => {
				write!(f, "Cannot open config file {}: {}", path.display(), source)
			}
		}
	}
}

impl std::error::Error for ConfigError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ConfigError::Io { source, .. } => Some(source),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn parses_documented_example() {
		let (config, diagnostics) = BarConfig::parse("height=24\nbgcolor=112233\nfgcolor=ffeedd\nwidth=800\n");

		assert!(diagnostics.is_empty());
		assert_eq!(config.height, 24);
		assert_eq!(config.background_color, Rgb(0x112233));
		assert_eq!(config.font_color, Rgb(0xFFEEDD));
		assert_eq!(config.width, 800);
		assert_eq!(config.x, 0);
		assert_eq!(config.y, 0);
		assert_eq!(config.refresh, 1);
		assert_eq!(config.border, 0);
		assert_eq!(config.text_offset, 10);
	}

	#[test]
	fn each_key_sets_only_its_field() {
		let cases: [(&str, fn(&mut BarConfig)); 12] = [
			("height=30", |c| c.height = 30),
			("width=640", |c| c.width = 640),
			("x=-5", |c| c.x = -5),
			("y=12", |c| c.y = 12),
			("refresh=5", |c| c.refresh = 5),
			("border=2", |c| c.border = 2),
			("bgcolor=0x202020", |c| c.background_color = Rgb(0x202020)),
			("fgcolor=A0B0C0", |c| c.font_color = Rgb(0xa0b0c0)),
			("corner_radius=4", |c| c.corner_radius = 4),
			("text_offset=25", |c| c.text_offset = 25),
			("font_size=9.5", |c| c.font_size = 9.5),
			("battery=BAT1", |c| c.battery = String::from("BAT1")),
		];

		for (line, set) in cases {
			let mut expected = BarConfig::default();
			set(&mut expected);
			let (config, diagnostics) = BarConfig::parse(line);
			assert!(diagnostics.is_empty(), "{}: {:?}", line, diagnostics);
			assert_eq!(config, expected, "{}", line);
		}
	}

	#[test]
	fn refresh_does_not_touch_y() {
		let (config, _) = BarConfig::parse("refresh=3\n");
		assert_eq!(config.refresh, 3);
		assert_eq!(config.y, 0);
	}

	#[test]
	fn malformed_line_is_reported_and_parsing_continues() {
		let (config, diagnostics) = BarConfig::parse("height=30\nthis line has no equals\nwidth=100\n");

		assert_eq!(
			diagnostics,
			vec![Diagnostic::Malformed {
				line: 2,
				text: String::from("this line has no equals"),
			}]
		);
		assert_eq!(config.height, 30);
		assert_eq!(config.width, 100);
	}

	#[test]
	fn comments_and_blank_lines_are_skipped() {
		let text = "# a comment\n\n   \n  # indented comment\n#height=99\nheight=22 # trailing\n";
		let (config, diagnostics) = BarConfig::parse(text);

		assert!(diagnostics.is_empty(), "{:?}", diagnostics);
		assert_eq!(config.height, 22);
	}

	#[test]
	fn unknown_key_is_reported_with_line_number() {
		let (config, diagnostics) = BarConfig::parse("height=25\nopacity=0.5\n");

		assert_eq!(
			diagnostics,
			vec![Diagnostic::UnknownKey {
				line: 2,
				key: String::from("opacity"),
			}]
		);
		assert_eq!(config.height, 25);
	}

	#[test]
	fn keys_are_case_sensitive() {
		let (config, diagnostics) = BarConfig::parse("Height=40\n");
		assert_eq!(config, BarConfig::default());
		assert_eq!(diagnostics.len(), 1);
	}

	#[test]
	fn invalid_values_keep_the_default() {
		let (config, diagnostics) = BarConfig::parse("height=tall\nrefresh=0\nbgcolor=1000000\nfgcolor=zz\n");

		assert_eq!(config, BarConfig::default());
		assert_eq!(diagnostics.len(), 4);
		assert!(diagnostics
			.iter()
			.all(|d| matches!(d, Diagnostic::InvalidValue { .. })));
	}

	#[test]
	fn whitespace_around_key_and_value_is_ignored() {
		let (config, diagnostics) = BarConfig::parse("  height = 32  \n\twidth=\t1024\n");
		assert!(diagnostics.is_empty());
		assert_eq!(config.height, 32);
		assert_eq!(config.width, 1024);
	}

	#[test]
	fn diagnostics_name_the_line() {
		let diagnostic = Diagnostic::UnknownKey {
			line: 7,
			key: String::from("colour"),
		};
		assert_eq!(diagnostic.to_string(), "Unknown key 'colour' at line 7");
	}

	#[test]
	fn load_reads_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("jagbar.conf");
		std::fs::write(&path, "height=26\nrefresh=2\n").unwrap();

		let (config, diagnostics) = BarConfig::load(&path).unwrap();
		assert!(diagnostics.is_empty());
		assert_eq!(config.height, 26);
		assert_eq!(config.refresh, 2);
	}

	#[test]
	fn missing_file_is_an_error_and_falls_back_to_defaults() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("missing.conf");

		assert!(matches!(BarConfig::load(&path), Err(ConfigError::Io { .. })));
		assert_eq!(load_or_default(Some(&path)), BarConfig::default());
		assert_eq!(load_or_default(None), BarConfig::default());
	}

	#[test]
	fn color_components() {
		let (r, g, b) = Rgb(0xff8000).components();
		assert_eq!(r, 1.0);
		assert!((g - 128.0 / 255.0).abs() < 1e-9);
		assert_eq!(b, 0.0);
	}
}
