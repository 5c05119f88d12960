use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::bar::BarConfig;
use crate::draw::Painter;
use crate::stats::{Snapshot, Sources};
use crate::window::Rectangle;

pub mod bar;
pub mod draw;
pub mod stats;
pub mod window;

type Error = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(name = "jagbar")]
#[command(about = "A minimal X11 status bar")]
#[command(version)]
struct Cli {
	/// Path to a key=value config file
	config: Option<PathBuf>,

	/// Log more, repeat for trace output
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
}

fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	log::info!("Starting jagbar");
	let config = bar::load_or_default(cli.config.as_deref());

	let bar = match Bar::init(config) {
		Ok(bar) => bar,
		Err(e) => {
			log::error!("{}", e);
			std::process::exit(1);
		}
	};
	bar.run();
}

/// Everything the refresh loop needs, alive for the whole process.
struct Bar {
	// Dropped before `conn`, the surface draws through it.
	painter: Painter,
	conn: xcb::Connection,
	rect: Rectangle,
	config: BarConfig,
	sources: Sources,
}

impl Bar {
	fn init(config: BarConfig) -> Result<Bar, Error> {
		let (conn, screen_idx) = window::init_xcb()?;

		let (rect, painter) = {
			let screen = window::get_screen(&conn, screen_idx)?;
			let rect = window::bar_rect(&config, screen.width_in_pixels());
			log::info!("Creating bar with dimensions {:?}", rect);

			let window = window::create_dock_window(&conn, &screen, rect, &config)?;
			window::set_dock_hints(&conn, window)?;
			window::map_window(&conn, window)?;

			let mut visual = window::root_visual_type(&screen)?;
			let painter = Painter::new(&conn, window, &mut visual, rect.width, rect.height, config.font_size)?;
			(rect, painter)
		};
		conn.flush();

		let sources = Sources::new(&config.battery);
		log::debug!("Reading system stats from {:?}", sources);

		Ok(Bar {
			painter,
			conn,
			rect,
			config,
			sources,
		})
	}

	fn run(&self) -> ! {
		let interval = Duration::from_secs(self.config.refresh);
		loop {
			self.redraw();
			std::thread::sleep(interval);
		}
	}

	fn redraw(&self) {
		window::drain_events(&self.conn);

		let time = stats::clock_text(&chrono::Local::now());
		let status = Snapshot::sample(&self.sources, time).to_string();
		log::trace!("Status: {}", status);

		let x = draw::right_aligned_x(self.rect.width, self.painter.text_width(&status), self.config.text_offset);
		let y = self.painter.metrics().baseline(self.rect.height);

		self.painter.clear(self.config.background_color);
		self.painter.draw_text(&status, x, y, self.config.font_color);
		self.painter.present();
		if !self.conn.flush() {
			log::warn!("Failed to flush the X connection");
		}
	}
}

fn init_logging(verbosity: u8) {
	let level = match verbosity {
		0 => log::LevelFilter::Info,
		1 => log::LevelFilter::Debug,
		_ => log::LevelFilter::Trace,
	};
	let result = fern::Dispatch::new()
		.format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
		.level(level)
		.chain(std::io::stderr())
		.apply();
	if let Err(e) = result {
		eprintln!("Failed to set up logging: {}", e);
	}
}
