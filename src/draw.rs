use std::fmt;

use cairo::{FontSlant, FontWeight};

use crate::bar::Rgb;

pub const DEFAULT_FONT: &str = "monospace";
pub const FALLBACK_FONT: &str = "fixed";

/// Vertical font metrics, computed once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
	pub ascent: f64,
	pub descent: f64,
}

impl FontMetrics {
	/// `None` for a font that reports no height, which cairo does when it has nothing to render with.
	fn new(ascent: f64, descent: f64) -> Option<Self> {
		if ascent + descent > 0.0 {
			Some(FontMetrics { ascent, descent })
		} else {
			None
		}
	}

	/// Baseline that centers a line of text in a bar `height` pixels tall.
	pub fn baseline(&self, height: u32) -> f64 {
		(height as f64 + self.ascent - self.descent) / 2.0
	}
}

/// Left edge of text `text_width` wide, ending `offset` pixels before the right edge.
pub fn right_aligned_x(bar_width: u32, text_width: f64, offset: i32) -> f64 {
	bar_width as f64 - text_width - offset as f64
}

/// Cairo drawing on the bar window.
pub struct Painter {
	ctx: cairo::Context,
	surface: cairo::XCBSurface,
	metrics: FontMetrics,
}

impl Painter {
	pub fn new(
		conn: &xcb::Connection,
		window: xcb::Window,
		visual: &mut xcb::Visualtype,
		width: u32,
		height: u32,
		font_size: f64,
	) -> Result<Painter, DrawError> {
		let cairo_conn = unsafe {
			cairo::XCBConnection::from_raw_none(conn.get_raw_conn() as *mut cairo_sys::xcb_connection_t)
		};
		let cairo_visual = unsafe {
			cairo::XCBVisualType::from_raw_none(
				&mut visual.base as *mut _ as *mut cairo_sys::xcb_visualtype_t,
			)
		};
		let surface = cairo::XCBSurface::create(
			&cairo_conn,
			&cairo::XCBDrawable(window),
			&cairo_visual,
			width as i32,
			height as i32,
		)
		.map_err(DrawError::Surface)?;
		let ctx = cairo::Context::new(&surface);
		let metrics = select_font(&ctx, font_size)?;
		log::debug!("Font metrics: {:?}", metrics);

		Ok(Painter { ctx, surface, metrics })
	}

	pub fn metrics(&self) -> FontMetrics {
		self.metrics
	}

	pub fn text_width(&self, text: &str) -> f64 {
		self.ctx.text_extents(text).x_advance
	}

	pub fn clear(&self, color: Rgb) {
		let (r, g, b) = color.components();
		self.ctx.set_source_rgb(r, g, b);
		self.ctx.paint();
	}

	pub fn draw_text(&self, text: &str, x: f64, y: f64, color: Rgb) {
		let (r, g, b) = color.components();
		self.ctx.set_source_rgb(r, g, b);
		self.ctx.move_to(x, y);
		self.ctx.show_text(text);
	}

	/// Pushes pending cairo drawing to the connection.
	pub fn present(&self) {
		self.surface.flush();
	}
}

fn select_font(ctx: &cairo::Context, font_size: f64) -> Result<FontMetrics, DrawError> {
	for family in &[DEFAULT_FONT, FALLBACK_FONT] {
		ctx.select_font_face(family, FontSlant::Normal, FontWeight::Normal);
		ctx.set_font_size(font_size);
		let extents = ctx.font_extents();
		match FontMetrics::new(extents.ascent, extents.descent) {
			Some(metrics) => return Ok(metrics),
			None => log::warn!("Failed to get metrics for font '{}', trying the next one", family),
		}
	}
	Err(DrawError::NoFont)
}

#[derive(Debug)]
pub enum DrawError {
	Surface(cairo::Status),
	NoFont,
}

impl fmt::Display for DrawError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			DrawError::Surface(status) => write!(f, "Failed to create cairo surface: {:?}", status),
			DrawError::NoFont => write!(f, "No usable font, tried '{}' and '{}'", DEFAULT_FONT, FALLBACK_FONT),
		}
	}
}

impl std::error::Error for DrawError {}
