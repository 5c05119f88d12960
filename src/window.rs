use std::fmt;

use crate::bar::BarConfig;

pub fn init_xcb() -> Result<(xcb::Connection, i32), XcbError> {
	let (conn, screen_idx) = xcb::Connection::connect(None).map_err(|e| XcbError::Connect(format!("{:?}", e)))?;
	Ok((conn, screen_idx))
}

pub fn get_screen(conn: &xcb::Connection, screen_idx: i32) -> Result<xcb::Screen, XcbError> {
	let setup = conn.get_setup();
	let screen = setup.roots().nth(screen_idx as usize).ok_or(XcbError::NoScreen(screen_idx))?;
	Ok(screen)
}

/// Geometry of the bar on the root window, with a width of 0 stretched to the screen.
pub fn bar_rect(config: &BarConfig, screen_width: u16) -> Rectangle {
	let width = if config.width == 0 {
		screen_width as u32
	} else {
		config.width
	};
	Rectangle {
		x: config.x,
		y: config.y,
		width,
		height: config.height,
	}
}

/// Creates the bar window. It is not mapped yet.
pub fn create_dock_window(
	conn: &xcb::Connection,
	screen: &xcb::Screen,
	rect: Rectangle,
	config: &BarConfig,
) -> Result<xcb::Window, XcbError> {
	let window = conn.generate_id();
	xcb::create_window_checked(
		conn,
		xcb::COPY_FROM_PARENT as u8,
		window,
		screen.root(),
		clamp_i16(rect.x),
		clamp_i16(rect.y),
		clamp_u16(rect.width.max(1)),
		clamp_u16(rect.height.max(1)),
		clamp_u16(config.border),
		xcb::WINDOW_CLASS_INPUT_OUTPUT as u16,
		screen.root_visual(),
		&[
			(xcb::CW_BACK_PIXEL, config.background_color.pixel()),
			(xcb::CW_BORDER_PIXEL, config.font_color.pixel()),
			(xcb::CW_EVENT_MASK, xcb::EVENT_MASK_EXPOSURE | xcb::EVENT_MASK_KEY_PRESS),
		],
	)
	.request_check()
	.map_err(|e| XcbError::Request("create_window", e.error_code()))?;
	log::debug!("Created window {:#x} at {:?}", window, rect);
	Ok(window)
}

pub fn intern_atom(conn: &xcb::Connection, name: &str) -> Result<xcb::Atom, XcbError> {
	let reply = xcb::intern_atom(conn, false, name)
		.get_reply()
		.map_err(|e| XcbError::Request("intern_atom", e.error_code()))?;
	Ok(reply.atom())
}

fn set_atom_property(conn: &xcb::Connection, window: xcb::Window, property: &str, value: &str) -> Result<(), XcbError> {
	let property = intern_atom(conn, property)?;
	let value = intern_atom(conn, value)?;
	xcb::change_property_checked(
		conn,
		xcb::PROP_MODE_REPLACE as u8,
		window,
		property,
		xcb::ATOM_ATOM,
		32,
		&[value],
	)
	.request_check()
	.map_err(|e| XcbError::Request("change_property", e.error_code()))
}

/// Marks the window as a dock that stays above other windows.
pub fn set_dock_hints(conn: &xcb::Connection, window: xcb::Window) -> Result<(), XcbError> {
	set_atom_property(conn, window, "_NET_WM_WINDOW_TYPE", "_NET_WM_WINDOW_TYPE_DOCK")?;
	set_atom_property(conn, window, "_NET_WM_STATE", "_NET_WM_STATE_ABOVE")
}

pub fn map_window(conn: &xcb::Connection, window: xcb::Window) -> Result<(), XcbError> {
	xcb::map_window_checked(conn, window)
		.request_check()
		.map_err(|e| XcbError::Request("map_window", e.error_code()))
}

/// Looks up the visual type of the screen's root visual, needed by cairo.
pub fn root_visual_type(screen: &xcb::Screen) -> Result<xcb::Visualtype, XcbError> {
	for depth in screen.allowed_depths() {
		for visual in depth.visuals() {
			if visual.visual_id() == screen.root_visual() {
				return Ok(visual);
			}
		}
	}
	Err(XcbError::NoVisual(screen.root_visual()))
}

/// Discards queued events. Nothing on the bar reacts to input.
pub fn drain_events(conn: &xcb::Connection) {
	while let Some(event) = conn.poll_for_event() {
		log::trace!("Ignoring event of type {}", event.response_type() & !0x80);
	}
}

fn clamp_i16(v: i32) -> i16 {
	v.max(i16::MIN as i32).min(i16::MAX as i32) as i16
}

fn clamp_u16(v: u32) -> u16 {
	v.min(u16::MAX as u32) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

#[derive(Debug)]
pub enum XcbError {
	Connect(String),
	NoScreen(i32),
	NoVisual(xcb::Visualid),
	Request(&'static str, u8),
}

impl fmt::Display for XcbError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			XcbError::Connect(reason) => write!(f, "Cannot open display: {}", reason),
			XcbError::NoScreen(idx) => write!(f, "X server has no screen {}", idx),
			XcbError::NoVisual(id) => write!(f, "No visual type found for visual {:#x}", id),
			XcbError::Request(request, code) => write!(f, "X request {} failed with error code {}", request, code),
		}
	}
}

impl std::error::Error for XcbError {}
