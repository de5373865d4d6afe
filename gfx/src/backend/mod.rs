//! Backend abstraction layer
//!
//! - **Wayland backend** (`wayland`): talks to a real compositor through
//!   `wayland-client` and decodes its events into [`ProtocolEvent`]s.
//!
//! - **Headless backend** (`headless`): for testing without a display server.
//!   Records every request, lets tests inject protocol events and can emulate
//!   the configure handshake of a compositor.
//!
//! The session never talks to protocol objects directly. Every request goes
//! through [`Backend`], keyed by [`WindowHandle`], and every event comes back
//! as a [`ProtocolEvent`] for the listener bank.

pub mod headless;
pub mod wayland;

pub use headless::{HeadlessBackend, Request};
pub use wayland::WaylandBackend;

use std::os::fd::BorrowedFd;

use wayland_client::protocol::{wl_shm::WlShm, wl_surface::WlSurface};
use wayland_client::Connection;

use crate::decoration::ResizeEdge;
use crate::listener::ProtocolEvent;
use crate::window::WindowHandle;

/// Backend abstraction enum
pub enum Backend {
    /// Connection to a Wayland compositor
    Wayland(WaylandBackend),
    /// In-process fake for tests
    Headless(HeadlessBackend),
}

impl Backend {
    /// Read and decode protocol messages.
    ///
    /// With `wait` the call blocks until at least one message arrived;
    /// otherwise only already readable data is processed.
    pub fn dispatch(&mut self, wait: bool) -> anyhow::Result<Vec<ProtocolEvent>> {
        match self {
            Backend::Wayland(wl) => wl.dispatch(wait),
            Backend::Headless(headless) => Ok(headless.dispatch()),
        }
    }

    /// Block until the server processed every request sent so far.
    pub fn roundtrip(&mut self) -> anyhow::Result<Vec<ProtocolEvent>> {
        match self {
            Backend::Wayland(wl) => wl.roundtrip(),
            Backend::Headless(headless) => Ok(headless.dispatch()),
        }
    }

    /// Block until protocol messages arrive or `wakeup` becomes readable.
    pub fn dispatch_until_readable(
        &mut self,
        wakeup: BorrowedFd<'_>,
    ) -> anyhow::Result<Vec<ProtocolEvent>> {
        match self {
            Backend::Wayland(wl) => wl.dispatch_until_readable(wakeup),
            Backend::Headless(headless) => headless.dispatch_until_readable(wakeup),
        }
    }

    pub fn flush(&mut self) {
        match self {
            Backend::Wayland(wl) => wl.flush(),
            Backend::Headless(_) => {}
        }
    }

    /// Create the native surface objects of a window and map it.
    pub fn create_window(&mut self, window: WindowHandle, title: &str) -> anyhow::Result<()> {
        match self {
            Backend::Wayland(wl) => wl.create_window(window, title),
            Backend::Headless(headless) => {
                headless.create_window(window, title);
                Ok(())
            }
        }
    }

    pub fn destroy_window(&mut self, window: WindowHandle) {
        match self {
            Backend::Wayland(wl) => wl.destroy_window(window),
            Backend::Headless(headless) => headless.destroy_window(window),
        }
    }

    pub fn set_title(&mut self, window: WindowHandle, title: &str) {
        match self {
            Backend::Wayland(wl) => wl.set_title(window, title),
            Backend::Headless(headless) => headless.record(Request::SetTitle {
                window,
                title: title.to_string(),
            }),
        }
    }

    pub fn commit(&mut self, window: WindowHandle) {
        match self {
            Backend::Wayland(wl) => wl.commit(window),
            Backend::Headless(headless) => headless.record(Request::Commit { window }),
        }
    }

    pub fn set_maximized(&mut self, window: WindowHandle, maximized: bool) {
        match self {
            Backend::Wayland(wl) => wl.set_maximized(window, maximized),
            Backend::Headless(headless) => headless.set_maximized(window, maximized),
        }
    }

    pub fn set_fullscreen(&mut self, window: WindowHandle, fullscreen: bool) {
        match self {
            Backend::Wayland(wl) => wl.set_fullscreen(window, fullscreen),
            Backend::Headless(headless) => headless.set_fullscreen(window, fullscreen),
        }
    }

    pub fn set_minimized(&mut self, window: WindowHandle) {
        match self {
            Backend::Wayland(wl) => wl.set_minimized(window),
            Backend::Headless(headless) => headless.record(Request::SetMinimized { window }),
        }
    }

    /// Start a compositor-driven move, authorized by a button serial.
    pub fn interactive_move(&mut self, window: WindowHandle, serial: u32) {
        match self {
            Backend::Wayland(wl) => wl.interactive_move(window, serial),
            Backend::Headless(headless) => headless.record(Request::Move { window, serial }),
        }
    }

    /// Start a compositor-driven resize from the given edge.
    pub fn interactive_resize(&mut self, window: WindowHandle, serial: u32, edge: ResizeEdge) {
        match self {
            Backend::Wayland(wl) => wl.interactive_resize(window, serial, edge),
            Backend::Headless(headless) => headless.record(Request::Resize {
                window,
                serial,
                edge,
            }),
        }
    }

    /// Ask the compositor for the window menu at a surface-local position.
    pub fn show_window_menu(&mut self, window: WindowHandle, serial: u32, x: i32, y: i32) {
        match self {
            Backend::Wayland(wl) => wl.show_window_menu(window, serial, x, y),
            Backend::Headless(headless) => headless.record(Request::ShowWindowMenu {
                window,
                serial,
                x,
                y,
            }),
        }
    }

    pub fn ack_configure(&mut self, window: WindowHandle, serial: u32) {
        match self {
            Backend::Wayland(wl) => wl.ack_configure(window, serial),
            Backend::Headless(headless) => {
                headless.record(Request::AckConfigure { window, serial })
            }
        }
    }

    /// Logical size the surface is presented at.
    pub fn set_viewport_destination(&mut self, window: WindowHandle, width: i32, height: i32) {
        match self {
            Backend::Wayland(wl) => wl.set_viewport_destination(window, width, height),
            Backend::Headless(headless) => headless.record(Request::SetViewportDestination {
                window,
                width,
                height,
            }),
        }
    }

    pub fn pong(&mut self, serial: u32) {
        match self {
            Backend::Wayland(wl) => wl.pong(serial),
            Backend::Headless(headless) => headless.record(Request::Pong { serial }),
        }
    }

    pub fn bind_pointer(&mut self) {
        match self {
            Backend::Wayland(wl) => wl.bind_pointer(),
            Backend::Headless(headless) => headless.record(Request::BindPointer),
        }
    }

    pub fn release_pointer(&mut self) {
        match self {
            Backend::Wayland(wl) => wl.release_pointer(),
            Backend::Headless(headless) => headless.record(Request::ReleasePointer),
        }
    }

    pub fn bind_keyboard(&mut self) {
        match self {
            Backend::Wayland(wl) => wl.bind_keyboard(),
            Backend::Headless(headless) => headless.record(Request::BindKeyboard),
        }
    }

    pub fn release_keyboard(&mut self) {
        match self {
            Backend::Wayland(wl) => wl.release_keyboard(),
            Backend::Headless(headless) => headless.record(Request::ReleaseKeyboard),
        }
    }

    /// Show a themed cursor image, hotspot scaled down to surface units.
    pub fn set_cursor(&mut self, name: &'static str, serial: u32, scale: f64) {
        match self {
            Backend::Wayland(wl) => wl.set_cursor(name, serial, scale),
            Backend::Headless(headless) => headless.record(Request::SetCursor {
                name,
                serial,
                scale,
            }),
        }
    }

    /// Reload the cursor theme for a new output scale.
    pub fn reload_cursor_theme(&mut self, size: u32, scale: f64) {
        match self {
            Backend::Wayland(wl) => wl.reload_cursor_theme(size, scale),
            Backend::Headless(headless) => {
                headless.record(Request::ReloadCursorTheme { size, scale })
            }
        }
    }

    /// Raw surface for renderer setup. `None` on headless.
    pub fn wl_surface(&self, window: WindowHandle) -> Option<WlSurface> {
        match self {
            Backend::Wayland(wl) => wl.wl_surface(window),
            Backend::Headless(_) => None,
        }
    }

    /// Display connection, for renderers with their own event queue.
    pub fn connection(&self) -> Option<Connection> {
        match self {
            Backend::Wayland(wl) => Some(wl.connection()),
            Backend::Headless(_) => None,
        }
    }

    pub fn wl_shm(&self) -> Option<WlShm> {
        match self {
            Backend::Wayland(wl) => Some(wl.wl_shm()),
            Backend::Headless(_) => None,
        }
    }

    pub fn is_headless(&self) -> bool {
        matches!(self, Backend::Headless(_))
    }
}
