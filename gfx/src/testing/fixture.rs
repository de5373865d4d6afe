//! Test fixture for session testing
//!
//! Provides a session over the emulating headless backend, with helpers that
//! inject the protocol messages a compositor and seat would send.

use crate::backend::{Backend, HeadlessBackend, Request};
use crate::config::GfxConfig;
use crate::cursor::CURSOR_THEME_SIZE;
use crate::event::EventList;
use crate::listener::{Axis, ProtocolEvent};
use crate::utils::Rect;
use crate::window::{Window, WindowFlags, WindowHandle};
use crate::Session;

use super::TEST_KEYMAP;

/// Test fixture that manages a headless session
pub struct Fixture {
    session: Session,
    /// Serial for the next injected input message
    serial: u32,
    /// Timestamp for the next injected input message, in ms
    time: u32,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Config that ignores the environment
    pub fn config() -> GfxConfig {
        GfxConfig {
            cursor_theme: "default".to_string(),
            cursor_size: CURSOR_THEME_SIZE,
            double_click_ms: 200,
            scroll_divisor: 10.0,
        }
    }

    /// Create a session whose seat has a pointer and a keyboard.
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn with_config(config: GfxConfig) -> Self {
        let backend = Backend::Headless(HeadlessBackend::with_compositor());
        let mut fixture = Self {
            session: Session::with_backend(backend, config),
            serial: 0,
            time: 1000,
        };
        fixture.seat(true, true);
        fixture.dispatch();
        fixture.take_requests();
        fixture
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn headless(&self) -> &HeadlessBackend {
        match self.session.backend() {
            Backend::Headless(headless) => headless,
            Backend::Wayland(_) => unreachable!("fixture always runs headless"),
        }
    }

    fn headless_mut(&mut self) -> &mut HeadlessBackend {
        match self.session.backend_mut() {
            Backend::Headless(headless) => headless,
            Backend::Wayland(_) => unreachable!("fixture always runs headless"),
        }
    }

    fn next_serial(&mut self) -> u32 {
        self.serial += 1;
        self.serial
    }

    /// Open a window. Its first configure has already been applied.
    pub fn open_window(&mut self, title: &str) -> WindowHandle {
        let handle = self
            .session
            .open_window(Rect::ZERO, WindowFlags::default(), title);
        assert!(!handle.is_null(), "headless window creation failed");
        handle
    }

    /// Open a window with a title bar, resize edges and no client areas.
    pub fn open_decorated(&mut self, title: &str, title_bar: f32, edges: f32) -> WindowHandle {
        let handle = self.open_window(title);
        self.session.push_custom_title_bar(handle, title_bar);
        self.session.push_custom_edges(handle, edges);
        handle
    }

    pub fn window(&self, handle: WindowHandle) -> &Window {
        self.session
            .window(handle)
            .unwrap_or_else(|| panic!("no window {:?}", handle))
    }

    /// Queue a protocol message for the next dispatch.
    pub fn inject(&mut self, event: ProtocolEvent) {
        self.headless_mut().inject(event);
    }

    /// Pump without waiting and return the produced events.
    pub fn dispatch(&mut self) -> EventList {
        self.session.get_events(false).unwrap_or_default()
    }

    pub fn requests(&self) -> &[Request] {
        self.headless().requests()
    }

    pub fn take_requests(&mut self) -> Vec<Request> {
        self.headless_mut().take_requests()
    }

    /// Advance the input clock by `ms`.
    pub fn advance(&mut self, ms: u32) {
        self.time = self.time.wrapping_add(ms);
    }

    // Seat

    pub fn seat(&mut self, pointer: bool, keyboard: bool) {
        self.inject(ProtocolEvent::SeatCapabilities { pointer, keyboard });
    }

    /// Send [`TEST_KEYMAP`] and focus `window`.
    pub fn keyboard_enter(&mut self, window: WindowHandle) {
        self.inject(ProtocolEvent::Keymap {
            text: TEST_KEYMAP.to_string(),
        });
        self.inject(ProtocolEvent::KeyboardEnter { window });
    }

    pub fn keyboard_leave(&mut self, window: WindowHandle) {
        self.inject(ProtocolEvent::KeyboardLeave { window });
    }

    pub fn modifiers(&mut self, depressed: u32) {
        self.inject(ProtocolEvent::Modifiers {
            depressed,
            latched: 0,
            locked: 0,
            group: 0,
        });
    }

    /// Press or release an evdev key.
    pub fn key(&mut self, key: u32, pressed: bool) {
        let serial = self.next_serial();
        self.inject(ProtocolEvent::Key {
            serial,
            time: self.time,
            key,
            pressed,
        });
    }

    /// Press then release an evdev key.
    pub fn tap(&mut self, key: u32) {
        self.key(key, true);
        self.key(key, false);
    }

    /// Pointer enters `window` at surface-local logical coordinates.
    pub fn pointer_enter(&mut self, window: WindowHandle, x: f64, y: f64) {
        let serial = self.next_serial();
        self.inject(ProtocolEvent::PointerEnter {
            window,
            serial,
            x,
            y,
        });
    }

    pub fn pointer_leave(&mut self, window: WindowHandle) {
        self.inject(ProtocolEvent::PointerLeave { window });
    }

    pub fn motion(&mut self, x: f64, y: f64) {
        self.inject(ProtocolEvent::PointerMotion {
            time: self.time,
            x,
            y,
        });
    }

    /// Press or release a pointer button. Returns the message serial.
    pub fn button(&mut self, button: u32, pressed: bool) -> u32 {
        let serial = self.next_serial();
        self.inject(ProtocolEvent::PointerButton {
            serial,
            time: self.time,
            button,
            pressed,
        });
        serial
    }

    /// Press and release a pointer button. Returns the press serial.
    pub fn click(&mut self, button: u32) -> u32 {
        let serial = self.button(button, true);
        self.button(button, false);
        serial
    }

    pub fn axis(&mut self, axis: Axis, value: f64) {
        self.inject(ProtocolEvent::PointerAxis {
            time: self.time,
            axis,
            value,
        });
    }

    // Toplevel

    /// Configure `window` the way a compositor would: toplevel state first,
    /// then the surface configure that commits it.
    pub fn configure(
        &mut self,
        window: WindowHandle,
        width: i32,
        height: i32,
        maximized: bool,
        fullscreen: bool,
    ) -> u32 {
        let serial = self.next_serial();
        self.inject(ProtocolEvent::ToplevelConfigure {
            window,
            width,
            height,
            maximized,
            fullscreen,
            activated: true,
        });
        self.inject(ProtocolEvent::SurfaceConfigure { window, serial });
        serial
    }

    pub fn close_request(&mut self, window: WindowHandle) {
        self.inject(ProtocolEvent::ToplevelClose { window });
    }

    /// Preferred scale as a fraction of 120.
    pub fn preferred_scale(&mut self, window: WindowHandle, scale: u32) {
        self.inject(ProtocolEvent::PreferredScale { window, scale });
    }
}
