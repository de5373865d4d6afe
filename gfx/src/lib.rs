//! wlos - Wayland windowing and input backend
//!
//! Turns the callback-driven Wayland protocol into an ordered list of typed
//! input events per pump, and keeps the per-window state (size, scale,
//! custom decorations, maximize/fullscreen) the compositor updates
//! out-of-band.
//!
//! Everything hangs off one [`Session`], created with [`Session::connect`]
//! and dropped at exit.
pub mod backend;
pub mod config;
pub mod cursor;
pub mod dbus;
pub mod decoration;
pub mod event;
pub mod input;
pub mod listener;
pub mod testing;
pub mod utils;
pub mod window;

pub use config::{GfxConfig, GfxInfo};
pub use cursor::Cursor;
pub use event::{Event, EventKind, EventList};
pub use input::{Key, Modifiers};
pub use utils::{Rect, Vec2};
pub use window::{RenderTarget, WindowFlags, WindowHandle};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use wayland_client::protocol::{wl_shm::WlShm, wl_surface::WlSurface};
use wayland_client::Connection;

use crate::backend::{Backend, WaylandBackend};
use crate::cursor::CursorState;
use crate::input::Keyboard;
use crate::window::{Window, WindowRegistry};

/// Nominal DPI reported for windows and monitors
pub const DEFAULT_DPI: f32 = 96.0;

/// Monitor identifier. Monitor enumeration is not available on Wayland
/// clients without extra protocols, so every query yields the null handle.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MonitorHandle(u64);

impl MonitorHandle {
    pub const NULL: MonitorHandle = MonitorHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Which input devices the seat currently offers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SeatState {
    pub pointer: bool,
    pub keyboard: bool,
}

/// Initialize logging to journald.
/// Filter controlled by RUST_LOG env var (default: wlos_core=debug,wlos_demo=debug).
/// View logs with: journalctl --user -t wlos -f
pub fn init_logging() {
    use std::sync::Once;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    static INIT_LOG: Once = Once::new();
    INIT_LOG.call_once(|| {
        let default_filter = "wlos_core=debug,wlos_demo=debug";
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        // Try journald first, fall back to stderr
        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter)
                .with(journald.with_syslog_identifier("wlos".to_string()))
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    });
}

/// Windowing session: display connection, windows and input state
pub struct Session {
    pub(crate) backend: Backend,
    pub(crate) windows: WindowRegistry,
    pub(crate) seat: SeatState,
    /// Window under the pointer
    pub(crate) pointer_focus: WindowHandle,
    /// Serial of the last pointer enter, required for set_cursor
    pub(crate) pointer_serial: u32,
    pub(crate) keyboard_focus: WindowHandle,
    pub(crate) keyboard: Keyboard,
    pub(crate) cursor: CursorState,
    /// Scale the cursor theme is currently loaded at
    pub(crate) cursor_scale: f64,
    pub(crate) keys_down: HashSet<Key>,
    /// Events not yet handed out by `get_events`
    pub(crate) pending: EventList,
    pub(crate) config: GfxConfig,
    info: GfxInfo,
}

impl Session {
    /// Connect to the compositor named by `$WAYLAND_DISPLAY`.
    pub fn connect() -> anyhow::Result<Self> {
        Self::connect_with_config(GfxConfig::from_env())
    }

    pub fn connect_with_config(config: GfxConfig) -> anyhow::Result<Self> {
        let backend = WaylandBackend::connect(&config)?;
        let mut session = Self::with_backend(Backend::Wayland(backend), config);

        // Seat capabilities, then the keymap of the freshly bound keyboard
        for _ in 0..2 {
            let events = session.backend.roundtrip()?;
            session.handle_protocol_events(events);
        }
        Ok(session)
    }

    /// Session over an existing backend. Does not dispatch.
    pub fn with_backend(backend: Backend, config: GfxConfig) -> Self {
        Self {
            backend,
            windows: WindowRegistry::new(),
            seat: SeatState::default(),
            pointer_focus: WindowHandle::NULL,
            pointer_serial: 0,
            keyboard_focus: WindowHandle::NULL,
            keyboard: Keyboard::new(),
            cursor: CursorState::default(),
            cursor_scale: 1.0,
            keys_down: HashSet::new(),
            pending: EventList::new(),
            config,
            info: GfxInfo::default(),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut Backend {
        &mut self.backend
    }

    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    pub fn gfx_info(&self) -> &GfxInfo {
        &self.info
    }

    /// Read-only view of a window's state
    pub fn window(&self, handle: WindowHandle) -> Option<&Window> {
        self.windows.get(handle)
    }

    /// Open windows in creation order
    pub fn windows(&self) -> &[WindowHandle] {
        self.windows.handles()
    }

    pub fn pointer_focus(&self) -> WindowHandle {
        self.pointer_focus
    }

    pub fn keyboard_focus(&self) -> WindowHandle {
        self.keyboard_focus
    }

    fn roundtrip(&mut self) {
        match self.backend.roundtrip() {
            Ok(events) => self.handle_protocol_events(events),
            Err(e) => warn!("Roundtrip failed: {:#}", e),
        }
    }

    // Clipboard

    pub fn set_clipboard_text(&mut self, _text: &str) {}

    pub fn clipboard_text(&self) -> String {
        String::new()
    }

    // Windows

    /// Create a toplevel window and wait for its first configure.
    ///
    /// `rect` and `flags` are advisory; the compositor owns placement.
    pub fn open_window(&mut self, _rect: Rect, _flags: WindowFlags, title: &str) -> WindowHandle {
        let handle = self.windows.insert(Window::new(title));
        if let Err(e) = self.backend.create_window(handle, title) {
            warn!("Failed to create window: {:#}", e);
            self.windows.remove(handle);
            return WindowHandle::NULL;
        }
        self.roundtrip();
        info!("Opened window {:?} '{}'", handle, title);
        handle
    }

    pub fn close_window(&mut self, handle: WindowHandle) {
        if self.windows.remove(handle).is_none() {
            return;
        }
        if self.pointer_focus == handle {
            self.pointer_focus = WindowHandle::NULL;
        }
        if self.keyboard_focus == handle {
            self.keyboard_focus = WindowHandle::NULL;
        }
        self.backend.destroy_window(handle);
        self.roundtrip();
        info!("Closed window {:?}", handle);
    }

    pub fn set_title(&mut self, handle: WindowHandle, title: &str) {
        let Some(window) = self.windows.get_mut(handle) else {
            return;
        };
        window.title = title.to_string();
        self.backend.set_title(handle, title);
        self.backend.flush();
    }

    /// Commit the surface after the first frame was rendered.
    pub fn first_paint(&mut self, handle: WindowHandle) {
        if self.windows.contains(handle) {
            self.backend.commit(handle);
            self.backend.flush();
        }
    }

    /// Clients cannot take focus on Wayland.
    pub fn focus(&mut self, _handle: WindowHandle) {}

    pub fn is_focused(&self, handle: WindowHandle) -> bool {
        match self.windows.get(handle) {
            Some(window) => window.activated || self.keyboard_focus == handle,
            None => false,
        }
    }

    pub fn is_fullscreen(&self, handle: WindowHandle) -> bool {
        self.windows.get(handle).is_some_and(|w| w.fullscreen)
    }

    pub fn set_fullscreen(&mut self, handle: WindowHandle, fullscreen: bool) {
        if self.windows.contains(handle) {
            self.backend.set_fullscreen(handle, fullscreen);
        }
    }

    pub fn is_maximized(&self, handle: WindowHandle) -> bool {
        self.windows.get(handle).is_some_and(|w| w.maximized)
    }

    /// Request (un)maximize and wait for the compositor to answer.
    pub fn set_maximized(&mut self, handle: WindowHandle, maximized: bool) {
        if self.windows.contains(handle) {
            self.backend.set_maximized(handle, maximized);
            self.roundtrip();
        }
    }

    /// xdg-shell never reports minimization.
    pub fn is_minimized(&self, _handle: WindowHandle) -> bool {
        false
    }

    /// Minimizing is a one-way request; there is no unminimize.
    pub fn set_minimized(&mut self, handle: WindowHandle, minimized: bool) {
        if minimized && self.windows.contains(handle) {
            self.backend.set_minimized(handle);
        }
    }

    pub fn bring_to_front(&mut self, _handle: WindowHandle) {}

    pub fn set_monitor(&mut self, _handle: WindowHandle, _monitor: MonitorHandle) {}

    // Custom decorations

    pub fn clear_custom_border_data(&mut self, handle: WindowHandle) {
        if let Some(window) = self.windows.get_mut(handle) {
            window.decoration.clear();
        }
    }

    /// Title bar height in logical units, measured from the top.
    pub fn push_custom_title_bar(&mut self, handle: WindowHandle, thickness: f32) {
        if let Some(window) = self.windows.get_mut(handle) {
            window.decoration.title_bar_thickness = thickness;
        }
    }

    /// Resize border width in logical units.
    pub fn push_custom_edges(&mut self, handle: WindowHandle, thickness: f32) {
        if let Some(window) = self.windows.get_mut(handle) {
            window.decoration.edge_thickness = thickness;
        }
    }

    /// Title bar region, in device pixels, that must not start a window drag.
    pub fn push_custom_title_bar_client_area(&mut self, handle: WindowHandle, rect: Rect) {
        if let Some(window) = self.windows.get_mut(handle) {
            window.decoration.push_client_area(rect);
        }
    }

    // Geometry

    pub fn rect_from_window(&self, handle: WindowHandle) -> Rect {
        self.windows.get(handle).map(Window::rect).unwrap_or_default()
    }

    pub fn client_rect_from_window(&self, handle: WindowHandle) -> Rect {
        self.rect_from_window(handle)
    }

    pub fn dpi_from_window(&self, _handle: WindowHandle) -> f32 {
        DEFAULT_DPI
    }

    /// Last pointer position over the window, in device pixels.
    pub fn mouse_from_window(&self, handle: WindowHandle) -> Vec2 {
        self.windows
            .get(handle)
            .map(|w| Vec2::new(w.mouse_x as f32, w.mouse_y as f32))
            .unwrap_or_default()
    }

    /// Hand the renderer's surface to the window so configures resize it.
    pub fn attach_render_target(&mut self, handle: WindowHandle, target: Box<dyn RenderTarget>) {
        if let Some(window) = self.windows.get_mut(handle) {
            window.render_target = Some(target);
            window.resize_render_target();
        }
    }

    /// Native surface for renderer setup. `None` on the headless backend.
    pub fn wl_surface(&self, handle: WindowHandle) -> Option<WlSurface> {
        if !self.windows.contains(handle) {
            return None;
        }
        self.backend.wl_surface(handle)
    }

    /// Display connection for renderers that create their own buffers.
    /// `None` on the headless backend.
    pub fn wayland_connection(&self) -> Option<Connection> {
        self.backend.connection()
    }

    /// Shared memory global for software rendering
    pub fn wl_shm(&self) -> Option<WlShm> {
        self.backend.wl_shm()
    }

    // Monitors and external windows

    pub fn monitors(&self) -> Vec<MonitorHandle> {
        Vec::new()
    }

    pub fn primary_monitor(&self) -> MonitorHandle {
        MonitorHandle::NULL
    }

    pub fn monitor_from_window(&self, _handle: WindowHandle) -> MonitorHandle {
        MonitorHandle::NULL
    }

    pub fn name_from_monitor(&self, _monitor: MonitorHandle) -> String {
        String::new()
    }

    pub fn dim_from_monitor(&self, _monitor: MonitorHandle) -> Vec2 {
        Vec2::ZERO
    }

    pub fn dpi_from_monitor(&self, _monitor: MonitorHandle) -> f32 {
        DEFAULT_DPI
    }

    pub fn focused_external_window(&self) -> WindowHandle {
        WindowHandle::NULL
    }

    pub fn focus_external_window(&mut self, _handle: WindowHandle) {}

    // Events

    pub fn send_wakeup_event(&self) {}

    /// Pump the protocol queue and return every event produced since the
    /// last call, in order.
    ///
    /// With `wait` the call blocks until the compositor sends something,
    /// unless events are already pending.
    pub fn get_events(&mut self, wait: bool) -> anyhow::Result<EventList> {
        let wait = wait && self.pending.is_empty();
        let events = self.backend.dispatch(wait)?;
        self.handle_protocol_events(events);
        Ok(self.pending.take())
    }

    pub fn modifiers(&self) -> Modifiers {
        self.keyboard.modifiers()
    }

    /// Key or mouse button currently held down
    pub fn key_is_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    // Cursor

    /// Show `cursor` over our windows. Ignored while a resize border is hovered.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        let Some(name) = self.cursor.request(cursor) else {
            return;
        };
        let Some(window) = self.windows.get(self.pointer_focus) else {
            return;
        };
        let scale = window.scale;
        self.backend.set_cursor(name, self.pointer_serial, scale);
    }

    // Desktop integration

    pub fn graphical_message(&self, error: bool, title: &str, message: &str) {
        let prefix = if error { "[X] " } else { "" };
        eprintln!("{}{}\n{}\n", prefix, title, message);
    }

    /// Show the portal file dialog and keep pumping window events until the
    /// user picks a file or dismisses it.
    ///
    /// Returns `None` on cancel or when the portal is unavailable.
    pub fn pick_file(&mut self, initial: Option<&Path>) -> Option<PathBuf> {
        #[cfg(feature = "portal")]
        {
            match dbus::open_file(initial) {
                Ok(pending) => self.wait_for_file_pick(pending),
                Err(e) => {
                    warn!("File dialog unavailable: {:#}", e);
                    None
                }
            }
        }
        #[cfg(not(feature = "portal"))]
        {
            let _ = initial;
            warn!("File dialog unavailable: built without the portal feature");
            None
        }
    }

    /// Dispatch protocol events until `pending` completes.
    pub fn wait_for_file_pick(&mut self, mut pending: dbus::PendingFilePick) -> Option<PathBuf> {
        loop {
            if let Some(result) = pending.try_take() {
                debug!("File pick finished: {:?}", result);
                return result;
            }
            match self.backend.dispatch_until_readable(pending.wakeup_fd()) {
                Ok(events) => self.handle_protocol_events(events),
                Err(e) => {
                    warn!("Lost display connection during file pick: {:#}", e);
                    pending.cancel();
                    return None;
                }
            }
        }
    }

    /// Reveal `path` in the file manager.
    pub fn show_in_file_manager(&self, path: &Path) {
        #[cfg(feature = "portal")]
        dbus::show_in_file_manager(path);
        #[cfg(not(feature = "portal"))]
        warn!(
            "Cannot show {} in file manager: built without the portal feature",
            path.display()
        );
    }

    pub fn open_in_browser(&self, url: &str) {
        if let Err(e) = dbus::open_in_browser(url) {
            warn!("{:#}", e);
        }
    }
}
