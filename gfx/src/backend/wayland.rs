//! Wayland backend
//!
//! Owns the display connection, the bound globals and the native objects of
//! every window. Protocol events are collected into an [`Inbox`] while the
//! queue is dispatched and handed back as [`ProtocolEvent`]s; nothing here
//! touches session state.

use std::collections::HashMap;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::FileExt;

use anyhow::Context;
use tracing::{debug, info, warn};
use wayland_client::{
    backend::WaylandError,
    delegate_noop,
    globals::{registry_queue_init, GlobalListContents},
    protocol::{
        wl_buffer::WlBuffer, wl_compositor, wl_keyboard, wl_pointer, wl_registry, wl_seat, wl_shm,
        wl_surface,
    },
    Connection, Dispatch, EventQueue, Proxy, QueueHandle, WEnum,
};
use wayland_cursor::CursorTheme;
use wayland_protocols::wp::fractional_scale::v1::client::{
    wp_fractional_scale_manager_v1, wp_fractional_scale_v1,
};
use wayland_protocols::wp::viewporter::client::{wp_viewport, wp_viewporter};
use wayland_protocols::xdg::shell::client::{xdg_surface, xdg_toplevel, xdg_wm_base};

use crate::config::GfxConfig;
use crate::decoration::ResizeEdge;
use crate::listener::{Axis, ProtocolEvent};
use crate::window::WindowHandle;

/// Dispatch state: protocol events decoded since the last drain
#[derive(Default)]
pub struct Inbox {
    events: Vec<ProtocolEvent>,
}

impl Inbox {
    fn push(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    fn take(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Protocol objects backing one window
struct NativeWindow {
    surface: wl_surface::WlSurface,
    viewport: Option<wp_viewport::WpViewport>,
    fractional: Option<wp_fractional_scale_v1::WpFractionalScaleV1>,
    xdg_surface: xdg_surface::XdgSurface,
    toplevel: xdg_toplevel::XdgToplevel,
}

impl NativeWindow {
    fn destroy(self) {
        self.toplevel.destroy();
        self.xdg_surface.destroy();
        if let Some(fractional) = self.fractional {
            fractional.destroy();
        }
        if let Some(viewport) = self.viewport {
            viewport.destroy();
        }
        self.surface.destroy();
    }
}

pub struct WaylandBackend {
    conn: Connection,
    queue: EventQueue<Inbox>,
    qh: QueueHandle<Inbox>,
    inbox: Inbox,

    compositor: wl_compositor::WlCompositor,
    shm: wl_shm::WlShm,
    wm_base: xdg_wm_base::XdgWmBase,
    seat: wl_seat::WlSeat,
    fractional_manager: Option<wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1>,
    viewporter: Option<wp_viewporter::WpViewporter>,

    pointer: Option<wl_pointer::WlPointer>,
    keyboard: Option<wl_keyboard::WlKeyboard>,

    cursor_surface: wl_surface::WlSurface,
    cursor_viewport: Option<wp_viewport::WpViewport>,
    cursor_theme: Option<CursorTheme>,
    cursor_theme_name: String,

    windows: HashMap<WindowHandle, NativeWindow>,
}

impl WaylandBackend {
    /// Connect to `$WAYLAND_DISPLAY` and bind the globals.
    pub fn connect(config: &GfxConfig) -> anyhow::Result<Self> {
        let conn = Connection::connect_to_env().context("failed to connect to Wayland display")?;
        let (globals, queue) =
            registry_queue_init::<Inbox>(&conn).context("failed to list Wayland globals")?;
        let qh = queue.handle();

        let compositor: wl_compositor::WlCompositor = globals
            .bind(&qh, 1..=4, ())
            .context("wl_compositor not available")?;
        let shm: wl_shm::WlShm = globals.bind(&qh, 1..=1, ()).context("wl_shm not available")?;
        let wm_base: xdg_wm_base::XdgWmBase = globals
            .bind(&qh, 1..=1, ())
            .context("xdg_wm_base not available")?;
        let seat: wl_seat::WlSeat = globals.bind(&qh, 1..=8, ()).context("wl_seat not available")?;

        let fractional_manager: Option<wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1> =
            globals.bind(&qh, 1..=1, ()).ok();
        let viewporter: Option<wp_viewporter::WpViewporter> = globals.bind(&qh, 1..=1, ()).ok();
        if fractional_manager.is_none() || viewporter.is_none() {
            info!(
                "Fractional scaling unavailable (fractional_scale={}, viewporter={})",
                fractional_manager.is_some(),
                viewporter.is_some()
            );
        }

        let cursor_surface = compositor.create_surface(&qh, WindowHandle::NULL);
        let cursor_viewport = viewporter
            .as_ref()
            .map(|v| v.get_viewport(&cursor_surface, &qh, ()));

        let mut backend = Self {
            conn,
            queue,
            qh,
            inbox: Inbox::default(),
            compositor,
            shm,
            wm_base,
            seat,
            fractional_manager,
            viewporter,
            pointer: None,
            keyboard: None,
            cursor_surface,
            cursor_viewport,
            cursor_theme: None,
            cursor_theme_name: config.cursor_theme.clone(),
            windows: HashMap::new(),
        };
        backend.reload_cursor_theme(config.cursor_size, 1.0);

        info!("Connected to Wayland display");
        Ok(backend)
    }

    pub fn dispatch(&mut self, wait: bool) -> anyhow::Result<Vec<ProtocolEvent>> {
        if wait {
            self.queue
                .blocking_dispatch(&mut self.inbox)
                .context("Wayland dispatch failed")?;
        } else {
            self.queue.flush().context("Wayland flush failed")?;
            if let Some(guard) = self.queue.prepare_read() {
                read_nonblocking(guard)?;
            }
            self.queue
                .dispatch_pending(&mut self.inbox)
                .context("Wayland dispatch failed")?;
        }
        Ok(self.inbox.take())
    }

    pub fn roundtrip(&mut self) -> anyhow::Result<Vec<ProtocolEvent>> {
        self.queue
            .roundtrip(&mut self.inbox)
            .context("Wayland roundtrip failed")?;
        Ok(self.inbox.take())
    }

    /// Poll the display socket together with `wakeup`.
    pub fn dispatch_until_readable(
        &mut self,
        wakeup: BorrowedFd<'_>,
    ) -> anyhow::Result<Vec<ProtocolEvent>> {
        self.queue.flush().context("Wayland flush failed")?;

        // Events already queued locally: no need to wait
        if let Some(guard) = self.queue.prepare_read() {
            let mut fds = [
                libc::pollfd {
                    fd: guard.connection_fd().as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: wakeup.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];
            loop {
                // SAFETY: fds is a valid array of two pollfds for the duration of the call
                let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
                if ret >= 0 {
                    break;
                }
                let err = std::io::Error::last_os_error();
                if err.kind() != std::io::ErrorKind::Interrupted {
                    return Err(err).context("poll failed");
                }
            }

            if fds[0].revents != 0 {
                read_nonblocking(guard)?;
            }
        }

        self.queue
            .dispatch_pending(&mut self.inbox)
            .context("Wayland dispatch failed")?;
        Ok(self.inbox.take())
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.conn.flush() {
            warn!("Wayland flush failed: {}", e);
        }
    }

    pub fn create_window(&mut self, handle: WindowHandle, title: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.windows.contains_key(&handle),
            "window {:?} already has a surface",
            handle
        );

        let surface = self.compositor.create_surface(&self.qh, handle);
        let viewport = self
            .viewporter
            .as_ref()
            .map(|v| v.get_viewport(&surface, &self.qh, ()));
        let fractional = self
            .fractional_manager
            .as_ref()
            .map(|m| m.get_fractional_scale(&surface, &self.qh, handle));
        let xdg_surface = self.wm_base.get_xdg_surface(&surface, &self.qh, handle);
        let toplevel = xdg_surface.get_toplevel(&self.qh, handle);
        toplevel.set_title(title.to_string());
        surface.commit();

        self.windows.insert(
            handle,
            NativeWindow {
                surface,
                viewport,
                fractional,
                xdg_surface,
                toplevel,
            },
        );
        self.flush();
        debug!("Created surface for {:?}", handle);
        Ok(())
    }

    pub fn destroy_window(&mut self, handle: WindowHandle) {
        if let Some(window) = self.windows.remove(&handle) {
            window.destroy();
            self.flush();
            debug!("Destroyed surface for {:?}", handle);
        }
    }

    pub fn set_title(&mut self, handle: WindowHandle, title: &str) {
        if let Some(window) = self.windows.get(&handle) {
            window.toplevel.set_title(title.to_string());
        }
    }

    pub fn commit(&mut self, handle: WindowHandle) {
        if let Some(window) = self.windows.get(&handle) {
            window.surface.commit();
        }
    }

    pub fn set_maximized(&mut self, handle: WindowHandle, maximized: bool) {
        if let Some(window) = self.windows.get(&handle) {
            if maximized {
                window.toplevel.set_maximized();
            } else {
                window.toplevel.unset_maximized();
            }
            self.flush();
        }
    }

    pub fn set_fullscreen(&mut self, handle: WindowHandle, fullscreen: bool) {
        if let Some(window) = self.windows.get(&handle) {
            if fullscreen {
                window.toplevel.set_fullscreen(None);
            } else {
                window.toplevel.unset_fullscreen();
            }
            self.flush();
        }
    }

    pub fn set_minimized(&mut self, handle: WindowHandle) {
        if let Some(window) = self.windows.get(&handle) {
            window.toplevel.set_minimized();
            self.flush();
        }
    }

    pub fn interactive_move(&mut self, handle: WindowHandle, serial: u32) {
        if let Some(window) = self.windows.get(&handle) {
            window.toplevel._move(&self.seat, serial);
            self.flush();
        }
    }

    pub fn interactive_resize(&mut self, handle: WindowHandle, serial: u32, edge: ResizeEdge) {
        let edge = match edge {
            ResizeEdge::None => return,
            ResizeEdge::Top => xdg_toplevel::ResizeEdge::Top,
            ResizeEdge::Bottom => xdg_toplevel::ResizeEdge::Bottom,
            ResizeEdge::Left => xdg_toplevel::ResizeEdge::Left,
            ResizeEdge::Right => xdg_toplevel::ResizeEdge::Right,
            ResizeEdge::TopLeft => xdg_toplevel::ResizeEdge::TopLeft,
            ResizeEdge::TopRight => xdg_toplevel::ResizeEdge::TopRight,
            ResizeEdge::BottomLeft => xdg_toplevel::ResizeEdge::BottomLeft,
            ResizeEdge::BottomRight => xdg_toplevel::ResizeEdge::BottomRight,
        };
        if let Some(window) = self.windows.get(&handle) {
            window.toplevel.resize(&self.seat, serial, edge);
            self.flush();
        }
    }

    pub fn show_window_menu(&mut self, handle: WindowHandle, serial: u32, x: i32, y: i32) {
        if let Some(window) = self.windows.get(&handle) {
            window.toplevel.show_window_menu(&self.seat, serial, x, y);
            self.flush();
        }
    }

    pub fn ack_configure(&mut self, handle: WindowHandle, serial: u32) {
        if let Some(window) = self.windows.get(&handle) {
            window.xdg_surface.ack_configure(serial);
        }
    }

    pub fn set_viewport_destination(&mut self, handle: WindowHandle, width: i32, height: i32) {
        if let Some(viewport) = self.windows.get(&handle).and_then(|w| w.viewport.as_ref()) {
            viewport.set_destination(width, height);
        }
    }

    pub fn pong(&mut self, serial: u32) {
        self.wm_base.pong(serial);
        self.flush();
    }

    pub fn bind_pointer(&mut self) {
        if self.pointer.is_none() {
            self.pointer = Some(self.seat.get_pointer(&self.qh, ()));
            debug!("Pointer bound");
        }
    }

    pub fn release_pointer(&mut self) {
        if let Some(pointer) = self.pointer.take() {
            if pointer.version() >= 3 {
                pointer.release();
            }
            debug!("Pointer released");
        }
    }

    pub fn bind_keyboard(&mut self) {
        if self.keyboard.is_none() {
            self.keyboard = Some(self.seat.get_keyboard(&self.qh, ()));
            debug!("Keyboard bound");
        }
    }

    pub fn release_keyboard(&mut self) {
        if let Some(keyboard) = self.keyboard.take() {
            if keyboard.version() >= 3 {
                keyboard.release();
            }
            debug!("Keyboard released");
        }
    }

    pub fn set_cursor(&mut self, name: &'static str, serial: u32, scale: f64) {
        let (Some(pointer), Some(theme)) = (self.pointer.as_ref(), self.cursor_theme.as_mut())
        else {
            return;
        };

        let name = if theme.get_cursor(name).is_some() {
            name
        } else {
            warn!("Cursor {} missing from theme, using left_ptr", name);
            "left_ptr"
        };
        let Some(cursor) = theme.get_cursor(name) else {
            return;
        };

        let image = &cursor[0];
        let (hotspot_x, hotspot_y) = image.hotspot();
        let (width, height) = image.dimensions();
        let buffer: &WlBuffer = image;

        pointer.set_cursor(
            serial,
            Some(&self.cursor_surface),
            (f64::from(hotspot_x) / scale) as i32,
            (f64::from(hotspot_y) / scale) as i32,
        );
        self.cursor_surface.attach(Some(buffer), 0, 0);
        if self.cursor_surface.version() >= 4 {
            self.cursor_surface
                .damage_buffer(0, 0, width as i32, height as i32);
        } else {
            self.cursor_surface.damage(0, 0, width as i32, height as i32);
        }
        self.cursor_surface.commit();
        self.flush();
    }

    /// Load the theme at `size * scale` pixels, presented at `size` logical pixels.
    pub fn reload_cursor_theme(&mut self, size: u32, scale: f64) {
        let pixels = (f64::from(size) * scale).round() as u32;
        match CursorTheme::load_from_name(&self.conn, self.shm.clone(), &self.cursor_theme_name, pixels)
        {
            Ok(theme) => {
                self.cursor_theme = Some(theme);
                if let Some(viewport) = self.cursor_viewport.as_ref() {
                    viewport.set_destination(size as i32, size as i32);
                }
                debug!("Loaded cursor theme {} at {}px", self.cursor_theme_name, pixels);
            }
            Err(e) => warn!("Failed to load cursor theme {}: {}", self.cursor_theme_name, e),
        }
    }

    pub fn wl_surface(&self, handle: WindowHandle) -> Option<wl_surface::WlSurface> {
        self.windows.get(&handle).map(|w| w.surface.clone())
    }

    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    pub fn wl_shm(&self) -> wl_shm::WlShm {
        self.shm.clone()
    }
}

/// Read whatever the socket holds without blocking.
fn read_nonblocking(guard: wayland_client::backend::ReadEventsGuard) -> anyhow::Result<()> {
    match guard.read() {
        Ok(_) => Ok(()),
        Err(WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
        Err(e) => Err(e).context("failed to read Wayland socket"),
    }
}

/// Decode the `xdg_toplevel.configure` state array into
/// `(maximized, fullscreen, activated)`.
fn decode_toplevel_states(states: &[u8]) -> (bool, bool, bool) {
    let mut maximized = false;
    let mut fullscreen = false;
    let mut activated = false;
    for chunk in states.chunks_exact(4) {
        let Ok(bytes) = <[u8; 4]>::try_from(chunk) else {
            continue;
        };
        match xdg_toplevel::State::try_from(u32::from_ne_bytes(bytes)) {
            Ok(xdg_toplevel::State::Maximized) => maximized = true,
            Ok(xdg_toplevel::State::Fullscreen) => fullscreen = true,
            Ok(xdg_toplevel::State::Activated) => activated = true,
            _ => {}
        }
    }
    (maximized, fullscreen, activated)
}

/// Read the XKB keymap text from the shared memory fd.
fn read_keymap(fd: OwnedFd, size: u32) -> anyhow::Result<String> {
    let file = std::fs::File::from(fd);
    let mut buf = vec![0u8; size as usize];
    file.read_exact_at(&mut buf, 0)
        .context("failed to read keymap")?;
    let text = String::from_utf8(buf).context("keymap is not UTF-8")?;
    Ok(text.trim_end_matches('\0').to_string())
}

fn window_of(surface: &wl_surface::WlSurface) -> WindowHandle {
    surface.data::<WindowHandle>().copied().unwrap_or_default()
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for Inbox {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Globals added after startup are not used
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &wl_seat::WlSeat,
        event: wl_seat::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(caps),
        } = event
        {
            state.push(ProtocolEvent::SeatCapabilities {
                pointer: caps.contains(wl_seat::Capability::Pointer),
                keyboard: caps.contains(wl_seat::Capability::Keyboard),
            });
        }
    }
}

impl Dispatch<wl_pointer::WlPointer, ()> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &wl_pointer::WlPointer,
        event: wl_pointer::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter {
                serial,
                surface,
                surface_x,
                surface_y,
            } => state.push(ProtocolEvent::PointerEnter {
                window: window_of(&surface),
                serial,
                x: surface_x,
                y: surface_y,
            }),
            wl_pointer::Event::Leave { surface, .. } => state.push(ProtocolEvent::PointerLeave {
                window: window_of(&surface),
            }),
            wl_pointer::Event::Motion {
                time,
                surface_x,
                surface_y,
            } => state.push(ProtocolEvent::PointerMotion {
                time,
                x: surface_x,
                y: surface_y,
            }),
            wl_pointer::Event::Button {
                serial,
                time,
                button,
                state: button_state,
            } => state.push(ProtocolEvent::PointerButton {
                serial,
                time,
                button,
                pressed: matches!(button_state, WEnum::Value(wl_pointer::ButtonState::Pressed)),
            }),
            wl_pointer::Event::Axis {
                time,
                axis: WEnum::Value(axis),
                value,
            } => {
                let axis = match axis {
                    wl_pointer::Axis::VerticalScroll => Axis::Vertical,
                    wl_pointer::Axis::HorizontalScroll => Axis::Horizontal,
                    _ => return,
                };
                state.push(ProtocolEvent::PointerAxis { time, axis, value });
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_keyboard::WlKeyboard, ()> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &wl_keyboard::WlKeyboard,
        event: wl_keyboard::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                if format != WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) {
                    warn!("Unsupported keymap format {:?}", format);
                    return;
                }
                match read_keymap(fd, size) {
                    Ok(text) => state.push(ProtocolEvent::Keymap { text }),
                    Err(e) => warn!("{:#}", e),
                }
            }
            wl_keyboard::Event::Enter { surface, .. } => {
                state.push(ProtocolEvent::KeyboardEnter {
                    window: window_of(&surface),
                })
            }
            wl_keyboard::Event::Leave { surface, .. } => {
                state.push(ProtocolEvent::KeyboardLeave {
                    window: window_of(&surface),
                })
            }
            wl_keyboard::Event::Key {
                serial,
                time,
                key,
                state: key_state,
            } => state.push(ProtocolEvent::Key {
                serial,
                time,
                key,
                pressed: matches!(key_state, WEnum::Value(wl_keyboard::KeyState::Pressed)),
            }),
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => state.push(ProtocolEvent::Modifiers {
                depressed: mods_depressed,
                latched: mods_latched,
                locked: mods_locked,
                group,
            }),
            _ => {}
        }
    }
}

impl Dispatch<wl_surface::WlSurface, WindowHandle> for Inbox {
    fn event(
        _state: &mut Self,
        _proxy: &wl_surface::WlSurface,
        _event: wl_surface::Event,
        _data: &WindowHandle,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Output enter/leave is not tracked; scale comes from fractional-scale
    }
}

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &xdg_wm_base::XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            state.push(ProtocolEvent::Ping { serial });
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, WindowHandle> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &xdg_surface::XdgSurface,
        event: xdg_surface::Event,
        data: &WindowHandle,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            state.push(ProtocolEvent::SurfaceConfigure {
                window: *data,
                serial,
            });
        }
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, WindowHandle> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &xdg_toplevel::XdgToplevel,
        event: xdg_toplevel::Event,
        data: &WindowHandle,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure {
                width,
                height,
                states,
            } => {
                let (maximized, fullscreen, activated) = decode_toplevel_states(&states);
                state.push(ProtocolEvent::ToplevelConfigure {
                    window: *data,
                    width,
                    height,
                    maximized,
                    fullscreen,
                    activated,
                });
            }
            xdg_toplevel::Event::Close => {
                state.push(ProtocolEvent::ToplevelClose { window: *data })
            }
            _ => {}
        }
    }
}

impl Dispatch<wp_fractional_scale_v1::WpFractionalScaleV1, WindowHandle> for Inbox {
    fn event(
        state: &mut Self,
        _proxy: &wp_fractional_scale_v1::WpFractionalScaleV1,
        event: wp_fractional_scale_v1::Event,
        data: &WindowHandle,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wp_fractional_scale_v1::Event::PreferredScale { scale } = event {
            state.push(ProtocolEvent::PreferredScale {
                window: *data,
                scale,
            });
        }
    }
}

delegate_noop!(Inbox: wl_compositor::WlCompositor);
delegate_noop!(Inbox: ignore wl_shm::WlShm);
delegate_noop!(Inbox: wp_viewporter::WpViewporter);
delegate_noop!(Inbox: wp_viewport::WpViewport);
delegate_noop!(Inbox: wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1);
