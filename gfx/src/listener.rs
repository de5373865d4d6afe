//! Protocol listener bank
//!
//! Backends decode native protocol traffic into [`ProtocolEvent`]s. The
//! session runs each one through [`Session::handle_protocol_event`] in arrival
//! order, which updates window, focus, keyboard and cursor state, issues any
//! follow-up requests and appends application [`Event`]s.

use tracing::{debug, trace, warn};

use crate::decoration::{self, Hit, ResizeEdge};
use crate::event::{Event, EventKind};
use crate::input::{codes, key_from_button, key_from_keycode, Key};
use crate::utils::{scale_from_fractional, to_logical, Vec2};
use crate::window::WindowHandle;
use crate::Session;

/// Scroll axis reported by `wl_pointer.axis`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// Decoded protocol message
///
/// Surface coordinates are surface-local logical units as sent by the
/// compositor. Window handles identify the surface the message refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum ProtocolEvent {
    /// `xdg_wm_base.ping`
    Ping { serial: u32 },
    /// `wl_seat.capabilities`
    SeatCapabilities { pointer: bool, keyboard: bool },
    PointerEnter {
        window: WindowHandle,
        serial: u32,
        x: f64,
        y: f64,
    },
    PointerLeave { window: WindowHandle },
    PointerMotion { time: u32, x: f64, y: f64 },
    PointerButton {
        serial: u32,
        time: u32,
        button: u32,
        pressed: bool,
    },
    PointerAxis { time: u32, axis: Axis, value: f64 },
    /// XKB v1 text keymap read from the shared fd
    Keymap { text: String },
    KeyboardEnter { window: WindowHandle },
    KeyboardLeave { window: WindowHandle },
    Key {
        serial: u32,
        time: u32,
        key: u32,
        pressed: bool,
    },
    Modifiers {
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    },
    /// `xdg_surface.configure`
    SurfaceConfigure { window: WindowHandle, serial: u32 },
    /// `xdg_toplevel.configure`
    ToplevelConfigure {
        window: WindowHandle,
        width: i32,
        height: i32,
        maximized: bool,
        fullscreen: bool,
        activated: bool,
    },
    /// `xdg_toplevel.close`
    ToplevelClose { window: WindowHandle },
    /// `wp_fractional_scale_v1.preferred_scale`, in 1/120 units
    PreferredScale { window: WindowHandle, scale: u32 },
}

/// Window request resulting from a pointer button
enum ButtonAction {
    ToggleMaximize(bool),
    Resize(ResizeEdge),
    Move,
    WindowMenu(i32, i32),
}

impl Session {
    pub(crate) fn handle_protocol_events(&mut self, events: Vec<ProtocolEvent>) {
        for event in events {
            self.handle_protocol_event(event);
        }
    }

    /// Apply one protocol message.
    pub fn handle_protocol_event(&mut self, event: ProtocolEvent) {
        trace!("protocol event: {:?}", event);
        match event {
            ProtocolEvent::Ping { serial } => self.backend.pong(serial),
            ProtocolEvent::SeatCapabilities { pointer, keyboard } => {
                self.on_seat_capabilities(pointer, keyboard)
            }
            ProtocolEvent::PointerEnter {
                window,
                serial,
                x,
                y,
            } => self.on_pointer_enter(window, serial, x, y),
            ProtocolEvent::PointerLeave { window } => self.on_pointer_leave(window),
            ProtocolEvent::PointerMotion { x, y, .. } => self.on_pointer_motion(x, y),
            ProtocolEvent::PointerButton {
                serial,
                time,
                button,
                pressed,
            } => self.on_pointer_button(serial, time, button, pressed),
            ProtocolEvent::PointerAxis { axis, value, .. } => self.on_pointer_axis(axis, value),
            ProtocolEvent::Keymap { text } => {
                if let Err(e) = self.keyboard.set_keymap(&text) {
                    warn!("Ignoring keymap: {:#}", e);
                }
            }
            ProtocolEvent::KeyboardEnter { window } => {
                if self.windows.contains(window) {
                    self.keyboard_focus = window;
                }
            }
            ProtocolEvent::KeyboardLeave { window } => {
                if self.keyboard_focus == window {
                    self.keyboard_focus = WindowHandle::NULL;
                }
                // Keys held while focus moves away never report a release
                self.keys_down.clear();
            }
            ProtocolEvent::Key { key, pressed, .. } => self.on_key(key, pressed),
            ProtocolEvent::Modifiers {
                depressed,
                latched,
                locked,
                group,
            } => self
                .keyboard
                .update_modifiers(depressed, latched, locked, group),
            ProtocolEvent::SurfaceConfigure { window, serial } => {
                self.on_surface_configure(window, serial)
            }
            ProtocolEvent::ToplevelConfigure {
                window,
                width,
                height,
                maximized,
                fullscreen,
                activated,
            } => {
                let Some(w) = self.windows.get_mut(window) else {
                    return;
                };
                w.maximized = maximized;
                w.fullscreen = fullscreen;
                w.activated = activated;
                w.apply_configure_size(width, height);
                w.pending_configure = true;
                debug!(
                    "Configure {:?}: {}x{} maximized={} fullscreen={} activated={}",
                    window, w.width, w.height, maximized, fullscreen, activated
                );
            }
            ProtocolEvent::ToplevelClose { window } => {
                if self.windows.contains(window) {
                    self.push_event(window, EventKind::WindowClose);
                }
            }
            ProtocolEvent::PreferredScale { window, scale } => {
                self.on_preferred_scale(window, scale)
            }
        }
    }

    /// Append an event with the current modifier snapshot.
    pub(crate) fn push_event(&mut self, window: WindowHandle, kind: EventKind) {
        let modifiers = self.keyboard.modifiers();
        self.pending.push(Event::new(window, modifiers, kind));
    }

    fn on_seat_capabilities(&mut self, pointer: bool, keyboard: bool) {
        if pointer && !self.seat.pointer {
            self.backend.bind_pointer();
            self.seat.pointer = true;
        } else if !pointer && self.seat.pointer {
            self.backend.release_pointer();
            self.seat.pointer = false;
            self.pointer_focus = WindowHandle::NULL;
        }

        if keyboard && !self.seat.keyboard {
            self.backend.bind_keyboard();
            self.seat.keyboard = true;
        } else if !keyboard && self.seat.keyboard {
            self.backend.release_keyboard();
            self.seat.keyboard = false;
            self.keyboard_focus = WindowHandle::NULL;
            self.keys_down.clear();
        }
    }

    fn on_pointer_enter(&mut self, handle: WindowHandle, serial: u32, x: f64, y: f64) {
        let Some(window) = self.windows.get_mut(handle) else {
            return;
        };
        window.mouse_x = x * window.scale;
        window.mouse_y = y * window.scale;
        let scale = window.scale;

        self.pointer_focus = handle;
        self.pointer_serial = serial;

        // The compositor expects a cursor after every enter
        let name = self.cursor.on_enter();
        self.backend.set_cursor(name, serial, scale);
    }

    fn on_pointer_leave(&mut self, handle: WindowHandle) {
        if self.pointer_focus == handle {
            self.pointer_focus = WindowHandle::NULL;
        }
    }

    fn on_pointer_motion(&mut self, x: f64, y: f64) {
        let handle = self.pointer_focus;
        let Some(window) = self.windows.get_mut(handle) else {
            return;
        };
        window.mouse_x = x * window.scale;
        window.mouse_y = y * window.scale;
        let pos = Vec2::new(window.mouse_x as f32, window.mouse_y as f32);
        let scale = window.scale;
        let edge = decoration::resize_edge(window);

        self.push_event(handle, EventKind::Move { pos });

        if let Some(name) = self.cursor.update_edge(edge) {
            self.backend.set_cursor(name, self.pointer_serial, scale);
        }
    }

    fn on_pointer_button(&mut self, serial: u32, time: u32, button: u32, pressed: bool) {
        let handle = self.pointer_focus;
        let double_click_ms = self.config.double_click_ms;
        let Some(window) = self.windows.get_mut(handle) else {
            return;
        };
        let (mouse_x, mouse_y) = (window.mouse_x, window.mouse_y);

        let mut action = None;
        if button == codes::BTN_LEFT {
            if pressed {
                let double_click = window.last_click_time.is_some_and(|last| {
                    time.wrapping_sub(last) < double_click_ms
                        && mouse_x as i32 == window.last_click_x as i32
                        && mouse_y as i32 == window.last_click_y as i32
                });

                action = if double_click && decoration::in_drag_region(window) {
                    Some(ButtonAction::ToggleMaximize(!window.maximized))
                } else {
                    match decoration::hit_test(window) {
                        Hit::Resize(edge) => Some(ButtonAction::Resize(edge)),
                        Hit::Drag => Some(ButtonAction::Move),
                        Hit::Client => None,
                    }
                };
            }
            window.last_click_time = Some(time);
            window.last_click_x = mouse_x;
            window.last_click_y = mouse_y;
        } else if button == codes::BTN_RIGHT && pressed && decoration::in_title_bar(window) {
            action = Some(ButtonAction::WindowMenu(
                to_logical(window.scale, mouse_x) as i32,
                to_logical(window.scale, mouse_y) as i32,
            ));
        }

        if let Some(key) = key_from_button(button) {
            let pos = Vec2::new(mouse_x as f32, mouse_y as f32);
            let kind = if pressed {
                self.keys_down.insert(key);
                EventKind::Press { key, pos }
            } else {
                self.keys_down.remove(&key);
                EventKind::Release { key, pos }
            };
            self.push_event(handle, kind);
        }

        match action {
            Some(ButtonAction::ToggleMaximize(maximized)) => {
                debug!("Title bar double click on {:?}", handle);
                self.backend.set_maximized(handle, maximized);
            }
            Some(ButtonAction::Resize(edge)) => {
                self.backend.interactive_resize(handle, serial, edge);
            }
            Some(ButtonAction::Move) => self.backend.interactive_move(handle, serial),
            Some(ButtonAction::WindowMenu(x, y)) => {
                self.backend.show_window_menu(handle, serial, x, y);
            }
            None => {}
        }
    }

    fn on_pointer_axis(&mut self, axis: Axis, value: f64) {
        let handle = self.pointer_focus;
        let Some(window) = self.windows.get(handle) else {
            return;
        };
        let pos = Vec2::new(window.mouse_x as f32, window.mouse_y as f32);
        let lines = (value / f64::from(self.config.scroll_divisor)) as f32;
        let delta = match axis {
            Axis::Vertical => Vec2::new(0.0, lines),
            Axis::Horizontal => Vec2::new(lines, 0.0),
        };
        self.push_event(handle, EventKind::Scroll { delta, pos });
    }

    /// Window that receives keyboard events
    fn keyboard_target(&self) -> WindowHandle {
        if self.windows.contains(self.keyboard_focus) {
            self.keyboard_focus
        } else if self.windows.contains(self.pointer_focus) {
            self.pointer_focus
        } else {
            WindowHandle::NULL
        }
    }

    fn on_key(&mut self, code: u32, pressed: bool) {
        let target = self.keyboard_target();
        let key = key_from_keycode(code);
        let pos = self
            .windows
            .get(target)
            .map(|w| Vec2::new(w.mouse_x as f32, w.mouse_y as f32))
            .unwrap_or_default();

        if pressed {
            if key != Key::Null {
                self.keys_down.insert(key);
            }
            self.push_event(target, EventKind::Press { key, pos });
            for character in self.keyboard.text_for_key(code) {
                self.push_event(target, EventKind::Text { character });
            }
        } else {
            self.keys_down.remove(&key);
            self.push_event(target, EventKind::Release { key, pos });
        }
    }

    fn on_surface_configure(&mut self, handle: WindowHandle, serial: u32) {
        let Some(window) = self.windows.get_mut(handle) else {
            return;
        };
        self.backend.ack_configure(handle, serial);

        if !window.pending_configure {
            return;
        }
        window.pending_configure = false;
        let (width, height) = (window.width, window.height);
        window.resize_render_target();

        self.backend.set_viewport_destination(handle, width, height);
        self.backend.commit(handle);
    }

    fn on_preferred_scale(&mut self, handle: WindowHandle, value: u32) {
        let scale = scale_from_fractional(value);
        if scale <= 0.0 {
            warn!("Ignoring preferred scale {} for {:?}", value, handle);
            return;
        }
        let Some(window) = self.windows.get_mut(handle) else {
            return;
        };
        let changed = window.scale != scale;
        window.scale = scale;
        if !changed {
            return;
        }
        debug!("Scale of {:?} is now {}", handle, scale);
        window.resize_render_target();

        if self.cursor_scale != scale {
            self.cursor_scale = scale;
            self.backend.reload_cursor_theme(self.config.cursor_size, scale);
        }
        if self.pointer_focus == handle {
            let name = self.cursor.reapply();
            self.backend.set_cursor(name, self.pointer_serial, scale);
        }
    }
}
