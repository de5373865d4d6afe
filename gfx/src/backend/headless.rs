//! Headless backend for testing
//!
//! Never touches a display server. Every request is appended to a log that
//! tests assert on, and protocol events are injected through [`HeadlessBackend::inject`].
//! With compositor emulation enabled, window creation and maximize/fullscreen
//! requests are answered with the configure sequence a compositor would send.

use std::collections::{HashMap, VecDeque};
use std::os::fd::{AsRawFd, BorrowedFd};

use tracing::debug;

use crate::decoration::ResizeEdge;
use crate::listener::ProtocolEvent;
use crate::window::WindowHandle;

/// A request the session sent to the backend
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    CreateWindow { window: WindowHandle, title: String },
    DestroyWindow { window: WindowHandle },
    SetTitle { window: WindowHandle, title: String },
    Commit { window: WindowHandle },
    SetMaximized { window: WindowHandle, maximized: bool },
    SetFullscreen { window: WindowHandle, fullscreen: bool },
    SetMinimized { window: WindowHandle },
    Move { window: WindowHandle, serial: u32 },
    Resize {
        window: WindowHandle,
        serial: u32,
        edge: ResizeEdge,
    },
    ShowWindowMenu {
        window: WindowHandle,
        serial: u32,
        x: i32,
        y: i32,
    },
    AckConfigure { window: WindowHandle, serial: u32 },
    SetViewportDestination {
        window: WindowHandle,
        width: i32,
        height: i32,
    },
    Pong { serial: u32 },
    BindPointer,
    ReleasePointer,
    BindKeyboard,
    ReleaseKeyboard,
    SetCursor {
        name: &'static str,
        serial: u32,
        scale: f64,
    },
    ReloadCursorTheme { size: u32, scale: f64 },
}

/// Toplevel state the emulated compositor reports
#[derive(Clone, Copy, Debug, Default)]
struct ToplevelState {
    maximized: bool,
    fullscreen: bool,
}

/// Headless backend state for testing without a compositor
#[derive(Default)]
pub struct HeadlessBackend {
    requests: Vec<Request>,
    incoming: VecDeque<ProtocolEvent>,
    emulate_compositor: bool,
    toplevels: HashMap<WindowHandle, ToplevelState>,
    next_serial: u32,
}

impl HeadlessBackend {
    /// Backend that only records requests
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that also answers window requests with configure events
    pub fn with_compositor() -> Self {
        Self {
            emulate_compositor: true,
            ..Self::default()
        }
    }

    /// Queue a protocol event for the next dispatch.
    pub fn inject(&mut self, event: ProtocolEvent) {
        self.incoming.push_back(event);
    }

    /// Every request recorded so far
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Drain the request log.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    pub(crate) fn record(&mut self, request: Request) {
        debug!("headless request: {:?}", request);
        self.requests.push(request);
    }

    /// Hand out everything queued. Never blocks.
    pub(crate) fn dispatch(&mut self) -> Vec<ProtocolEvent> {
        self.incoming.drain(..).collect()
    }

    /// Queued events if there are any, otherwise block on the wakeup fd.
    pub(crate) fn dispatch_until_readable(
        &mut self,
        wakeup: BorrowedFd<'_>,
    ) -> anyhow::Result<Vec<ProtocolEvent>> {
        if self.incoming.is_empty() {
            let mut fds = [libc::pollfd {
                fd: wakeup.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            }];
            loop {
                // SAFETY: fds is a valid array of one pollfd for the duration of the call
                let ret = unsafe { libc::poll(fds.as_mut_ptr(), 1, -1) };
                if ret >= 0 {
                    break;
                }
                let err = std::io::Error::last_os_error();
                if err.kind() != std::io::ErrorKind::Interrupted {
                    return Err(err.into());
                }
            }
        }
        Ok(self.dispatch())
    }

    fn next_serial(&mut self) -> u32 {
        self.next_serial = self.next_serial.wrapping_add(1);
        self.next_serial
    }

    fn send_configure(&mut self, window: WindowHandle) {
        if !self.emulate_compositor {
            return;
        }
        let state = self.toplevels.get(&window).copied().unwrap_or_default();
        let serial = self.next_serial();
        self.incoming.push_back(ProtocolEvent::ToplevelConfigure {
            window,
            width: 0,
            height: 0,
            maximized: state.maximized,
            fullscreen: state.fullscreen,
            activated: true,
        });
        self.incoming
            .push_back(ProtocolEvent::SurfaceConfigure { window, serial });
    }

    pub(crate) fn create_window(&mut self, window: WindowHandle, title: &str) {
        self.record(Request::CreateWindow {
            window,
            title: title.to_string(),
        });
        self.toplevels.insert(window, ToplevelState::default());
        self.send_configure(window);
    }

    pub(crate) fn destroy_window(&mut self, window: WindowHandle) {
        self.record(Request::DestroyWindow { window });
        self.toplevels.remove(&window);
        self.incoming.retain(|event| match event {
            ProtocolEvent::SurfaceConfigure { window: w, .. }
            | ProtocolEvent::ToplevelConfigure { window: w, .. } => *w != window,
            _ => true,
        });
    }

    pub(crate) fn set_maximized(&mut self, window: WindowHandle, maximized: bool) {
        self.record(Request::SetMaximized { window, maximized });
        if let Some(state) = self.toplevels.get_mut(&window) {
            state.maximized = maximized;
            self.send_configure(window);
        }
    }

    pub(crate) fn set_fullscreen(&mut self, window: WindowHandle, fullscreen: bool) {
        self.record(Request::SetFullscreen { window, fullscreen });
        if let Some(state) = self.toplevels.get_mut(&window) {
            state.fullscreen = fullscreen;
            self.send_configure(window);
        }
    }
}
