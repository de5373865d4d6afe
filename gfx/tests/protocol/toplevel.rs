//! XDG toplevel tests
//!
//! Tests for the configure handshake, window state, close requests and
//! fractional scale changes.

use std::cell::RefCell;
use std::rc::Rc;

use wlos_core::backend::Request;
use wlos_core::listener::ProtocolEvent;
use wlos_core::testing::Fixture;
use wlos_core::{EventKind, Rect, RenderTarget, WindowHandle};

#[derive(Clone, Default)]
struct RecordingTarget(Rc<RefCell<Vec<(i32, i32)>>>);

impl RenderTarget for RecordingTarget {
    fn resize(&mut self, width: i32, height: i32) {
        self.0.borrow_mut().push((width, height));
    }
}

fn opened() -> (Fixture, WindowHandle) {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("toplevel");
    fixture.take_requests();
    (fixture, handle)
}

#[test]
fn test_configure_keeps_unset_dimension() {
    let (mut fixture, handle) = opened();
    let serial = fixture.configure(handle, 800, 0, false, false);
    fixture.dispatch();

    let window = fixture.window(handle);
    assert_eq!((window.width, window.height), (800, 720));
    assert_eq!(
        fixture.take_requests(),
        vec![
            Request::AckConfigure {
                window: handle,
                serial
            },
            Request::SetViewportDestination {
                window: handle,
                width: 800,
                height: 720
            },
            Request::Commit { window: handle },
        ]
    );
}

#[test]
fn test_surface_configure_alone_only_acks() {
    let (mut fixture, handle) = opened();
    fixture.inject(ProtocolEvent::SurfaceConfigure {
        window: handle,
        serial: 42,
    });
    fixture.dispatch();

    assert_eq!(
        fixture.take_requests(),
        vec![Request::AckConfigure {
            window: handle,
            serial: 42
        }]
    );
}

#[test]
fn test_configure_resizes_render_target() {
    let (mut fixture, handle) = opened();
    let target = RecordingTarget::default();
    fixture
        .session_mut()
        .attach_render_target(handle, Box::new(target.clone()));
    fixture.configure(handle, 1024, 768, false, false);
    fixture.dispatch();

    assert_eq!(*target.0.borrow(), vec![(1280, 720), (1024, 768)]);
}

#[test]
fn test_configure_state_flags() {
    let (mut fixture, handle) = opened();
    fixture.configure(handle, 1920, 1080, true, false);
    fixture.dispatch();
    assert!(fixture.session().is_maximized(handle));
    assert!(!fixture.session().is_fullscreen(handle));

    fixture.configure(handle, 1920, 1080, false, true);
    fixture.dispatch();
    assert!(!fixture.session().is_maximized(handle));
    assert!(fixture.session().is_fullscreen(handle));
    assert!(!fixture.session().is_minimized(handle));
}

#[test]
fn test_set_fullscreen_round_trip() {
    let (mut fixture, handle) = opened();
    fixture.session_mut().set_fullscreen(handle, true);
    assert_eq!(
        fixture.requests()[0],
        Request::SetFullscreen {
            window: handle,
            fullscreen: true
        }
    );

    fixture.dispatch();
    assert!(fixture.session().is_fullscreen(handle));
}

#[test]
fn test_set_maximized_waits_for_configure() {
    let (mut fixture, handle) = opened();
    fixture.session_mut().set_maximized(handle, true);
    assert!(fixture.session().is_maximized(handle));

    fixture.session_mut().set_maximized(handle, false);
    assert!(!fixture.session().is_maximized(handle));
}

#[test]
fn test_minimize_is_one_way() {
    let (mut fixture, handle) = opened();
    fixture.session_mut().set_minimized(handle, false);
    assert!(fixture.requests().is_empty());

    fixture.session_mut().set_minimized(handle, true);
    assert_eq!(
        fixture.requests(),
        &[Request::SetMinimized { window: handle }]
    );
    assert!(!fixture.session().is_minimized(handle));
}

#[test]
fn test_set_title() {
    let (mut fixture, handle) = opened();
    fixture.session_mut().set_title(handle, "renamed");

    assert_eq!(fixture.window(handle).title, "renamed");
    assert_eq!(
        fixture.requests(),
        &[Request::SetTitle {
            window: handle,
            title: "renamed".into()
        }]
    );
}

#[test]
fn test_first_paint_commits() {
    let (mut fixture, handle) = opened();
    fixture.session_mut().first_paint(handle);
    assert_eq!(fixture.requests(), &[Request::Commit { window: handle }]);
}

#[test]
fn test_close_request_becomes_event() {
    let (mut fixture, handle) = opened();
    fixture.close_request(handle);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 1);
    assert_eq!(events.as_slice()[0].window, handle);
    assert_eq!(events.as_slice()[0].kind, EventKind::WindowClose);

    // The window stays open until the application closes it
    assert!(fixture.session().window(handle).is_some());
}

#[test]
fn test_ping_is_answered() {
    let (mut fixture, _) = opened();
    fixture.inject(ProtocolEvent::Ping { serial: 7 });
    fixture.dispatch();

    assert_eq!(fixture.requests(), &[Request::Pong { serial: 7 }]);
}

#[test]
fn test_fractional_scale_rect() {
    let (mut fixture, handle) = opened();
    fixture.configure(handle, 1280, 720, false, false);
    fixture.preferred_scale(handle, 150);
    fixture.dispatch();

    assert_eq!(fixture.window(handle).scale, 1.25);
    assert_eq!(
        fixture.session().rect_from_window(handle),
        Rect::new(0.0, 0.0, 1600.0, 900.0)
    );
}

#[test]
fn test_scale_change_resizes_render_target() {
    let (mut fixture, handle) = opened();
    let target = RecordingTarget::default();
    fixture
        .session_mut()
        .attach_render_target(handle, Box::new(target.clone()));
    fixture.preferred_scale(handle, 240);
    // Same scale again is not a change
    fixture.preferred_scale(handle, 240);
    fixture.dispatch();

    assert_eq!(*target.0.borrow(), vec![(1280, 720), (2560, 1440)]);
}

#[test]
fn test_cursor_theme_reloaded_once_per_scale() {
    let mut fixture = Fixture::new();
    let a = fixture.open_window("a");
    let b = fixture.open_window("b");
    fixture.take_requests();

    fixture.preferred_scale(a, 240);
    fixture.preferred_scale(b, 240);
    fixture.dispatch();

    let reloads: Vec<Request> = fixture
        .take_requests()
        .into_iter()
        .filter(|r| matches!(r, Request::ReloadCursorTheme { .. }))
        .collect();
    assert_eq!(
        reloads,
        vec![Request::ReloadCursorTheme {
            size: 24,
            scale: 2.0
        }]
    );
}

#[test]
fn test_scale_change_reapplies_cursor_under_pointer() {
    let (mut fixture, handle) = opened();
    fixture.pointer_enter(handle, 10.0, 10.0);
    fixture.dispatch();
    fixture.take_requests();

    fixture.preferred_scale(handle, 180);
    fixture.dispatch();
    assert_eq!(
        fixture.take_requests(),
        vec![
            Request::ReloadCursorTheme {
                size: 24,
                scale: 1.5
            },
            Request::SetCursor {
                name: "left_ptr",
                serial: 1,
                scale: 1.5
            },
        ]
    );
}

#[test]
fn test_zero_scale_is_ignored() {
    let (mut fixture, handle) = opened();
    fixture.preferred_scale(handle, 0);
    fixture.dispatch();

    assert_eq!(fixture.window(handle).scale, 1.0);
    assert!(fixture.requests().is_empty());
}
