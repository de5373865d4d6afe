//! Window handle lifecycle tests
//!
//! Null and stale handles must behave like no window at all: every query
//! returns its default and every operation does nothing.

use wlos_core::backend::Request;
use wlos_core::testing::Fixture;
use wlos_core::{Cursor, Rect, Vec2, WindowHandle};

fn assert_inert(fixture: &mut Fixture, handle: WindowHandle) {
    let before = fixture.requests().len();
    let session = fixture.session_mut();

    session.set_title(handle, "ignored");
    session.first_paint(handle);
    session.set_maximized(handle, true);
    session.set_fullscreen(handle, true);
    session.set_minimized(handle, true);
    session.push_custom_title_bar(handle, 30.0);
    session.push_custom_edges(handle, 5.0);
    session.push_custom_title_bar_client_area(handle, Rect::new(0.0, 0.0, 10.0, 10.0));
    session.clear_custom_border_data(handle);
    session.close_window(handle);

    assert!(session.window(handle).is_none());
    assert!(!session.is_maximized(handle));
    assert!(!session.is_fullscreen(handle));
    assert!(!session.is_focused(handle));
    assert_eq!(session.rect_from_window(handle), Rect::ZERO);
    assert_eq!(session.mouse_from_window(handle), Vec2::ZERO);
    assert!(session.wl_surface(handle).is_none());
    assert_eq!(fixture.requests().len(), before);
}

#[test]
fn test_null_handle_is_inert() {
    let mut fixture = Fixture::new();
    fixture.open_window("live");
    fixture.take_requests();

    assert_inert(&mut fixture, WindowHandle::NULL);
}

#[test]
fn test_closed_handle_is_inert() {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("closing");
    fixture.take_requests();

    fixture.session_mut().close_window(handle);
    assert_eq!(
        fixture.take_requests(),
        vec![Request::DestroyWindow { window: handle }]
    );
    assert_inert(&mut fixture, handle);
}

#[test]
fn test_close_twice_destroys_once() {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("twice");
    fixture.take_requests();

    fixture.session_mut().close_window(handle);
    fixture.session_mut().close_window(handle);
    assert_eq!(fixture.requests().len(), 1);
}

#[test]
fn test_slot_reuse_gets_fresh_handle() {
    let mut fixture = Fixture::new();
    let first = fixture.open_window("first");
    fixture.session_mut().close_window(first);
    let second = fixture.open_window("second");

    assert_ne!(first, second);
    assert_eq!(fixture.session().windows(), &[second]);
    assert!(fixture.session().window(first).is_none());
    assert_eq!(fixture.window(second).title, "second");
}

#[test]
fn test_events_for_closed_window_are_dropped() {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("gone");
    fixture.pointer_enter(handle, 10.0, 10.0);
    fixture.dispatch();
    fixture.session_mut().close_window(handle);
    assert!(fixture.session().pointer_focus().is_null());
    fixture.take_requests();

    fixture.close_request(handle);
    fixture.configure(handle, 640, 480, false, false);
    fixture.preferred_scale(handle, 240);
    fixture.motion(20.0, 20.0);
    fixture.session_mut().set_cursor(Cursor::IBar);

    assert!(fixture.dispatch().is_empty());
    assert!(fixture.requests().is_empty());
}

#[test]
fn test_windows_listed_in_creation_order() {
    let mut fixture = Fixture::new();
    let a = fixture.open_window("a");
    let b = fixture.open_window("b");
    let c = fixture.open_window("c");
    fixture.session_mut().close_window(b);

    assert_eq!(fixture.session().windows(), &[a, c]);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Open,
        Close(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Open), any::<usize>().prop_map(Op::Close)]
    }

    proptest! {
        #[test]
        fn test_handles_never_alias(ops in prop::collection::vec(op(), 1..30)) {
            let mut fixture = Fixture::new();
            let mut live: Vec<WindowHandle> = Vec::new();
            let mut closed: Vec<WindowHandle> = Vec::new();

            for op in ops {
                match op {
                    Op::Open => {
                        let handle = fixture.open_window("prop");
                        prop_assert!(!live.contains(&handle));
                        prop_assert!(!closed.contains(&handle));
                        live.push(handle);
                    }
                    Op::Close(index) if !live.is_empty() => {
                        let handle = live.remove(index % live.len());
                        fixture.session_mut().close_window(handle);
                        closed.push(handle);
                    }
                    Op::Close(_) => {}
                }
            }

            prop_assert_eq!(fixture.session().windows(), live.as_slice());
            for handle in &closed {
                prop_assert!(fixture.session().window(*handle).is_none());
            }
        }
    }
}
