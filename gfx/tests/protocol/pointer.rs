//! Pointer tests
//!
//! Tests for pointer events and the custom decoration hit-tester: resize
//! edges, title bar drags, double-click maximize and the window menu.

use wlos_core::backend::Request;
use wlos_core::decoration::ResizeEdge;
use wlos_core::input::codes;
use wlos_core::listener::Axis;
use wlos_core::testing::Fixture;
use wlos_core::{Cursor, EventKind, Key, Rect, Vec2, WindowHandle};

/// Window with a 30 unit title bar and 5 unit resize edges
fn decorated() -> (Fixture, WindowHandle) {
    let mut fixture = Fixture::new();
    let handle = fixture.open_decorated("pointer", 30.0, 5.0);
    fixture.take_requests();
    (fixture, handle)
}

fn moves(requests: &[Request]) -> usize {
    requests
        .iter()
        .filter(|r| matches!(r, Request::Move { .. }))
        .count()
}

#[test]
fn test_enter_sets_cursor() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.dispatch();

    assert_eq!(fixture.session().pointer_focus(), handle);
    assert_eq!(
        fixture.take_requests(),
        vec![Request::SetCursor {
            name: "left_ptr",
            serial: 1,
            scale: 1.0
        }]
    );
}

#[test]
fn test_enter_unknown_window_is_ignored() {
    let mut fixture = Fixture::new();
    fixture.pointer_enter(WindowHandle::from_u64(77), 10.0, 10.0);
    fixture.motion(20.0, 20.0);

    assert!(fixture.dispatch().is_empty());
    assert!(fixture.session().pointer_focus().is_null());
    assert!(fixture.requests().is_empty());
}

#[test]
fn test_motion_is_scaled() {
    let (mut fixture, handle) = decorated();
    fixture.preferred_scale(handle, 180);
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.motion(10.0, 20.0);

    let events = fixture.dispatch();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events.as_slice()[0].kind,
        EventKind::Move {
            pos: Vec2::new(15.0, 30.0)
        }
    );
    assert_eq!(
        fixture.session().mouse_from_window(handle),
        Vec2::new(15.0, 30.0)
    );
}

#[test]
fn test_motion_after_leave_is_dropped() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.pointer_leave(handle);
    fixture.motion(20.0, 20.0);

    assert!(fixture.dispatch().is_empty());
    assert!(fixture.session().pointer_focus().is_null());
}

#[test]
fn test_buttons_track_key_state() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.button(codes::BTN_RIGHT, true);
    fixture.dispatch();
    assert!(fixture.session().key_is_down(Key::RightMouseButton));

    fixture.button(codes::BTN_RIGHT, false);
    let events = fixture.dispatch();
    assert!(!fixture.session().key_is_down(Key::RightMouseButton));
    assert_eq!(events.as_slice()[0].key(), Some(Key::RightMouseButton));
}

#[test]
fn test_extra_buttons_emit_nothing() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.click(0x113);

    assert!(fixture.dispatch().is_empty());
}

#[test]
fn test_title_bar_press_starts_move() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 10.0);
    let serial = fixture.button(codes::BTN_LEFT, true);
    fixture.dispatch();

    assert!(fixture.requests().contains(&Request::Move {
        window: handle,
        serial
    }));
}

#[test]
fn test_client_area_press_does_not_move() {
    let (mut fixture, handle) = decorated();
    fixture
        .session_mut()
        .push_custom_title_bar_client_area(handle, Rect::new(50.0, 0.0, 150.0, 30.0));
    fixture.pointer_enter(handle, 100.0, 10.0);
    fixture.click(codes::BTN_LEFT);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 2);
    assert_eq!(moves(fixture.requests()), 0);
}

#[test]
fn test_cleared_client_areas_drag_again() {
    let (mut fixture, handle) = decorated();
    let session = fixture.session_mut();
    session.push_custom_title_bar_client_area(handle, Rect::new(50.0, 0.0, 150.0, 30.0));
    session.clear_custom_border_data(handle);
    session.push_custom_title_bar(handle, 30.0);

    fixture.pointer_enter(handle, 100.0, 10.0);
    fixture.click(codes::BTN_LEFT);
    fixture.dispatch();
    assert_eq!(moves(fixture.requests()), 1);
}

#[test]
fn test_body_press_is_plain_input() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 400.0, 300.0);
    fixture.click(codes::BTN_LEFT);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 2);
    assert!(fixture
        .requests()
        .iter()
        .all(|r| matches!(r, Request::SetCursor { .. })));
}

#[test]
fn test_edge_press_starts_resize() {
    let cases = [
        ((2.0, 300.0), ResizeEdge::Left),
        ((1278.0, 300.0), ResizeEdge::Right),
        ((600.0, 2.0), ResizeEdge::Top),
        ((600.0, 718.0), ResizeEdge::Bottom),
        ((2.0, 2.0), ResizeEdge::TopLeft),
        ((1278.0, 2.0), ResizeEdge::TopRight),
        ((2.0, 718.0), ResizeEdge::BottomLeft),
        ((1278.0, 718.0), ResizeEdge::BottomRight),
    ];
    for ((x, y), edge) in cases {
        let (mut fixture, handle) = decorated();
        fixture.pointer_enter(handle, x, y);
        let serial = fixture.button(codes::BTN_LEFT, true);
        fixture.dispatch();

        assert!(
            fixture.requests().contains(&Request::Resize {
                window: handle,
                serial,
                edge
            }),
            "expected {:?} at ({}, {})",
            edge,
            x,
            y
        );
        assert_eq!(moves(fixture.requests()), 0);
    }
}

#[test]
fn test_maximized_window_has_no_edges() {
    let (mut fixture, handle) = decorated();
    fixture.session_mut().set_maximized(handle, true);
    assert!(fixture.session().is_maximized(handle));
    fixture.take_requests();

    fixture.pointer_enter(handle, 2.0, 10.0);
    fixture.button(codes::BTN_LEFT, true);
    fixture.dispatch();

    // The corner is title bar now
    assert_eq!(moves(fixture.requests()), 1);
    assert!(!fixture
        .requests()
        .iter()
        .any(|r| matches!(r, Request::Resize { .. })));
}

#[test]
fn test_double_click_toggles_maximize() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 10.0);
    fixture.click(codes::BTN_LEFT);
    fixture.advance(150);
    fixture.click(codes::BTN_LEFT);
    fixture.dispatch();

    assert!(fixture.requests().contains(&Request::SetMaximized {
        window: handle,
        maximized: true
    }));
    // Only the first press starts a move
    assert_eq!(moves(fixture.requests()), 1);

    // The compositor answers with a maximized configure
    fixture.dispatch();
    assert!(fixture.session().is_maximized(handle));

    fixture.take_requests();
    fixture.advance(1000);
    fixture.click(codes::BTN_LEFT);
    fixture.advance(100);
    fixture.click(codes::BTN_LEFT);
    fixture.dispatch();
    fixture.dispatch();
    assert!(!fixture.session().is_maximized(handle));
}

#[test]
fn test_slow_double_click_moves_twice() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 10.0);
    fixture.click(codes::BTN_LEFT);
    fixture.advance(250);
    fixture.click(codes::BTN_LEFT);
    fixture.dispatch();

    assert_eq!(moves(fixture.requests()), 2);
    assert!(!fixture
        .requests()
        .iter()
        .any(|r| matches!(r, Request::SetMaximized { .. })));
}

#[test]
fn test_double_click_needs_same_position() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 10.0);
    fixture.click(codes::BTN_LEFT);
    fixture.motion(140.0, 10.0);
    fixture.click(codes::BTN_LEFT);
    fixture.dispatch();

    assert_eq!(moves(fixture.requests()), 2);
}

#[test]
fn test_first_click_is_never_double() {
    let mut fixture = Fixture::new();
    // Input clock starting at zero
    fixture.advance(0u32.wrapping_sub(1000));
    let handle = fixture.open_decorated("early", 30.0, 0.0);
    fixture.pointer_enter(handle, 0.0, 0.0);
    fixture.button(codes::BTN_LEFT, true);
    fixture.dispatch();

    assert_eq!(moves(fixture.requests()), 1);
    assert!(!fixture
        .requests()
        .iter()
        .any(|r| matches!(r, Request::SetMaximized { .. })));
}

#[test]
fn test_right_click_in_title_bar_opens_menu() {
    let (mut fixture, handle) = decorated();
    fixture.preferred_scale(handle, 240);
    fixture.pointer_enter(handle, 100.0, 10.0);
    let serial = fixture.button(codes::BTN_RIGHT, true);
    fixture.dispatch();

    // Position goes back to logical units
    assert!(fixture.requests().contains(&Request::ShowWindowMenu {
        window: handle,
        serial,
        x: 100,
        y: 10
    }));
}

#[test]
fn test_right_click_below_title_bar_is_plain_input() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 40.0);
    fixture.click(codes::BTN_RIGHT);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 2);
    assert!(!fixture
        .requests()
        .iter()
        .any(|r| matches!(r, Request::ShowWindowMenu { .. })));
}

#[test]
fn test_scroll_lines() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.axis(Axis::Vertical, 120.0);
    fixture.axis(Axis::Horizontal, -30.0);
    let events = fixture.dispatch();

    let deltas: Vec<Vec2> = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Scroll { delta, .. } => Some(delta),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, vec![Vec2::new(0.0, 12.0), Vec2::new(-3.0, 0.0)]);
}

#[test]
fn test_edge_cursor_restores_requested_cursor() {
    let (mut fixture, handle) = decorated();
    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.dispatch();
    fixture.session_mut().set_cursor(Cursor::IBar);
    fixture.take_requests();

    fixture.motion(2.0, 100.0);
    fixture.dispatch();
    fixture.motion(3.0, 100.0);
    fixture.dispatch();
    // Requests while an edge cursor is shown are remembered only
    fixture.session_mut().set_cursor(Cursor::HandPoint);
    fixture.motion(100.0, 100.0);
    fixture.dispatch();

    let names: Vec<&str> = fixture
        .take_requests()
        .into_iter()
        .filter_map(|r| match r {
            Request::SetCursor { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["left_side", "hand2"]);
}

#[test]
fn test_set_cursor_without_focus_is_remembered() {
    let (mut fixture, handle) = decorated();
    fixture.session_mut().set_cursor(Cursor::IBar);
    assert!(fixture.requests().is_empty());

    fixture.pointer_enter(handle, 100.0, 100.0);
    fixture.dispatch();
    assert!(matches!(
        fixture.requests(),
        [Request::SetCursor { name: "text", .. }]
    ));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_button_events_follow_pointer(
            x in 0.0f64..1280.0,
            y in 0.0f64..720.0,
            scale in 120u32..=360,
        ) {
            let (mut fixture, handle) = decorated();
            fixture.preferred_scale(handle, scale);
            fixture.pointer_enter(handle, x, y);
            fixture.click(codes::BTN_MIDDLE);
            let events = fixture.dispatch();

            prop_assert_eq!(events.len(), 2);
            let expected = fixture.session().mouse_from_window(handle);
            for event in events.iter() {
                prop_assert_eq!(event.window, handle);
                match event.kind {
                    EventKind::Press { key, pos } | EventKind::Release { key, pos } => {
                        prop_assert_eq!(key, Key::MiddleMouseButton);
                        prop_assert_eq!(pos, expected);
                    }
                    ref other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
            prop_assert!(!fixture.session().key_is_down(Key::MiddleMouseButton));
        }
    }
}
