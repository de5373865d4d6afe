//! Keyboard tests
//!
//! Tests for keymap handling, key and text events, modifier snapshots and
//! keyboard focus.

use wlos_core::input::codes;
use wlos_core::listener::ProtocolEvent;
use wlos_core::testing::{Fixture, ALT_MASK, CTRL_MASK, SHIFT_MASK};
use wlos_core::{Event, EventKind, Key, Modifiers, WindowHandle};

fn texts(events: &[Event]) -> Vec<char> {
    events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Text { character } => Some(character),
            _ => None,
        })
        .collect()
}

fn focused() -> (Fixture, WindowHandle) {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("keyboard");
    fixture.keyboard_enter(handle);
    fixture.dispatch();
    (fixture, handle)
}

#[test]
fn test_keyboard_enter_sets_focus() {
    let (fixture, handle) = focused();
    assert_eq!(fixture.session().keyboard_focus(), handle);
    assert!(fixture.session().is_focused(handle));
}

#[test]
fn test_press_emits_key_then_text() {
    let (mut fixture, handle) = focused();
    fixture.modifiers(SHIFT_MASK);
    fixture.key(codes::KEY_A, true);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 2);
    let press = &events.as_slice()[0];
    assert_eq!(press.window, handle);
    assert_eq!(press.key(), Some(Key::A));
    assert!(press.modifiers.shift);
    assert_eq!(
        events.as_slice()[1].kind,
        EventKind::Text { character: 'A' }
    );
}

#[test]
fn test_text_per_press() {
    let (mut fixture, _) = focused();
    fixture.modifiers(SHIFT_MASK);
    fixture.tap(codes::KEY_A);
    fixture.modifiers(0);
    fixture.tap(codes::KEY_TAB);
    fixture.tap(codes::KEY_A);
    let events = fixture.dispatch();

    assert_eq!(texts(events.as_slice()), vec!['A', '\t', 'a']);
}

#[test]
fn test_escape_has_no_text() {
    let (mut fixture, _) = focused();
    fixture.tap(codes::KEY_ESC);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 2);
    assert_eq!(events.as_slice()[0].key(), Some(Key::Esc));
    assert_eq!(events.as_slice()[1].key(), Some(Key::Esc));
    assert!(texts(events.as_slice()).is_empty());
}

#[test]
fn test_no_text_without_keymap() {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("no keymap");
    fixture.inject(ProtocolEvent::KeyboardEnter { window: handle });
    fixture.key(codes::KEY_A, true);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 1);
    assert_eq!(events.as_slice()[0].key(), Some(Key::A));
    assert!(events.as_slice()[0].modifiers.is_empty());
}

#[test]
fn test_invalid_keymap_keeps_previous() {
    let (mut fixture, _) = focused();
    fixture.inject(ProtocolEvent::Keymap {
        text: "xkb_keymap { not a keymap".to_string(),
    });
    fixture.key(codes::KEY_A, true);
    let events = fixture.dispatch();

    assert_eq!(texts(events.as_slice()), vec!['a']);
}

#[test]
fn test_modifier_snapshot() {
    let (mut fixture, _) = focused();
    fixture.modifiers(CTRL_MASK | ALT_MASK);
    fixture.key(codes::KEY_ESC, true);
    fixture.modifiers(0);
    fixture.key(codes::KEY_ESC, false);
    let events = fixture.dispatch();

    assert_eq!(
        events.as_slice()[0].modifiers,
        Modifiers {
            shift: false,
            ctrl: true,
            alt: true
        }
    );
    assert!(events.as_slice()[1].modifiers.is_empty());
    assert!(fixture.session().modifiers().is_empty());
}

#[test]
fn test_unmapped_key_still_balanced() {
    let (mut fixture, _) = focused();
    fixture.tap(200);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.key() == Some(Key::Null)));
    assert!(!fixture.session().key_is_down(Key::Null));
}

#[test]
fn test_keys_fall_back_to_pointer_focus() {
    let mut fixture = Fixture::new();
    let handle = fixture.open_window("pointer");
    fixture.pointer_enter(handle, 10.0, 10.0);
    fixture.key(codes::KEY_SPACE, true);
    let events = fixture.dispatch();

    assert_eq!(events.as_slice()[0].window, handle);
}

#[test]
fn test_keys_without_focus_go_to_null_window() {
    let mut fixture = Fixture::new();
    fixture.key(codes::KEY_SPACE, true);
    let events = fixture.dispatch();

    assert_eq!(events.len(), 1);
    assert!(events.as_slice()[0].window.is_null());
}

#[test]
fn test_key_state_cleared_on_leave() {
    let (mut fixture, handle) = focused();
    fixture.key(codes::KEY_A, true);
    fixture.key(codes::KEY_F5, true);
    fixture.dispatch();
    assert!(fixture.session().key_is_down(Key::A));
    assert!(fixture.session().key_is_down(Key::F5));

    fixture.key(codes::KEY_A, false);
    fixture.dispatch();
    assert!(!fixture.session().key_is_down(Key::A));

    fixture.keyboard_leave(handle);
    fixture.dispatch();
    assert!(!fixture.session().key_is_down(Key::F5));
    assert!(fixture.session().keyboard_focus().is_null());
}

#[test]
fn test_closing_focused_window_clears_focus() {
    let (mut fixture, handle) = focused();
    fixture.session_mut().close_window(handle);
    assert!(fixture.session().keyboard_focus().is_null());

    fixture.key(codes::KEY_A, true);
    let events = fixture.dispatch();
    assert!(events.as_slice()[0].window.is_null());
}

mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const KEYS: &[(u32, Key)] = &[
        (codes::KEY_A, Key::A),
        (codes::KEY_Z, Key::Z),
        (codes::KEY_1, Key::Num1),
        (codes::KEY_F1, Key::F1),
        (codes::KEY_ENTER, Key::Return),
        (codes::KEY_LEFT, Key::Left),
    ];

    proptest! {
        #[test]
        fn test_key_is_down_tracks_presses(
            ops in prop::collection::vec((0..KEYS.len(), any::<bool>()), 0..40),
        ) {
            let (mut fixture, _) = focused();
            let mut model = HashSet::new();
            for (index, pressed) in ops {
                let (code, key) = KEYS[index];
                fixture.key(code, pressed);
                if pressed {
                    model.insert(key);
                } else {
                    model.remove(&key);
                }
            }
            fixture.dispatch();

            for (_, key) in KEYS {
                prop_assert_eq!(fixture.session().key_is_down(*key), model.contains(key));
            }
        }
    }
}
