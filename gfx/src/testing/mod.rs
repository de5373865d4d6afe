//! Testing infrastructure for wlos sessions
//!
//! This module provides a test fixture for driving a [`crate::Session`]
//! without a display server.
//!
//! # Architecture
//!
//! 1. **HeadlessBackend**: records every request the session makes and
//!    answers window creation and state changes with the configure sequence
//!    a compositor would send.
//!
//! 2. **Fixture**: wraps a session over the headless backend and provides
//!    methods for simulating seat input and compositor messages.
//!
//! # Example
//!
//! ```ignore
//! use wlos_core::testing::Fixture;
//!
//! #[test]
//! fn test_motion() {
//!     let mut fixture = Fixture::new();
//!     let window = fixture.open_window("test");
//!     fixture.pointer_enter(window, 10.0, 10.0);
//!     fixture.motion(20.0, 30.0);
//!
//!     let events = fixture.dispatch();
//!     assert_eq!(events.len(), 1);
//! }
//! ```

mod fixture;

pub use fixture::Fixture;

/// Self-contained XKB keymap with Escape, Tab, A and Left Shift.
///
/// Compiles without the system xkeyboard-config data.
pub const TEST_KEYMAP: &str = r#"xkb_keymap {
    xkb_keycodes "test" {
        minimum = 8;
        maximum = 255;
        <ESC> = 9;
        <TAB> = 23;
        <AC01> = 38;
        <LFSH> = 50;
    };
    xkb_types "test" {
        type "ONE_LEVEL" {
            modifiers = none;
            level_name[Level1] = "Any";
        };
        type "TWO_LEVEL" {
            modifiers = Shift;
            map[Shift] = Level2;
            level_name[Level1] = "Base";
            level_name[Level2] = "Shift";
        };
        type "ALPHABETIC" {
            modifiers = Shift+Lock;
            map[Shift] = Level2;
            map[Lock] = Level2;
            level_name[Level1] = "Base";
            level_name[Level2] = "Caps";
        };
    };
    xkb_compatibility "test" {
        interpret Shift_L {
            action = SetMods(modifiers=Shift);
        };
    };
    xkb_symbols "test" {
        key <ESC> { [ Escape ] };
        key <TAB> { [ Tab, ISO_Left_Tab ] };
        key <AC01> { [ a, A ] };
        key <LFSH> { [ Shift_L ] };
        modifier_map Shift { <LFSH> };
    };
};
"#;

/// Modifier masks of [`TEST_KEYMAP`]
pub const SHIFT_MASK: u32 = 1 << 0;
pub const CTRL_MASK: u32 = 1 << 2;
pub const ALT_MASK: u32 = 1 << 3;
