//! Protocol-level tests for the listener bank
//!
//! These tests feed compositor messages through the headless backend and
//! check the resulting events, window state and follow-up requests.
//!
//! # Test Organization
//!
//! - `pointer.rs` - Motion, buttons, scroll, decoration hit-testing, cursors
//! - `keyboard.rs` - Keymaps, key events, text, modifiers, focus
//! - `toplevel.rs` - Configure handshake, close requests, scale changes
//! - `registry.rs` - Handle lifecycle, null and stale handles

mod keyboard;
mod pointer;
mod registry;
mod toplevel;
