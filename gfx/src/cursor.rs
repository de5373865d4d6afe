//! Pointer cursor selection
//!
//! The application picks abstract [`Cursor`] shapes. While the pointer hovers a
//! custom resize border the matching edge cursor is forced and application
//! requests are remembered but not shown; leaving the border restores the
//! application's last choice.

use serde::{Deserialize, Serialize};

use crate::decoration::ResizeEdge;

/// Logical cursor size; the theme is loaded at `size * scale` pixels.
pub const CURSOR_THEME_SIZE: u32 = 24;

/// Abstract cursor shape
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    #[default]
    Pointer,
    IBar,
    LeftRight,
    UpDown,
    DownRight,
    UpRight,
    UpDownLeftRight,
    HandPoint,
    Disabled,
}

impl Cursor {
    /// XCursor theme name
    pub fn theme_name(&self) -> &'static str {
        match self {
            Cursor::Pointer => "left_ptr",
            Cursor::IBar => "text",
            Cursor::LeftRight => "ew-resize",
            Cursor::UpDown => "ns-resize",
            Cursor::DownRight => "nwse-resize",
            Cursor::UpRight => "nesw-resize",
            Cursor::UpDownLeftRight => "all-scroll",
            Cursor::HandPoint => "hand2",
            Cursor::Disabled => "not-allowed",
        }
    }
}

/// Which cursor the application wants and which one is on screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorState {
    requested: Cursor,
    shown: Option<&'static str>,
    force_border: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            requested: Cursor::Pointer,
            shown: None,
            force_border: false,
        }
    }
}

impl CursorState {
    /// An edge cursor is forced over the application's choice
    pub fn is_forced(&self) -> bool {
        self.force_border
    }

    /// Record an application request. Returns the name to display, or `None`
    /// while an edge cursor is forced.
    pub fn request(&mut self, cursor: Cursor) -> Option<&'static str> {
        self.requested = cursor;
        if self.force_border {
            return None;
        }
        let name = cursor.theme_name();
        self.shown = Some(name);
        Some(name)
    }

    /// Re-evaluate after pointer motion. Returns a name when the displayed
    /// cursor has to change.
    pub fn update_edge(&mut self, edge: ResizeEdge) -> Option<&'static str> {
        match edge.cursor_name() {
            Some(name) => {
                self.force_border = true;
                if self.shown == Some(name) {
                    return None;
                }
                self.shown = Some(name);
                Some(name)
            }
            None if self.force_border => {
                self.force_border = false;
                let name = self.requested.theme_name();
                self.shown = Some(name);
                Some(name)
            }
            None => None,
        }
    }

    /// The pointer entered a surface; the compositor expects a cursor again.
    pub fn on_enter(&mut self) -> &'static str {
        self.force_border = false;
        let name = self.requested.theme_name();
        self.shown = Some(name);
        name
    }

    /// Name to re-apply after a scale change or theme reload
    pub fn reapply(&self) -> &'static str {
        self.shown.unwrap_or_else(|| self.requested.theme_name())
    }
}
