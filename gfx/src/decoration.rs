//! Custom decoration hit-testing
//!
//! Windows draw their own title bar and borders. These functions classify the
//! last pointer position of a window against the decoration metadata the
//! application pushed: resize borders, the draggable title bar and the
//! client areas inside the title bar that must keep receiving clicks.

use serde::Serialize;

use crate::utils::to_physical;
use crate::window::Window;

/// Window border or corner under the pointer
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResizeEdge {
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeEdge {
    pub fn is_none(&self) -> bool {
        *self == ResizeEdge::None
    }

    /// XCursor name shown while hovering this edge
    pub fn cursor_name(&self) -> Option<&'static str> {
        match self {
            ResizeEdge::None => None,
            ResizeEdge::Top => Some("top_side"),
            ResizeEdge::Bottom => Some("bottom_side"),
            ResizeEdge::Left => Some("left_side"),
            ResizeEdge::Right => Some("right_side"),
            ResizeEdge::TopLeft => Some("top_left_corner"),
            ResizeEdge::TopRight => Some("top_right_corner"),
            ResizeEdge::BottomLeft => Some("bottom_left_corner"),
            ResizeEdge::BottomRight => Some("bottom_right_corner"),
        }
    }
}

/// Classify the pointer position against the scaled resize margin.
///
/// Uses integer device pixels. Top and bottom take precedence and combine
/// with left/right into corners. Maximized and fullscreen windows have no
/// resize borders.
pub fn resize_edge(window: &Window) -> ResizeEdge {
    if window.maximized || window.fullscreen {
        return ResizeEdge::None;
    }

    let x = window.mouse_x as i32;
    let y = window.mouse_y as i32;
    let width = to_physical(window.scale, window.width);
    let height = to_physical(window.scale, window.height);
    let margin = to_physical(window.scale, window.decoration.edge_thickness);
    if margin <= 0 {
        return ResizeEdge::None;
    }

    let top = y < margin;
    let bottom = y > height - margin;
    let left = x < margin;
    let right = x > width - margin;

    match (top, bottom, left, right) {
        (true, _, true, _) => ResizeEdge::TopLeft,
        (true, _, _, true) => ResizeEdge::TopRight,
        (true, _, _, _) => ResizeEdge::Top,
        (_, true, true, _) => ResizeEdge::BottomLeft,
        (_, true, _, true) => ResizeEdge::BottomRight,
        (_, true, _, _) => ResizeEdge::Bottom,
        (_, _, true, _) => ResizeEdge::Left,
        (_, _, _, true) => ResizeEdge::Right,
        _ => ResizeEdge::None,
    }
}

/// Pointer is within the scaled title bar height
pub fn in_title_bar(window: &Window) -> bool {
    let thickness = f64::from(window.decoration.title_bar_thickness) * window.scale;
    window.mouse_y < thickness
}

/// Pointer is over one of the title bar client areas
pub fn over_client_area(window: &Window) -> bool {
    window
        .decoration
        .client_areas
        .iter()
        .any(|r| r.contains(window.mouse_x, window.mouse_y))
}

/// Result of a left-button hit test
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    Resize(ResizeEdge),
    /// Title bar outside every client area
    Drag,
    Client,
}

/// Decide what a left press at the current pointer position does.
pub fn hit_test(window: &Window) -> Hit {
    let edge = resize_edge(window);
    if !edge.is_none() {
        Hit::Resize(edge)
    } else if in_drag_region(window) {
        Hit::Drag
    } else {
        Hit::Client
    }
}

/// Title bar outside client areas, where a double click toggles maximize
pub fn in_drag_region(window: &Window) -> bool {
    in_title_bar(window) && !over_client_area(window)
}
