//! Window registry
//!
//! Windows live in a generational slot table. Closing a window empties its
//! slot, bumps the generation and queues the slot for reuse, so handles to
//! closed windows never alias a newer window and resolve to nothing, exactly
//! like the null handle.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::utils::{to_physical, Rect};

pub const DEFAULT_WIDTH: i32 = 1280;
pub const DEFAULT_HEIGHT: i32 = 720;

/// Opaque window identifier; zero is the null handle.
///
/// Low 32 bits hold the slot index plus one, high 32 bits the slot generation.
#[derive(Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    fn new(index: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | (u64::from(index) + 1))
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    fn index(&self) -> Option<usize> {
        let low = (self.0 & 0xffff_ffff) as u32;
        low.checked_sub(1).map(|i| i as usize)
    }

    fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "WindowHandle(null)")
        } else {
            write!(
                f,
                "WindowHandle({}:{})",
                self.index().unwrap_or_default(),
                self.generation()
            )
        }
    }
}

/// Renderer surface resized on configure and scale changes
pub trait RenderTarget {
    /// New framebuffer size in device pixels.
    fn resize(&mut self, width: i32, height: i32);
}

/// Custom client-side decoration metadata
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decoration {
    /// Title bar height in logical units
    pub title_bar_thickness: f32,
    /// Resize border width in logical units
    pub edge_thickness: f32,
    /// Title bar regions that belong to the application (buttons, tabs)
    pub client_areas: Vec<Rect>,
}

impl Decoration {
    /// Reset all metadata, keeping the client-area allocation.
    pub fn clear(&mut self) {
        self.title_bar_thickness = 0.0;
        self.edge_thickness = 0.0;
        self.client_areas.clear();
    }

    /// Record a title bar client area. Dropped when memory cannot be reserved.
    pub fn push_client_area(&mut self, rect: Rect) {
        if self.client_areas.try_reserve(1).is_ok() {
            self.client_areas.push(rect);
        }
    }
}

/// Creation flags. Placement belongs to the compositor, so these are advisory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowFlags {
    /// The application draws its own title bar and borders
    pub custom_border: bool,
    pub use_default_position: bool,
}

/// Per-window state
pub struct Window {
    /// Logical size
    pub width: i32,
    pub height: i32,
    pub scale: f64,
    /// Last pointer position in device pixels
    pub mouse_x: f64,
    pub mouse_y: f64,
    /// Time of the last left button transition (ms)
    pub last_click_time: Option<u32>,
    pub last_click_x: f64,
    pub last_click_y: f64,
    pub maximized: bool,
    pub fullscreen: bool,
    pub activated: bool,
    pub title: String,
    pub decoration: Decoration,
    pub pending_configure: bool,
    pub render_target: Option<Box<dyn RenderTarget>>,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: 1.0,
            mouse_x: 0.0,
            mouse_y: 0.0,
            last_click_time: None,
            last_click_x: 0.0,
            last_click_y: 0.0,
            maximized: false,
            fullscreen: false,
            activated: false,
            title: String::new(),
            decoration: Decoration::default(),
            pending_configure: false,
            render_target: None,
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("maximized", &self.maximized)
            .field("fullscreen", &self.fullscreen)
            .field("activated", &self.activated)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl Window {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Framebuffer size in device pixels
    pub fn physical_size(&self) -> (i32, i32) {
        (
            to_physical(self.scale, self.width),
            to_physical(self.scale, self.height),
        )
    }

    /// `(0, 0, w·scale, h·scale)` in device pixels, not rounded
    pub fn rect(&self) -> Rect {
        let scale = self.scale as f32;
        Rect::new(0.0, 0.0, self.width as f32 * scale, self.height as f32 * scale)
    }

    /// Apply a toplevel configure size; non-positive dimensions are ignored.
    pub fn apply_configure_size(&mut self, width: i32, height: i32) {
        if width > 0 {
            self.width = width;
        }
        if height > 0 {
            self.height = height;
        }
    }

    /// Resize the attached render target to the current framebuffer size.
    pub fn resize_render_target(&mut self) {
        let (w, h) = self.physical_size();
        if let Some(target) = self.render_target.as_mut() {
            target.resize(w, h);
        }
    }
}

struct Slot {
    generation: u32,
    window: Option<Window>,
}

/// Generational slot table of open windows
#[derive(Default)]
pub struct WindowRegistry {
    slots: Vec<Slot>,
    /// Emptied slots, reused first-in first-out
    free: VecDeque<u32>,
    /// Live handles in creation order
    live: Vec<WindowHandle>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a window, reusing an emptied slot when one is queued.
    pub fn insert(&mut self, window: Window) -> WindowHandle {
        let handle = match self.free.pop_front() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.window = Some(window);
                WindowHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    window: Some(window),
                });
                WindowHandle::new(index, 0)
            }
        };
        self.live.push(handle);
        handle
    }

    fn slot(&self, handle: WindowHandle) -> Option<&Slot> {
        let slot = self.slots.get(handle.index()?)?;
        (slot.generation == handle.generation()).then_some(slot)
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: WindowHandle) -> Option<&Window> {
        self.slot(handle)?.window.as_ref()
    }

    pub fn get_mut(&mut self, handle: WindowHandle) -> Option<&mut Window> {
        let slot = self.slots.get_mut(handle.index()?)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.window.as_mut()
    }

    /// Remove a window and queue its slot for reuse.
    pub fn remove(&mut self, handle: WindowHandle) -> Option<Window> {
        let index = handle.index()?;
        let slot = self.slots.get_mut(index)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let window = slot.window.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(index as u32);
        self.live.retain(|h| *h != handle);
        Some(window)
    }

    /// Live handles in creation order
    pub fn handles(&self) -> &[WindowHandle] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Allocated slots, live or queued for reuse
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
