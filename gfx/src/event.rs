//! Input events handed to the application main loop.
//!
//! Events are produced by the listener bank while the protocol queue is
//! dispatched and returned, in arrival order, from [`crate::Session::get_events`].

use serde::Serialize;

use crate::input::{Key, Modifiers};
use crate::utils::Vec2;
use crate::window::WindowHandle;

/// What happened
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "event")]
pub enum EventKind {
    /// Pointer moved inside a window
    #[serde(rename = "move")]
    Move { pos: Vec2 },
    /// Key or mouse button pressed
    #[serde(rename = "press")]
    Press { key: Key, pos: Vec2 },
    /// Key or mouse button released
    #[serde(rename = "release")]
    Release { key: Key, pos: Vec2 },
    /// Wheel or touchpad scroll, already divided into lines
    #[serde(rename = "scroll")]
    Scroll { delta: Vec2, pos: Vec2 },
    /// One decoded text codepoint
    #[serde(rename = "text")]
    Text { character: char },
    /// The compositor asked the window to close
    #[serde(rename = "window_close")]
    WindowClose,
}

/// An input event together with its target window and modifier snapshot
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub window: WindowHandle,
    pub modifiers: Modifiers,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(window: WindowHandle, modifiers: Modifiers, kind: EventKind) -> Self {
        Self {
            window,
            modifiers,
            kind,
        }
    }

    /// Key carried by press/release events
    pub fn key(&self) -> Option<Key> {
        match self.kind {
            EventKind::Press { key, .. } | EventKind::Release { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Ordered events from one pump
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Move all events out, leaving the list empty.
    pub fn take(&mut self) -> EventList {
        std::mem::take(self)
    }
}

impl IntoIterator for EventList {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventList {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl From<Vec<Event>> for EventList {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}
