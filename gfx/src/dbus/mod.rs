//! Desktop services over the session bus
//!
//! Implements:
//! - org.freedesktop.portal.FileChooser for the open-file dialog
//! - org.freedesktop.FileManager1 for revealing a path in the file manager
//! - default URI handler launch through GIO
//!
//! Bus calls run on helper threads with their own blocking connection so the
//! Wayland event loop keeps running while a dialog is open.

pub mod file_chooser;
pub mod shell;

pub use file_chooser::{pick_channel, FilePickSender, PendingFilePick};
#[cfg(feature = "portal")]
pub use file_chooser::open_file;
#[cfg(feature = "portal")]
pub use shell::show_in_file_manager;
pub use shell::open_in_browser;
