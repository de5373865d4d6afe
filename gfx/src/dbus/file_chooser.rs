//! Open-file dialog through org.freedesktop.portal.FileChooser
//!
//! The portal answers asynchronously with a `Response` signal on a request
//! object whose path is derived from our unique bus name and a handle token.
//! We subscribe to that path before calling `OpenFile`, then wait for the
//! signal on a helper thread. The caller gets a [`PendingFilePick`]: a result
//! channel plus a socket that becomes readable on completion, so it can be
//! polled next to the Wayland connection.

use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use anyhow::Context;
use tracing::debug;

pub const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
pub const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
pub const FILE_CHOOSER_INTERFACE: &str = "org.freedesktop.portal.FileChooser";
pub const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(0);

/// Unique `handle_token` for a portal request.
pub fn handle_token() -> String {
    let id = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    format!("wlos{}_{}", std::process::id(), id)
}

/// Request object path the portal creates for `token`.
///
/// The sender part is the unique name without the leading colon, dots
/// replaced by underscores.
pub fn request_path(unique_name: &str, token: &str) -> String {
    let sender = unique_name.trim_start_matches(':').replace('.', "_");
    format!("{}/request/{}/{}", PORTAL_PATH, sender, token)
}

/// Completion side of a file pick
pub struct FilePickSender {
    tx: Sender<Option<PathBuf>>,
    wakeup: UnixStream,
}

impl FilePickSender {
    /// Deliver the result and wake the waiting event loop.
    pub fn complete(mut self, result: Option<PathBuf>) {
        if self.tx.send(result).is_err() {
            debug!("File pick result dropped, waiter is gone");
            return;
        }
        if let Err(e) = self.wakeup.write_all(&[1]) {
            debug!("Failed to signal file pick completion: {}", e);
        }
    }
}

/// A file dialog that has not answered yet
///
/// Dropping it before completion runs the cancel hook.
pub struct PendingFilePick {
    rx: Receiver<Option<PathBuf>>,
    wakeup: UnixStream,
    cancel: Option<Box<dyn FnOnce() + Send>>,
    done: bool,
}

impl PendingFilePick {
    /// Socket that turns readable when the result is ready
    pub fn wakeup_fd(&self) -> BorrowedFd<'_> {
        self.wakeup.as_fd()
    }

    /// `None` while the dialog is open, otherwise the picked path (if any).
    pub fn try_take(&mut self) -> Option<Option<PathBuf>> {
        self.drain_wakeup();
        match self.rx.try_recv() {
            Ok(result) => {
                self.done = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            // The helper went away without answering
            Err(TryRecvError::Disconnected) => {
                self.done = true;
                Some(None)
            }
        }
    }

    /// Hook run when the pick is abandoned before completion.
    pub fn on_cancel(mut self, cancel: impl FnOnce() + Send + 'static) -> Self {
        self.cancel = Some(Box::new(cancel));
        self
    }

    /// Abandon the pick.
    pub fn cancel(self) {
        drop(self);
    }

    fn drain_wakeup(&mut self) {
        let mut buf = [0u8; 16];
        // Non-blocking: stops at WouldBlock or EOF
        while let Ok(n) = self.wakeup.read(&mut buf) {
            if n == 0 {
                break;
            }
        }
    }
}

impl Drop for PendingFilePick {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(cancel) = self.cancel.take() {
            debug!("Cancelling pending file pick");
            cancel();
        }
    }
}

/// Create a connected sender/pending pair.
pub fn pick_channel() -> anyhow::Result<(FilePickSender, PendingFilePick)> {
    let (reader, writer) = UnixStream::pair().context("failed to create wakeup socket")?;
    reader
        .set_nonblocking(true)
        .context("failed to make wakeup socket non-blocking")?;
    let (tx, rx) = mpsc::channel();
    Ok((
        FilePickSender { tx, wakeup: writer },
        PendingFilePick {
            rx,
            wakeup: reader,
            cancel: None,
            done: false,
        },
    ))
}

#[cfg(feature = "portal")]
pub use portal::open_file;

#[cfg(feature = "portal")]
mod portal {
    use std::collections::HashMap;
    use std::os::unix::ffi::OsStrExt;
    use std::path::{Path, PathBuf};
    use std::thread;

    use anyhow::Context;
    use gio::prelude::*;
    use tracing::{debug, info, warn};
    use zbus::blocking::{Connection, Proxy};
    use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

    use super::*;

    /// Show the portal open-file dialog.
    ///
    /// `initial` becomes the dialog's starting folder. Single selection only.
    pub fn open_file(initial: Option<&Path>) -> anyhow::Result<PendingFilePick> {
        let conn = Connection::session().context("failed to connect to session bus")?;
        let unique_name = conn
            .unique_name()
            .context("session bus connection has no unique name")?
            .to_string();
        let token = handle_token();
        let handle_path = request_path(&unique_name, &token);
        let current_folder = initial.map(|path| {
            let mut bytes = path.as_os_str().as_bytes().to_vec();
            bytes.push(0);
            bytes
        });

        let (sender, pending) = pick_channel()?;

        let thread_conn = conn.clone();
        let thread_path = handle_path.clone();
        thread::Builder::new()
            .name("file-chooser".to_string())
            .spawn(move || {
                let result =
                    match run_open_file(&thread_conn, &thread_path, &token, current_folder) {
                        Ok(result) => result,
                        Err(e) => {
                            warn!("File chooser failed: {:#}", e);
                            None
                        }
                    };
                sender.complete(result);
            })
            .context("failed to spawn file chooser thread")?;

        info!("File chooser opened ({})", handle_path);
        Ok(pending.on_cancel(move || close_request(&conn, &handle_path)))
    }

    fn run_open_file(
        conn: &Connection,
        handle_path: &str,
        token: &str,
        current_folder: Option<Vec<u8>>,
    ) -> anyhow::Result<Option<PathBuf>> {
        // Subscribe first so the response cannot race the call
        let request = Proxy::new(conn, PORTAL_DESTINATION, handle_path, REQUEST_INTERFACE)
            .context("failed to create request proxy")?;
        let responses = request
            .receive_signal("Response")
            .context("failed to subscribe to portal response")?;

        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("handle_token", Value::from(token));
        options.insert("multiple", Value::from(false));
        if let Some(folder) = current_folder {
            options.insert("current_folder", Value::from(folder));
        }

        let reply = conn
            .call_method(
                Some(PORTAL_DESTINATION),
                PORTAL_PATH,
                Some(FILE_CHOOSER_INTERFACE),
                "OpenFile",
                &("", "Open File", options),
            )
            .context("OpenFile call failed")?;
        let returned: OwnedObjectPath = reply
            .body()
            .deserialize()
            .context("unexpected OpenFile reply")?;
        let mut responses = match moved_request(handle_path, returned.as_str()) {
            None => responses,
            Some(path) => {
                warn!("Portal used request path {} instead of {}", path, handle_path);
                Proxy::new(conn, PORTAL_DESTINATION, path, REQUEST_INTERFACE)
                    .context("failed to create request proxy")?
                    .receive_signal("Response")
                    .context("failed to subscribe to portal response")?
            }
        };

        let Some(message) = responses.next() else {
            return Ok(None);
        };
        let (response, results): (u32, HashMap<String, OwnedValue>) = message
            .body()
            .deserialize()
            .context("unexpected portal response")?;
        if response != 0 {
            debug!("File chooser dismissed (response {})", response);
            return Ok(None);
        }

        Ok(first_uri(&results).and_then(|uri| uri_to_path(&uri)))
    }

    /// Request path to watch instead of the predicted one, if the portal
    /// picked another. Old portals ignore `handle_token`.
    pub(super) fn moved_request<'a>(predicted: &str, returned: &'a str) -> Option<&'a str> {
        (returned != predicted).then_some(returned)
    }

    /// Local path of a `file://` URI
    pub(super) fn uri_to_path(uri: &str) -> Option<PathBuf> {
        gio::File::for_uri(uri).path()
    }

    /// First entry of the `uris` result
    pub(super) fn first_uri(results: &HashMap<String, OwnedValue>) -> Option<String> {
        match &**results.get("uris")? {
            Value::Array(uris) => uris.iter().find_map(|uri| match uri {
                Value::Str(s) => Some(s.as_str().to_string()),
                _ => None,
            }),
            _ => None,
        }
    }

    fn close_request(conn: &Connection, handle_path: &str) {
        if let Err(e) = conn.call_method(
            Some(PORTAL_DESTINATION),
            handle_path,
            Some(REQUEST_INTERFACE),
            "Close",
            &(),
        ) {
            warn!("Failed to close portal request: {}", e);
        }
    }
}
