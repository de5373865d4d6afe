//! File manager and browser hand-off

use anyhow::Context;
use tracing::debug;

/// Open `url` with the user's default handler.
pub fn open_in_browser(url: &str) -> anyhow::Result<()> {
    gio::AppInfo::launch_default_for_uri(url, gio::AppLaunchContext::NONE)
        .with_context(|| format!("failed to open {}", url))?;
    debug!("Opened {}", url);
    Ok(())
}

#[cfg(feature = "portal")]
pub use file_manager::show_in_file_manager;

#[cfg(feature = "portal")]
mod file_manager {
    use std::path::Path;
    use std::thread;

    use anyhow::Context;
    use gio::prelude::*;
    use tracing::{debug, warn};
    use zbus::blocking::Connection;

    const FILE_MANAGER_NAME: &str = "org.freedesktop.FileManager1";
    const FILE_MANAGER_PATH: &str = "/org/freedesktop/FileManager1";

    /// Reveal `path` in the file manager. Fire and forget.
    pub fn show_in_file_manager(path: &Path) {
        let uri = file_uri(path);
        let spawned = thread::Builder::new()
            .name("file-manager".to_string())
            .spawn(move || {
                if let Err(e) = show_items(&uri) {
                    warn!("Failed to show {} in file manager: {:#}", uri, e);
                }
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn file manager thread: {}", e);
        }
    }

    /// `file://` URI for `path`, percent-encoded.
    pub(super) fn file_uri(path: &Path) -> String {
        gio::File::for_path(path).uri().to_string()
    }

    fn show_items(uri: &str) -> anyhow::Result<()> {
        let conn = Connection::session().context("failed to connect to session bus")?;
        conn.call_method(
            Some(FILE_MANAGER_NAME),
            FILE_MANAGER_PATH,
            Some(FILE_MANAGER_NAME),
            "ShowItems",
            &(vec![uri], ""),
        )
        .context("ShowItems call failed")?;
        debug!("ShowItems {}", uri);
        Ok(())
    }
}
