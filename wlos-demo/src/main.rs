//! Opens a custom-decorated window and prints its input events as JSON lines.
//!
//! F1 shows the file dialog, F2 reveals the working directory in the file
//! manager, F3 opens the project page, Escape quits.

mod paint;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use wlos_core::{Event, EventKind, GfxConfig, Key, Rect, Session, WindowFlags};

const PROJECT_URL: &str = "https://wayland.freedesktop.org/";
const BACKGROUND: u32 = 0xff2e3440;

const TITLE_BAR: f32 = 32.0;
const EDGES: f32 = 6.0;
/// Width of the close-button client area at the right end of the title bar
const BUTTON_WIDTH: f32 = 48.0;

fn print_event(out: &mut impl Write, event: &Event) -> anyhow::Result<()> {
    let json = serde_json::to_string(event)?;
    writeln!(out, "{}", json)?;
    out.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    wlos_core::init_logging();

    let config = match std::env::args_os().nth(1) {
        Some(path) => GfxConfig::load(&PathBuf::from(path))?,
        None => GfxConfig::from_env(),
    };
    let mut session = Session::connect_with_config(config)?;

    let flags = WindowFlags {
        custom_border: true,
        use_default_position: true,
    };
    let window = session.open_window(Rect::new(0.0, 0.0, 800.0, 600.0), flags, "wlos demo");
    anyhow::ensure!(!window.is_null(), "failed to open window");

    // open_window has acked the initial configure, so a buffer may be committed
    let conn = session.wayland_connection().context("no Wayland connection")?;
    let shm = session.wl_shm().context("no wl_shm")?;
    let surface = session.wl_surface(window).context("window has no surface")?;
    let mut buffers = conn.new_event_queue::<paint::Buffers>();
    let fill = paint::SolidFill::new(conn, shm, surface, buffers.handle(), BACKGROUND);
    session.attach_render_target(window, Box::new(fill));
    session.first_paint(window);

    let mut stdout = std::io::stdout().lock();
    'main: loop {
        // Client areas are in device pixels and follow the current width
        let rect = session.rect_from_window(window);
        let scale = rect.width() / session.window(window).map_or(1.0, |w| w.width as f32);
        session.clear_custom_border_data(window);
        session.push_custom_title_bar(window, TITLE_BAR);
        session.push_custom_edges(window, EDGES);
        session.push_custom_title_bar_client_area(
            window,
            Rect::new(rect.x1 - BUTTON_WIDTH * scale, 0.0, rect.x1, TITLE_BAR * scale),
        );

        let events = session.get_events(true)?;
        buffers
            .dispatch_pending(&mut paint::Buffers)
            .context("buffer queue dispatch failed")?;
        for event in &events {
            print_event(&mut stdout, event)?;
            match event.kind {
                EventKind::WindowClose => break 'main,
                EventKind::Press { key: Key::Esc, .. } => break 'main,
                EventKind::Press { key: Key::F1, .. } => {
                    let cwd = std::env::current_dir().ok();
                    match session.pick_file(cwd.as_deref()) {
                        Some(path) => info!("Picked {}", path.display()),
                        None => info!("No file picked"),
                    }
                }
                EventKind::Press { key: Key::F2, .. } => {
                    let cwd = std::env::current_dir()?;
                    session.show_in_file_manager(&cwd);
                }
                EventKind::Press { key: Key::F3, .. } => session.open_in_browser(PROJECT_URL),
                _ => {}
            }
        }
    }

    session.close_window(window);
    info!("Demo finished");
    Ok(())
}
