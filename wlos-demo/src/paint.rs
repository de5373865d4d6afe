//! Solid colour software rendering for the demo window
//!
//! The compositor only maps a toplevel once a buffer is attached, so the demo
//! fills an shm buffer at the window's device pixel size on every resize.

use std::ffi::CStr;
use std::fs::File;
use std::os::fd::{AsFd, FromRawFd, OwnedFd};
use std::os::unix::fs::FileExt;

use anyhow::Context;
use tracing::{debug, warn};
use wayland_client::protocol::{wl_buffer, wl_shm, wl_shm_pool, wl_surface::WlSurface};
use wayland_client::{delegate_noop, Connection, Dispatch, Proxy, QueueHandle};
use wlos_core::RenderTarget;

/// Dispatch state of the buffer queue
pub struct Buffers;

impl Dispatch<wl_buffer::WlBuffer, ()> for Buffers {
    fn event(
        _state: &mut Self,
        proxy: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Each buffer is attached once; the compositor is done with it
        if let wl_buffer::Event::Release = event {
            proxy.destroy();
        }
    }
}

delegate_noop!(Buffers: wl_shm_pool::WlShmPool);

/// XRGB8888 pixel data for a `width`x`height` buffer of one colour.
fn fill(color: u32, width: usize, height: usize) -> Vec<u8> {
    color.to_le_bytes().repeat(width * height)
}

fn shm_file(size: u64) -> anyhow::Result<File> {
    let name = CStr::from_bytes_with_nul(b"wlos-demo\0").context("invalid memfd name")?;
    // SAFETY: name is a valid NUL-terminated string
    let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error()).context("memfd_create failed");
    }
    // SAFETY: fd was just returned by memfd_create and is owned by nobody else
    let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
    file.set_len(size).context("failed to size shm file")?;
    Ok(file)
}

/// Render target that paints the whole surface in one colour
pub struct SolidFill {
    conn: Connection,
    shm: wl_shm::WlShm,
    surface: WlSurface,
    qh: QueueHandle<Buffers>,
    color: u32,
}

impl SolidFill {
    pub fn new(
        conn: Connection,
        shm: wl_shm::WlShm,
        surface: WlSurface,
        qh: QueueHandle<Buffers>,
        color: u32,
    ) -> Self {
        Self {
            conn,
            shm,
            surface,
            qh,
            color,
        }
    }

    fn paint(&self, width: i32, height: i32) -> anyhow::Result<()> {
        let stride = width.checked_mul(4).context("buffer too wide")?;
        let size = stride.checked_mul(height).context("buffer too large")?;

        let file = shm_file(size as u64)?;
        file.write_all_at(&fill(self.color, width as usize, height as usize), 0)
            .context("failed to fill shm buffer")?;

        let pool = self.shm.create_pool(file.as_fd(), size, &self.qh, ());
        let buffer = pool.create_buffer(
            0,
            width,
            height,
            stride,
            wl_shm::Format::Xrgb8888,
            &self.qh,
            (),
        );
        pool.destroy();

        self.surface.attach(Some(&buffer), 0, 0);
        if self.surface.version() >= 4 {
            self.surface.damage_buffer(0, 0, width, height);
        } else {
            self.surface.damage(0, 0, width, height);
        }
        self.surface.commit();
        self.conn.flush().context("Wayland flush failed")?;
        debug!("Painted {}x{}", width, height);
        Ok(())
    }
}

impl RenderTarget for SolidFill {
    fn resize(&mut self, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            return;
        }
        if let Err(e) = self.paint(width, height) {
            warn!("Failed to paint {}x{}: {:#}", width, height, e);
        }
    }
}
