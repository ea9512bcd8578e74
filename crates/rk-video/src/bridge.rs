//! Latest-frame-wins framebuffer store

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use rk_abi::PixelFormat;

/// A decoded frame owned by the host.
///
/// `pixels` holds `pitch * height` bytes copied out of the core's
/// call-scoped buffer; rows may carry padding beyond `width` pixels.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including any padding
    pub pitch: usize,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

/// Notification sent to the presenter after a new frame is stored
#[derive(Debug, Clone, Copy)]
pub struct PresentEvent {
    pub width: u32,
    pub height: u32,
    /// Monotonically increasing frame number
    pub frame: u64,
}

/// Holds the most recent decoded frame only; no backlog.
///
/// The producer side runs on the core's execution thread inside the video
/// callback and must return quickly; the presenter consumes frames from
/// another thread at its own pace and only ever sees the newest one.
pub struct VideoBridge {
    frame: Mutex<Option<FrameBuffer>>,
    format: Mutex<PixelFormat>,
    frames_received: AtomicU64,
    present_tx: Mutex<Option<Sender<PresentEvent>>>,
}

impl VideoBridge {
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(None),
            format: Mutex::new(PixelFormat::Rgb565),
            frames_received: AtomicU64::new(0),
            present_tx: Mutex::new(None),
        }
    }

    /// Set the pixel format negotiated through the environment callback.
    ///
    /// Applies to frames stored after this call; an in-flight frame keeps
    /// the format it was decoded with.
    pub fn set_format(&self, format: PixelFormat) {
        *self.format.lock() = format;
    }

    /// The currently negotiated pixel format
    pub fn format(&self) -> PixelFormat {
        *self.format.lock()
    }

    /// Copy a frame out of the core's call-scoped buffer.
    ///
    /// # Safety
    ///
    /// `data` must point to at least `pitch * height` readable bytes and
    /// stay valid for the duration of this call.
    pub unsafe fn refresh_raw(&self, data: *const u8, width: u32, height: u32, pitch: usize) {
        if data.is_null() {
            return;
        }
        let bytes = std::slice::from_raw_parts(data, pitch * height as usize);
        self.refresh(bytes, width, height, pitch);
    }

    /// Store a new frame, replacing the previous one.
    ///
    /// The backing allocation is reused when the geometry and format are
    /// unchanged; otherwise it is reallocated. The byte copy completes
    /// before this returns, and the presentation notification never blocks.
    pub fn refresh(&self, bytes: &[u8], width: u32, height: u32, pitch: usize) {
        debug_assert_eq!(bytes.len(), pitch * height as usize);
        let format = self.format();

        {
            let mut slot = self.frame.lock();
            match slot.as_mut() {
                Some(frame)
                    if frame.width == width
                        && frame.height == height
                        && frame.pitch == pitch
                        && frame.format == format =>
                {
                    frame.pixels.copy_from_slice(bytes);
                }
                _ => {
                    tracing::debug!(
                        "Allocating frame store: {}x{} pitch {} ({:?})",
                        width,
                        height,
                        pitch,
                        format
                    );
                    *slot = Some(FrameBuffer {
                        width,
                        height,
                        pitch,
                        format,
                        pixels: bytes.to_vec(),
                    });
                }
            }
        }

        let frame = self.frames_received.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(tx) = self.present_tx.lock().as_ref() {
            // A full channel means the presenter is behind; it will pick up
            // the newest frame on its next pass.
            let _ = tx.try_send(PresentEvent {
                width,
                height,
                frame,
            });
        }
    }

    /// Register as the presenter and receive frame notifications.
    ///
    /// Only one presenter is supported; calling again replaces the previous
    /// subscription.
    pub fn subscribe(&self) -> Receiver<PresentEvent> {
        let (tx, rx) = bounded(1);
        *self.present_tx.lock() = Some(tx);
        rx
    }

    /// Clone of the most recent frame, if any
    pub fn latest(&self) -> Option<FrameBuffer> {
        self.frame.lock().clone()
    }

    /// Move the most recent frame out, leaving the store empty
    pub fn take_frame(&self) -> Option<FrameBuffer> {
        self.frame.lock().take()
    }

    /// Total frames stored since construction
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }
}

impl Default for VideoBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(value: u8, pitch: usize, height: u32) -> Vec<u8> {
        vec![value; pitch * height as usize]
    }

    #[test]
    fn test_latest_frame_wins() {
        let bridge = VideoBridge::new();
        bridge.refresh(&frame_bytes(1, 512, 240), 256, 240, 512);
        bridge.refresh(&frame_bytes(2, 512, 240), 256, 240, 512);

        let frame = bridge.latest().unwrap();
        assert_eq!(frame.pixels[0], 2);
        assert_eq!(bridge.frames_received(), 2);
    }

    #[test]
    fn test_reallocates_on_geometry_change() {
        let bridge = VideoBridge::new();
        bridge.refresh(&frame_bytes(1, 512, 240), 256, 240, 512);
        bridge.refresh(&frame_bytes(2, 640, 480), 320, 480, 640);

        let frame = bridge.latest().unwrap();
        assert_eq!(frame.width, 320);
        assert_eq!(frame.height, 480);
        assert_eq!(frame.pixels.len(), 640 * 480);
    }

    #[test]
    fn test_format_applies_to_next_frame() {
        let bridge = VideoBridge::new();
        assert_eq!(bridge.format(), PixelFormat::Rgb565);

        bridge.set_format(PixelFormat::Xrgb8888);
        bridge.refresh(&frame_bytes(1, 1024, 240), 256, 240, 1024);
        assert_eq!(bridge.latest().unwrap().format, PixelFormat::Xrgb8888);
    }

    #[test]
    fn test_null_pointer_is_ignored() {
        let bridge = VideoBridge::new();
        bridge.refresh(&frame_bytes(1, 512, 240), 256, 240, 512);
        unsafe { bridge.refresh_raw(std::ptr::null(), 256, 240, 512) };

        // The previous frame stays current
        assert_eq!(bridge.frames_received(), 1);
        assert_eq!(bridge.latest().unwrap().pixels[0], 1);
    }

    #[test]
    fn test_presenter_notification_never_blocks() {
        let bridge = VideoBridge::new();
        let rx = bridge.subscribe();

        // Nobody drains the channel; refreshes must not block
        for _ in 0..10 {
            bridge.refresh(&frame_bytes(3, 512, 240), 256, 240, 512);
        }

        let event = rx.recv().unwrap();
        assert_eq!(event.width, 256);
        assert_eq!(bridge.frames_received(), 10);
    }

    #[test]
    fn test_take_frame_empties_store() {
        let bridge = VideoBridge::new();
        bridge.refresh(&frame_bytes(1, 512, 240), 256, 240, 512);
        assert!(bridge.take_frame().is_some());
        assert!(bridge.take_frame().is_none());
    }
}
