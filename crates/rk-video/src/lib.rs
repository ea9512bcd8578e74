//! Video bridge for the retrokit core host
//!
//! Receives framebuffer descriptors from the core's video-refresh callback
//! and republishes the latest frame for presentation. The core's buffer is
//! only valid for the duration of the callback, so the pixel bytes are
//! copied out synchronously; everything downstream of the copy is decoupled
//! through a non-blocking channel.

pub mod bridge;

pub use bridge::{FrameBuffer, PresentEvent, VideoBridge};
