//! rollcall-hw — Webcam capture for the attendance loop.
//!
//! Provides V4L2 camera access and decoding of YUYV / MJPG buffers into
//! RGB frames.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::{Frame, FrameError};

/// A camera-like source: one `read` per tick, each yielding one frame.
///
/// An error from `read` is a single failed grab; the caller may simply try
/// again on its next tick.
pub trait FrameSource {
    fn read(&mut self) -> Result<Frame, CameraError>;
}
