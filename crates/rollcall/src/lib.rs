//! rollcall: face-recognition attendance terminal.
//!
//! Wires the camera, face engine and SQLite store into two workflows:
//! registering an employee from a single frame, and marking attendance
//! continuously from the live feed.

pub mod app;
pub mod config;
pub mod geo;
pub mod live;
pub mod marker;
pub mod register;
pub mod ui;

#[cfg(test)]
mod testing;

pub use app::{AppError, AppSettings, AttendanceApp, DefaultApp};
pub use config::{Config, ConfigError};
pub use geo::{Coordinates, GeoError, GeoResolver, IpGeolocator, RetryPolicy};
pub use live::{FaceOverlay, LiveFrame, UNKNOWN_LABEL};
pub use marker::{AttendanceMarker, MarkOutcome, MarkedAttendance};
pub use register::{RegisterError, Registered};
