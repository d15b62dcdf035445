//! Employee registration from a single camera frame.

use crate::app::AttendanceApp;
use crate::geo::GeoResolver;
use rollcall_core::{EngineError, FaceEngine};
use rollcall_hw::{CameraError, FrameSource};
use rollcall_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("please enter a name")]
    EmptyName,
    #[error("failed to capture image from camera: {0}")]
    CaptureFailed(#[source] CameraError),
    #[error("no face visible; please ensure exactly one face is visible")]
    NoFace,
    #[error("{0} faces visible; please ensure exactly one face is visible")]
    MultipleFaces(usize),
    #[error("employee '{0}' already exists")]
    DuplicateName(String),
    #[error("recognition failed: {0}")]
    Engine(#[from] EngineError),
    #[error("database: {0}")]
    Store(#[source] StoreError),
}

impl RegisterError {
    /// Errors the operator can fix at the camera or keyboard and simply retry.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyName
                | Self::CaptureFailed(_)
                | Self::NoFace
                | Self::MultipleFaces(_)
                | Self::DuplicateName(_)
        )
    }
}

impl From<StoreError> for RegisterError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateName(name) => Self::DuplicateName(name),
            other => Self::Store(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub id: i64,
    pub name: String,
}

impl<C: FrameSource, E: FaceEngine, G: GeoResolver> AttendanceApp<C, E, G> {
    /// Capture one frame and enroll the single face in it under `name`.
    ///
    /// On success the catalog is reloaded before returning, so the new
    /// employee is recognizable on the next live tick. On error nothing has
    /// been written. Once the row is committed the call succeeds; a failed
    /// reload is only logged and the employee shows up on the next reload.
    pub fn register(&mut self, name: &str) -> Result<Registered, RegisterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegisterError::EmptyName);
        }

        let frame = self.camera.read().map_err(RegisterError::CaptureFailed)?;

        let faces = self.engine.detect(&frame.image)?;
        match faces.len() {
            0 => return Err(RegisterError::NoFace),
            1 => {}
            n => return Err(RegisterError::MultipleFaces(n)),
        }

        let embedding = self
            .engine
            .embed(&frame.image, &faces)?
            .into_iter()
            .next()
            .ok_or(RegisterError::NoFace)?;

        let id = self.store.add_employee(name, &embedding)?;
        tracing::info!(id, name, "employee registered");
        if let Err(e) = self.load_catalog() {
            tracing::error!(id, name, error = %e, "catalog reload after registration failed");
        }

        Ok(Registered {
            id,
            name: name.to_string(),
        })
    }
}
