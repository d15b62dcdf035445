//! In-crate fakes for the camera, engine and geolocation collaborators.

use crate::app::{AppSettings, AttendanceApp};
use crate::geo::{Coordinates, GeoError, GeoResolver, RetryPolicy};
use image::RgbImage;
use rollcall_core::{BoundingBox, EngineError, Embedding, FaceEngine};
use rollcall_hw::{CameraError, Frame, FrameSource};
use rollcall_store::Store;
use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;
use tempfile::TempDir;

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// Yields blank frames, except for queued failures which come first.
#[derive(Default)]
pub struct ScriptedCamera {
    failures: VecDeque<CameraError>,
    sequence: u32,
}

impl ScriptedCamera {
    pub fn push_failure(&mut self) {
        self.failures
            .push_back(CameraError::CaptureFailed("scripted failure".into()));
    }
}

impl FrameSource for ScriptedCamera {
    fn read(&mut self) -> Result<Frame, CameraError> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.sequence += 1;
        Ok(Frame::new(RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT), self.sequence))
    }
}

/// Reports `faces` on every frame and embeds them as `embeddings`, pairwise.
#[derive(Default)]
pub struct ScriptedEngine {
    pub faces: Vec<BoundingBox>,
    pub embeddings: Vec<Embedding>,
    pub last_detect_size: Option<(u32, u32)>,
}

impl ScriptedEngine {
    pub fn show(&mut self, faces: Vec<(BoundingBox, Embedding)>) {
        let (faces, embeddings) = faces.into_iter().unzip();
        self.faces = faces;
        self.embeddings = embeddings;
    }
}

impl FaceEngine for ScriptedEngine {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
        self.last_detect_size = Some(frame.dimensions());
        Ok(self.faces.clone())
    }

    fn embed(&mut self, _frame: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
        Ok(self.embeddings.iter().take(faces.len()).cloned().collect())
    }
}

/// Fails `failures` times, then answers with `coords` (or fails forever).
pub struct FixedGeo {
    coords: Option<Coordinates>,
    failures: u32,
    calls: Cell<u32>,
}

impl FixedGeo {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self::succeeding_after(0, Coordinates { latitude, longitude })
    }

    pub fn failing() -> Self {
        Self {
            coords: None,
            failures: 0,
            calls: Cell::new(0),
        }
    }

    pub fn succeeding_after(failures: u32, coords: Coordinates) -> Self {
        Self {
            coords: Some(coords),
            failures,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl GeoResolver for FixedGeo {
    async fn resolve(&self) -> Result<Coordinates, GeoError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        match self.coords {
            Some(c) if n > self.failures => Ok(c),
            _ => Err(GeoError::Unavailable("scripted failure".into())),
        }
    }
}

pub fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("attendance.db"))
        .unwrap()
        .with_embedding_dim(2);
    (dir, store)
}

pub fn test_settings() -> AppSettings {
    AppSettings {
        retry: RetryPolicy {
            attempts: 3,
            pause: Duration::ZERO,
        },
        ..AppSettings::default()
    }
}

pub type TestApp = AttendanceApp<ScriptedCamera, ScriptedEngine, FixedGeo>;

pub fn test_app_with_store(store: Store) -> TestApp {
    AttendanceApp::new(
        ScriptedCamera::default(),
        ScriptedEngine::default(),
        store,
        FixedGeo::failing(),
        test_settings(),
    )
    .unwrap()
}

pub fn test_app() -> (TempDir, TestApp) {
    let (dir, store) = temp_store();
    (dir, test_app_with_store(store))
}

pub fn face_at(x: f32, y: f32, size: f32) -> BoundingBox {
    BoundingBox {
        x,
        y,
        width: size,
        height: size,
        confidence: 0.9,
        landmarks: None,
    }
}
