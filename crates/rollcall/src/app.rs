use crate::config::Config;
use crate::geo::{GeoError, GeoResolver, IpGeolocator, RetryPolicy};
use crate::marker::AttendanceMarker;
use chrono::TimeDelta;
use rollcall_core::{CosineMatcher, EngineError, FaceCatalog, FaceEngine, OnnxFaceEngine};
use rollcall_hw::{Camera, CameraError, Frame, FrameSource};
use rollcall_store::{Store, StoreError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("could not access camera: {0}")]
    Camera(#[from] CameraError),
    #[error("could not load face models: {0}")]
    Engine(#[from] EngineError),
    #[error("database: {0}")]
    Store(#[from] StoreError),
    #[error("geolocation client: {0}")]
    Geo(#[from] GeoError),
}

/// Tunables of the attendance pipeline.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub similarity_threshold: f32,
    pub cooldown: TimeDelta,
    pub retry: RetryPolicy,
    pub downscale: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: CosineMatcher::DEFAULT_THRESHOLD,
            cooldown: TimeDelta::seconds(rollcall_core::cooldown::DEFAULT_COOLDOWN_SECS),
            retry: RetryPolicy::default(),
            downscale: 4,
        }
    }
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            cooldown: TimeDelta::seconds(config.cooldown_secs.max(0)),
            retry: RetryPolicy {
                attempts: config.geo_attempts,
                pause: Duration::from_millis(config.geo_pause_ms),
            },
            downscale: config.downscale.max(1),
        }
    }
}

/// Everything the attendance loop owns for the life of the process.
///
/// The camera is opened before construction and released when the app is
/// dropped. The store is a path; every query opens its own connection.
pub struct AttendanceApp<C, E, G> {
    pub(crate) camera: C,
    pub(crate) engine: E,
    pub(crate) store: Store,
    pub(crate) catalog: FaceCatalog,
    pub(crate) matcher: CosineMatcher,
    pub(crate) marker: AttendanceMarker,
    pub(crate) geo: G,
    pub(crate) downscale: u32,
}

/// The production wiring: V4L2 camera, ONNX engine, ipinfo lookup.
pub type DefaultApp = AttendanceApp<Camera, OnnxFaceEngine, IpGeolocator>;

impl DefaultApp {
    /// Open the store, camera, models and geolocation client, then load the
    /// catalog. Any failure here is fatal to startup.
    pub fn open(config: &Config) -> Result<Self, AppError> {
        let store = Store::open(&config.db_path)?;

        let mut camera = Camera::open(&config.camera_device)?;
        tracing::info!(
            device = %config.camera_device,
            width = camera.width,
            height = camera.height,
            fourcc = ?camera.fourcc,
            "camera opened"
        );
        if config.warmup_frames > 0 {
            tracing::info!(count = config.warmup_frames, "discarding warmup frames");
            for _ in 0..config.warmup_frames {
                let _ = camera.capture_frame();
            }
        }

        let engine = OnnxFaceEngine::load(&config.scrfd_model_path(), &config.arcface_model_path())?;
        let geo = IpGeolocator::new(
            config.geo_endpoint.clone(),
            Duration::from_secs(config.geo_timeout_secs),
        )?;

        Ok(AttendanceApp::new(camera, engine, store, geo, AppSettings::from(config))?)
    }
}

impl<C: FrameSource, E: FaceEngine, G: GeoResolver> AttendanceApp<C, E, G> {
    /// Assemble the app and load the catalog from the store.
    pub fn new(camera: C, engine: E, store: Store, geo: G, settings: AppSettings) -> Result<Self, StoreError> {
        let mut app = Self {
            camera,
            engine,
            store,
            catalog: FaceCatalog::new(),
            matcher: CosineMatcher::new(settings.similarity_threshold),
            marker: AttendanceMarker::new(settings.cooldown, settings.retry),
            geo,
            downscale: settings.downscale,
        };
        app.load_catalog()?;
        Ok(app)
    }

    /// Rebuild the catalog from the store. Returns the number of entries.
    pub fn load_catalog(&mut self) -> Result<usize, StoreError> {
        let employees = self.store.employees()?;
        self.catalog.reload(employees);
        tracing::info!(employees = self.catalog.len(), "face catalog loaded");
        Ok(self.catalog.len())
    }

    pub fn catalog(&self) -> &FaceCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn marker(&self) -> &AttendanceMarker {
        &self.marker
    }

    /// Grab a frame for the registration preview. A failed grab is skipped.
    pub fn preview_frame(&mut self) -> Option<Frame> {
        match self.camera.read() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::debug!(error = %e, "preview frame skipped");
                None
            }
        }
    }
}
