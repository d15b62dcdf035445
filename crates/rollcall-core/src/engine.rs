use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Detection + embedding, the two model-backed steps of recognition.
///
/// `embed` returns one embedding per region, in the order given.
pub trait FaceEngine {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<BoundingBox>, EngineError>;

    fn embed(&mut self, frame: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError>;
}

/// SCRFD detector paired with an ArcFace recognizer.
pub struct OnnxFaceEngine {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEngine {
    /// Load both models. Fails fast if either file is missing.
    pub fn load(scrfd_path: &str, arcface_path: &str) -> Result<Self, EngineError> {
        let detector = FaceDetector::load(scrfd_path)?;
        tracing::info!(path = scrfd_path, "SCRFD detector loaded");

        let recognizer = FaceRecognizer::load(arcface_path)?;
        tracing::info!(path = arcface_path, "ArcFace recognizer loaded");

        Ok(Self { detector, recognizer })
    }
}

impl FaceEngine for OnnxFaceEngine {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
        Ok(self.detector.detect(frame)?)
    }

    fn embed(&mut self, frame: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
        faces
            .iter()
            .map(|face| self.recognizer.extract(frame, face).map_err(EngineError::from))
            .collect()
    }
}
