//! rollcall-core — Face recognition engine and attendance policy.
//!
//! Detection runs SCRFD and embedding runs ArcFace, both through ONNX
//! Runtime. The catalog and cooldown tracker are the pure policy pieces the
//! attendance loop is built on.

pub mod alignment;
pub mod catalog;
pub mod cooldown;
pub mod detector;
pub mod engine;
pub mod recognizer;
pub mod types;

pub use catalog::{CatalogEntry, FaceCatalog};
pub use cooldown::CooldownTracker;
pub use detector::FaceDetector;
pub use engine::{EngineError, FaceEngine, OnnxFaceEngine};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, CosineMatcher, Embedding, Employee, Matcher};

/// Default directory holding `det_10g.onnx` and `w600k_r50.onnx`.
pub fn default_model_dir() -> std::path::PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            std::path::PathBuf::from(home).join(".local/share")
        })
        .join("rollcall/models")
}
