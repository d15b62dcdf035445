//! One tick of the live recognition loop.

use crate::app::AttendanceApp;
use crate::geo::GeoResolver;
use crate::marker::MarkOutcome;
use chrono::{DateTime, Local};
use image::RgbImage;
use rollcall_core::{BoundingBox, EngineError, FaceEngine};
use rollcall_hw::FrameSource;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// A detected face, in full-frame coordinates, with what to print on it.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceOverlay {
    pub region: BoundingBox,
    pub label: String,
    pub employee_id: Option<i64>,
}

impl FaceOverlay {
    /// Whether the face matched a catalog entry. The label is display text
    /// only; an employee may well be named "Unknown".
    pub fn is_known(&self) -> bool {
        self.employee_id.is_some()
    }
}

/// Everything the live view draws for one tick.
pub struct LiveFrame {
    pub image: RgbImage,
    pub faces: Vec<FaceOverlay>,
    /// Running clock printed in the frame corner.
    pub clock: String,
    /// Attendance decisions taken this tick (cooldown suppressions excluded).
    pub marks: Vec<MarkOutcome>,
}

impl<C: FrameSource, E: FaceEngine, G: GeoResolver> AttendanceApp<C, E, G> {
    /// Capture, recognize and mark attendance for one frame.
    ///
    /// Returns `Ok(None)` when the camera read failed; the caller just waits
    /// for the next tick. Detection runs on a frame shrunk by the configured
    /// factor and regions are scaled back up, so small distant faces may be
    /// missed.
    pub async fn live_tick(&mut self, now: DateTime<Local>) -> Result<Option<LiveFrame>, EngineError> {
        let frame = match self.camera.read() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::trace!(error = %e, "live frame skipped");
                return Ok(None);
            }
        };

        let small = frame.downscaled(self.downscale);
        let regions = self.engine.detect(&small)?;
        let embeddings = self.engine.embed(&small, &regions)?;
        let scale = self.downscale as f32;

        let mut faces = Vec::with_capacity(regions.len());
        let mut marks = Vec::new();

        for (region, embedding) in regions.iter().zip(embeddings.iter()) {
            let hit = self
                .catalog
                .first_match(&self.matcher, embedding)
                .map(|entry| (entry.id, entry.name.clone()));

            let (label, employee_id) = match hit {
                Some((id, name)) => {
                    let outcome = self.marker.mark(&self.store, &self.geo, id, &name, now).await;
                    if outcome != MarkOutcome::CoolingDown {
                        marks.push(outcome);
                    }
                    (name, Some(id))
                }
                None => (UNKNOWN_LABEL.to_string(), None),
            };

            faces.push(FaceOverlay {
                region: region.scaled(scale),
                label,
                employee_id,
            });
        }

        Ok(Some(LiveFrame {
            image: frame.image,
            faces,
            clock: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            marks,
        }))
    }
}
