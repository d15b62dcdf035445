//! Attendance marking: cooldown debounce, geolocation, one store write.

use crate::geo::{self, Coordinates, GeoResolver, RetryPolicy};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use rollcall_core::CooldownTracker;
use rollcall_store::{NewAttendance, Store};

/// A row that was written for a recognized employee.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedAttendance {
    pub record_id: i64,
    pub employee_id: i64,
    pub name: String,
    pub timestamp: NaiveDateTime,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    Marked(MarkedAttendance),
    /// Matched again inside the cooldown window; nothing written.
    CoolingDown,
    /// The store rejected the write. The cooldown still starts.
    WriteFailed { employee_id: i64, name: String, error: String },
}

pub struct AttendanceMarker {
    cooldown: CooldownTracker,
    retry: RetryPolicy,
}

impl AttendanceMarker {
    pub fn new(cooldown: TimeDelta, retry: RetryPolicy) -> Self {
        Self {
            cooldown: CooldownTracker::new(cooldown),
            retry,
        }
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    /// Mark `employee_id` present at `now` unless it is cooling down.
    ///
    /// The geolocation lookup is awaited inline, so the caller's loop makes
    /// no progress until it finishes (up to `attempts` lookups plus pauses).
    /// A failed lookup only leaves the coordinates empty.
    pub async fn mark<G: GeoResolver>(
        &mut self,
        store: &Store,
        geo: &G,
        employee_id: i64,
        name: &str,
        now: DateTime<Local>,
    ) -> MarkOutcome {
        if !self.cooldown.is_due(employee_id, now) {
            tracing::trace!(employee_id, name, "cooldown active; attendance suppressed");
            return MarkOutcome::CoolingDown;
        }

        let timestamp = now.naive_local();
        let coordinates = geo::resolve_with_retry(geo, &self.retry).await;
        let row = NewAttendance {
            employee_id,
            timestamp,
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
        };

        let outcome = match store.add_attendance(&row) {
            Ok(record_id) => {
                tracing::info!(
                    record_id,
                    employee_id,
                    name,
                    %timestamp,
                    located = coordinates.is_some(),
                    "attendance marked"
                );
                MarkOutcome::Marked(MarkedAttendance {
                    record_id,
                    employee_id,
                    name: name.to_string(),
                    timestamp,
                    coordinates,
                })
            }
            Err(e) => {
                tracing::error!(employee_id, name, error = %e, "attendance write failed");
                MarkOutcome::WriteFailed {
                    employee_id,
                    name: name.to_string(),
                    error: e.to_string(),
                }
            }
        };

        self.cooldown.record(employee_id, now);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{temp_store, FixedGeo};
    use rollcall_core::Embedding;
    use std::time::Duration;

    fn marker() -> AttendanceMarker {
        AttendanceMarker::new(
            TimeDelta::seconds(30),
            RetryPolicy {
                attempts: 3,
                pause: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_alice_marked_once_per_window() {
        let (_dir, store) = temp_store();
        let alice = store.add_employee("Alice", &Embedding::new(vec![1.0, 0.0])).unwrap();
        let geo = FixedGeo::at(28.6, 77.2);
        let mut marker = marker();
        let t0 = Local::now();

        let first = marker.mark(&store, &geo, alice, "Alice", t0).await;
        assert!(matches!(first, MarkOutcome::Marked(_)));
        let second = marker.mark(&store, &geo, alice, "Alice", t0 + TimeDelta::seconds(5)).await;
        assert_eq!(second, MarkOutcome::CoolingDown);
        assert_eq!(store.attendance_for(alice).unwrap().len(), 1);

        let third = marker.mark(&store, &geo, alice, "Alice", t0 + TimeDelta::seconds(31)).await;
        assert!(matches!(third, MarkOutcome::Marked(_)));
        assert_eq!(store.attendance_for(alice).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_does_not_touch_geolocation() {
        let (_dir, store) = temp_store();
        let alice = store.add_employee("Alice", &Embedding::new(vec![1.0])).unwrap();
        let geo = FixedGeo::at(1.0, 2.0);
        let mut marker = marker();
        let t0 = Local::now();

        marker.mark(&store, &geo, alice, "Alice", t0).await;
        marker.mark(&store, &geo, alice, "Alice", t0 + TimeDelta::seconds(1)).await;
        assert_eq!(geo.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_geolocation_writes_null_coordinates() {
        let (_dir, store) = temp_store();
        let alice = store.add_employee("Alice", &Embedding::new(vec![1.0])).unwrap();
        let geo = FixedGeo::failing();
        let mut marker = marker();

        let outcome = marker.mark(&store, &geo, alice, "Alice", Local::now()).await;
        let MarkOutcome::Marked(marked) = outcome else {
            panic!("expected a written row, got {outcome:?}");
        };
        assert_eq!(marked.coordinates, None);
        assert_eq!(geo.calls(), 3);

        let rows = store.attendance_for(alice).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].latitude, rows[0].longitude), (None, None));
    }

    #[tokio::test]
    async fn test_resolved_coordinates_are_stored() {
        let (_dir, store) = temp_store();
        let alice = store.add_employee("Alice", &Embedding::new(vec![1.0])).unwrap();
        let mut marker = marker();

        marker
            .mark(&store, &FixedGeo::at(28.6, 77.2), alice, "Alice", Local::now())
            .await;
        let rows = store.attendance_for(alice).unwrap();
        assert_eq!((rows[0].latitude, rows[0].longitude), (Some(28.6), Some(77.2)));
    }

    #[tokio::test]
    async fn test_write_failure_still_starts_cooldown() {
        let (_dir, store) = temp_store();
        let mut marker = marker();
        let t0 = Local::now();

        let outcome = marker.mark(&store, &FixedGeo::failing(), 999, "Ghost", t0).await;
        assert!(matches!(outcome, MarkOutcome::WriteFailed { employee_id: 999, .. }));
        assert!(!marker.cooldown().is_due(999, t0 + TimeDelta::seconds(10)));
    }
}
