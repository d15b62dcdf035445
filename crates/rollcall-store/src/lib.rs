//! rollcall-store — SQLite persistence for employees and attendance.
//!
//! Every operation opens its own connection and closes it on return; there
//! is no long-lived handle and no transaction spans two statements.

mod schema;

pub use schema::SCHEMA;

use chrono::NaiveDateTime;
use rollcall_core::recognizer::EMBEDDING_DIM;
use rollcall_core::{Embedding, Employee};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("employee '{0}' already exists")]
    DuplicateName(String),
    #[error("employee {id} has a corrupt encoding blob ({len} bytes, expected {expected})")]
    CorruptEncoding { id: i64, len: usize, expected: usize },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// One persisted attendance row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub employee_id: i64,
    pub timestamp: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// An attendance row joined with the employee's name, for reports.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub name: String,
}

/// Fields of an attendance row before the store assigns its id.
#[derive(Debug, Clone, Copy)]
pub struct NewAttendance {
    pub employee_id: i64,
    pub timestamp: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Handle to the attendance database file.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    /// Number of `f32` values every stored encoding must hold.
    embedding_dim: usize,
}

impl Store {
    /// Create the database file (and parent directory) if needed and apply the schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            path,
            embedding_dim: EMBEDDING_DIM,
        };
        schema::apply_schema(&store.connect()?)?;
        tracing::info!(path = %store.path.display(), "attendance database ready");
        Ok(store)
    }

    /// Expect encodings of `dim` values instead of the recognizer's default.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Foreign keys are per-connection in SQLite; cascades need this on every open.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Insert a new employee and return its id.
    pub fn add_employee(&self, name: &str, embedding: &Embedding) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT INTO employees (name, encoding) VALUES (?1, ?2)",
            params![name, embedding.to_le_bytes()],
        );
        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                tracing::info!(id, name, dim = embedding.len(), "employee inserted");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateName(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All employees in store iteration order.
    ///
    /// Fails with [`StoreError::CorruptEncoding`] on the first blob that does
    /// not hold exactly `embedding_dim` values.
    pub fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id, name, encoding FROM employees ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
        })?;

        let mut employees = Vec::new();
        for row in rows {
            let (id, name, blob) = row?;
            let expected = self.embedding_dim * 4;
            let corrupt = StoreError::CorruptEncoding {
                id,
                len: blob.len(),
                expected,
            };
            if blob.len() != expected {
                return Err(corrupt);
            }
            let embedding = Embedding::from_le_bytes(&blob).ok_or(corrupt)?;
            employees.push(Employee { id, name, embedding });
        }
        Ok(employees)
    }

    pub fn employee_count(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM employees", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn employee_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.connect()?;
        Ok(conn
            .query_row("SELECT id FROM employees WHERE name = ?1", [name], |r| r.get(0))
            .optional()?)
    }

    /// Delete an employee by name; their attendance rows go with them.
    /// Returns false when no employee has that name.
    pub fn remove_employee(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM employees WHERE name = ?1", [name])?;
        if removed > 0 {
            tracing::info!(name, "employee removed");
        }
        Ok(removed > 0)
    }

    /// Insert one attendance row and return its id.
    pub fn add_attendance(&self, row: &NewAttendance) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO attendance (employee_id, timestamp, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
            params![row.employee_id, row.timestamp, row.latitude, row.longitude],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Attendance rows of one employee, oldest first.
    pub fn attendance_for(&self, employee_id: i64) -> Result<Vec<AttendanceRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, employee_id, timestamp, latitude, longitude
             FROM attendance WHERE employee_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([employee_id], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn attendance_count(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM attendance", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    /// Newest attendance rows first, joined with employee names.
    pub fn recent_attendance(&self, limit: usize) -> Result<Vec<AttendanceEntry>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.employee_id, a.timestamp, a.latitude, a.longitude, e.name
             FROM attendance a JOIN employees e ON e.id = a.employee_id
             ORDER BY a.id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(AttendanceEntry {
                record: record_from_row(row)?,
                name: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        timestamp: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("nested/attendance.db"))
            .unwrap()
            .with_embedding_dim(1);
        (dir, store)
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_open_is_idempotent() {
        let (dir, store) = temp_store();
        store.add_employee("alice", &Embedding::new(vec![1.0])).unwrap();
        let reopened = Store::open(dir.path().join("nested/attendance.db")).unwrap();
        assert_eq!(reopened.employee_count().unwrap(), 1);
    }

    #[test]
    fn test_employee_encoding_survives_store() {
        let (_dir, store) = temp_store();
        let store = store.with_embedding_dim(3);
        let enc = Embedding::new(vec![0.25, -1.5, 3.0]);
        let id = store.add_employee("alice", &enc).unwrap();

        let employees = store.employees().unwrap();
        assert_eq!(employees, vec![Employee { id, name: "alice".into(), embedding: enc }]);
        assert_eq!(store.employee_id("alice").unwrap(), Some(id));
        assert_eq!(store.employee_id("bob").unwrap(), None);
    }

    #[test]
    fn test_duplicate_name_rejected_and_count_unchanged() {
        let (_dir, store) = temp_store();
        store.add_employee("alice", &Embedding::new(vec![1.0])).unwrap();
        let err = store.add_employee("alice", &Embedding::new(vec![2.0])).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(ref n) if n == "alice"));
        assert_eq!(store.employee_count().unwrap(), 1);
    }

    #[test]
    fn test_attendance_with_null_coordinates() {
        let (_dir, store) = temp_store();
        let id = store.add_employee("alice", &Embedding::new(vec![1.0])).unwrap();
        store
            .add_attendance(&NewAttendance {
                employee_id: id,
                timestamp: at(9, 0, 0),
                latitude: None,
                longitude: None,
            })
            .unwrap();

        let rows = store.attendance_for(id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, at(9, 0, 0));
        assert_eq!((rows[0].latitude, rows[0].longitude), (None, None));
    }

    #[test]
    fn test_remove_employee_cascades_attendance() {
        let (_dir, store) = temp_store();
        let alice = store.add_employee("alice", &Embedding::new(vec![1.0])).unwrap();
        let bob = store.add_employee("bob", &Embedding::new(vec![0.0])).unwrap();
        for (id, t) in [(alice, at(9, 0, 0)), (alice, at(10, 0, 0)), (bob, at(9, 30, 0))] {
            store
                .add_attendance(&NewAttendance {
                    employee_id: id,
                    timestamp: t,
                    latitude: Some(28.6),
                    longitude: Some(77.2),
                })
                .unwrap();
        }

        assert!(store.remove_employee("alice").unwrap());
        assert!(!store.remove_employee("alice").unwrap());
        assert!(store.attendance_for(alice).unwrap().is_empty());
        assert_eq!(store.attendance_count().unwrap(), 1);
    }

    #[test]
    fn test_attendance_requires_existing_employee() {
        let (_dir, store) = temp_store();
        let err = store
            .add_attendance(&NewAttendance {
                employee_id: 42,
                timestamp: at(9, 0, 0),
                latitude: None,
                longitude: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn test_recent_attendance_newest_first_with_names() {
        let (_dir, store) = temp_store();
        let alice = store.add_employee("alice", &Embedding::new(vec![1.0])).unwrap();
        let bob = store.add_employee("bob", &Embedding::new(vec![0.0])).unwrap();
        for (id, t) in [(alice, at(9, 0, 0)), (bob, at(9, 5, 0)), (alice, at(9, 10, 0))] {
            store
                .add_attendance(&NewAttendance {
                    employee_id: id,
                    timestamp: t,
                    latitude: None,
                    longitude: None,
                })
                .unwrap();
        }

        let recent = store.recent_attendance(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].name, "alice");
        assert_eq!(recent[0].record.timestamp, at(9, 10, 0));
        assert_eq!(recent[1].name, "bob");
    }

    #[test]
    fn test_corrupt_blob_is_reported() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        conn.execute(
            "INSERT INTO employees (name, encoding) VALUES ('x', ?1)",
            [vec![1u8, 2, 3]],
        )
        .unwrap();
        assert!(matches!(
            store.employees().unwrap_err(),
            StoreError::CorruptEncoding { len: 3, .. }
        ));
    }

    #[test]
    fn test_encoding_of_wrong_length_fails_catalog_load() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("attendance.db")).unwrap();
        assert_eq!(store.embedding_dim(), EMBEDDING_DIM);

        let id = store.add_employee("truncated", &Embedding::new(vec![0.01])).unwrap();
        let err = store.employees().unwrap_err();
        assert!(matches!(
            err,
            StoreError::CorruptEncoding { id: bad, len: 4, expected } if bad == id && expected == EMBEDDING_DIM * 4
        ));

        store.remove_employee("truncated").unwrap();
        store.add_employee("bob", &Embedding::new(vec![0.5; EMBEDDING_DIM])).unwrap();
        assert_eq!(store.employees().unwrap().len(), 1);
    }
}
