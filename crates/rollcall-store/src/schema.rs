use rusqlite::Connection;

/// Idempotent schema: both tables are created only when missing.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS employees (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL UNIQUE,
    encoding  BLOB    NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance (
    id           INTEGER  PRIMARY KEY AUTOINCREMENT,
    employee_id  INTEGER  NOT NULL,
    timestamp    DATETIME NOT NULL,
    latitude     REAL,
    longitude    REAL,
    FOREIGN KEY(employee_id) REFERENCES employees(id) ON DELETE CASCADE
);
";

pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
