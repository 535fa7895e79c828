use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL,
                student_id  TEXT,
                department  TEXT NOT NULL,
                is_admin    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE complaints (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                subject         TEXT NOT NULL,
                description     TEXT NOT NULL,
                incident_date   TEXT,
                location        TEXT,
                witnesses       TEXT,
                file_name       TEXT,
                file_path       TEXT,
                status          TEXT NOT NULL DEFAULT 'pending',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_complaints_user
                ON complaints(user_id, created_at);

            CREATE TABLE scan_reports (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL REFERENCES users(id),
                complaint_id        TEXT NOT NULL REFERENCES complaints(id),
                original_filename   TEXT NOT NULL,
                file_hash           TEXT NOT NULL,
                verdict             TEXT NOT NULL,
                report_link         TEXT NOT NULL,
                details             TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_scan_reports_complaint
                ON scan_reports(complaint_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
