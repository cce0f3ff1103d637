use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, useful for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn deployment_from_row(row: &Row<'_>) -> rusqlite::Result<DeploymentRecord> {
    Ok(DeploymentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        directory: row.get(2)?,
        repository: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let action: String = row.get(2)?;
    let params: String = row.get(3)?;
    Ok(Job {
        id: row.get(0)?,
        deployment_id: row.get(1)?,
        action: Action::parse(&action).unwrap_or(Action::Info),
        params: serde_json::from_str(&params).unwrap_or_default(),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Deployment operations

    fn create_deployment(&self, record: &DeploymentRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO deployments (id, name, directory, repository, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.name,
                record.directory,
                record.repository,
                format_datetime(&record.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_deployment(&self, id: &str) -> Result<Option<DeploymentRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, directory, repository, created_at
             FROM deployments WHERE id = ?1",
            params![id],
            deployment_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_deployments(&self) -> Result<Vec<DeploymentRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, directory, repository, created_at
             FROM deployments ORDER BY created_at, id",
        )?;
        let records = stmt
            .query_map([], deployment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn update_deployment(&self, record: &DeploymentRecord) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE deployments SET name = ?2, directory = ?3, repository = ?4
             WHERE id = ?1",
            params![record.id, record.name, record.directory, record.repository],
        )?;
        if updated == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_deployment(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM deployments WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // Job operations

    fn create_job(&self, job: &Job) -> Result<()> {
        let params_json = serde_json::to_string(&job.params)
            .map_err(|e| Error::BadRequest(format!("unserializable job params: {e}")))?;
        self.conn().execute(
            "INSERT INTO jobs (id, deployment_id, action, params, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                job.id,
                job.deployment_id,
                job.action.as_str(),
                params_json,
                format_datetime(&job.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, deployment_id, action, params, created_at
             FROM jobs WHERE id = ?1",
            params![id],
            job_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn next_pending_job(&self) -> Result<Option<Job>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT j.id, j.deployment_id, j.action, j.params, j.created_at
             FROM jobs j
             WHERE NOT EXISTS (SELECT 1 FROM job_results r WHERE r.job_id = j.id)
             ORDER BY j.seq LIMIT 1",
            [],
            job_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    // Result operations

    fn create_result(&self, result: &JobResult) -> Result<()> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO job_results (job_id, success, output, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                result.job_id,
                result.success,
                result.output,
                format_datetime(&result.created_at),
            ],
        )?;
        if inserted == 0 {
            return Err(Error::AlreadyExists);
        }
        Ok(())
    }

    fn get_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT job_id, success, output, created_at
             FROM job_results WHERE job_id = ?1",
            params![job_id],
            |row| {
                Ok(JobResult {
                    job_id: row.get(0)?,
                    success: row.get(1)?,
                    output: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn record(id: &str) -> DeploymentRecord {
        DeploymentRecord {
            id: id.to_string(),
            name: None,
            directory: None,
            repository: None,
            created_at: Utc::now(),
        }
    }

    fn job(id: &str, action: Action) -> Job {
        Job {
            id: id.to_string(),
            deployment_id: "ab12cd34".to_string(),
            action,
            params: ActionParams::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_deployment_crud() {
        let store = store();

        assert!(store.get_deployment("ab12cd34").unwrap().is_none());

        store.create_deployment(&record("ab12cd34")).unwrap();
        let mut fetched = store.get_deployment("ab12cd34").unwrap().unwrap();
        assert_eq!(fetched.id, "ab12cd34");
        assert!(fetched.repository.is_none());

        fetched.name = Some("staging".to_string());
        fetched.repository = Some("git@example.com:acme/app.git".to_string());
        store.update_deployment(&fetched).unwrap();
        let fetched = store.get_deployment("ab12cd34").unwrap().unwrap();
        assert_eq!(fetched.name.as_deref(), Some("staging"));

        assert!(store.delete_deployment("ab12cd34").unwrap());
        assert!(!store.delete_deployment("ab12cd34").unwrap());
        assert!(store.get_deployment("ab12cd34").unwrap().is_none());
    }

    #[test]
    fn test_create_deployment_duplicate_id_fails() {
        let store = store();
        store.create_deployment(&record("ab12cd34")).unwrap();
        assert!(store.create_deployment(&record("ab12cd34")).is_err());
    }

    #[test]
    fn test_update_missing_deployment_is_not_found() {
        let store = store();
        let err = store.update_deployment(&record("ffffffff")).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_jobs_are_fifo() {
        let store = store();
        store.create_job(&job("job-1", Action::Pull)).unwrap();
        store.create_job(&job("job-2", Action::Update)).unwrap();

        let next = store.next_pending_job().unwrap().unwrap();
        assert_eq!(next.id, "job-1");
        assert_eq!(next.action, Action::Pull);

        store
            .create_result(&JobResult {
                job_id: "job-1".to_string(),
                success: true,
                output: "ok".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();

        let next = store.next_pending_job().unwrap().unwrap();
        assert_eq!(next.id, "job-2");
    }

    #[test]
    fn test_result_written_exactly_once() {
        let store = store();
        store.create_job(&job("job-1", Action::Stop)).unwrap();

        let result = JobResult {
            job_id: "job-1".to_string(),
            success: false,
            output: "boom".to_string(),
            created_at: Utc::now(),
        };
        store.create_result(&result).unwrap();
        assert!(matches!(
            store.create_result(&result).unwrap_err(),
            Error::AlreadyExists
        ));

        let stored = store.get_result("job-1").unwrap().unwrap();
        assert!(!stored.success);
        assert_eq!(stored.output, "boom");
        assert!(store.next_pending_job().unwrap().is_none());
    }

    #[test]
    fn test_job_params_roundtrip() {
        let store = store();
        let mut queued = job("job-1", Action::Stop);
        queued.params.timeout = Some(10);
        store.create_job(&queued).unwrap();

        let fetched = store.get_job("job-1").unwrap().unwrap();
        assert_eq!(fetched.params.timeout, Some(10));
        assert_eq!(fetched.params.reset, None);
    }
}
