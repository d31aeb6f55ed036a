use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use txr_core::placeholder;
use txr_core::types::{new_id, Application, Job, JobType, Sequence, SequenceStatus};

use crate::error::{Result, StoreError};
use crate::store::{JobStore, JobTypeStore, SequenceStore};

/// Payload for registering an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplication {
    pub name: String,
    #[serde(default)]
    pub contact: Value,
}

/// Payload for adding a job type to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobType {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Value,
}

/// A job as submitted by a client. `id` and `to` may be `~placeholders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub options: Value,
}

/// Payload for defining a sequence together with its jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSequence {
    pub app_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: String,
    #[serde(default)]
    pub jobs: Vec<NewJob>,
}

const SEQUENCE_COLUMNS: &str = "id, app_id, app_name, description, frequency, status,
                                traceid, created_at, updated_at";
const JOB_COLUMNS: &str = "id, seq_id, \"to\", type, options, traceid";
const JOB_TYPE_COLUMNS: &str = "id, name, description, options, traceid, created_at, updated_at";
const APPLICATION_COLUMNS: &str = "id, name, contact, traceid, created_at, updated_at";

/// SQLite-backed store for every TXR entity.
///
/// Wraps a single connection in a `Mutex`; every method takes the lock for
/// the duration of one statement or transaction only.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// A panic while holding the lock cannot leave a half-applied statement
    /// behind, so a poisoned lock is still usable.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- applications ------------------------------------------------------

    #[instrument(skip(self, apps), fields(count = apps.len()))]
    pub fn create_applications(
        &self,
        apps: Vec<NewApplication>,
        trace_id: Option<&str>,
    ) -> Result<Vec<Application>> {
        let now = Utc::now().to_rfc3339();
        let mut db = self.conn();
        let tx = db.transaction()?;
        let mut created = Vec::with_capacity(apps.len());
        for app in apps {
            let id = new_id();
            tx.execute(
                "INSERT INTO application (id, name, contact, traceid, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id, app.name, app.contact.to_string(), trace_id, now],
            )?;
            created.push(Application {
                id,
                name: app.name,
                contact: app.contact,
                created_at: now.clone(),
                updated_at: now.clone(),
                trace_id: trace_id.map(String::from),
            });
        }
        tx.commit()?;
        info!(count = created.len(), "applications created");
        Ok(created)
    }

    pub fn list_applications(&self) -> Result<Vec<Application>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM application ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([], row_to_application)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn get_application(&self, id: &str) -> Result<Option<Application>> {
        let db = self.conn();
        let app = db
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM application WHERE id = ?1"),
                [id],
                row_to_application,
            )
            .optional()?;
        Ok(app)
    }

    /// Rename an application or change its contact. Sequences keep the
    /// `app_name` they were created with.
    #[instrument(skip(self, app))]
    pub fn update_application(&self, id: &str, app: NewApplication) -> Result<Application> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE application SET name = ?1, contact = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![app.name, app.contact.to_string(), now, id],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("application", id));
        }
        self.get_application(id)?
            .ok_or_else(|| StoreError::not_found("application", id))
    }

    /// Delete an application. Refused while sequences still reference it.
    #[instrument(skip(self))]
    pub fn delete_application(&self, id: &str) -> Result<()> {
        let db = self.conn();
        let in_use: i64 = db.query_row(
            "SELECT COUNT(*) FROM sequence WHERE app_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(StoreError::InUse {
                entity: "application",
                id: id.to_string(),
                references: in_use as usize,
            });
        }
        let n = db.execute("DELETE FROM application WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::not_found("application", id));
        }
        info!(app_id = %id, "application deleted");
        Ok(())
    }

    // --- job types ---------------------------------------------------------

    #[instrument(skip(self, job_types), fields(count = job_types.len()))]
    pub fn create_job_types(
        &self,
        job_types: Vec<NewJobType>,
        trace_id: Option<&str>,
    ) -> Result<Vec<JobType>> {
        let now = Utc::now().to_rfc3339();
        let mut db = self.conn();
        let tx = db.transaction()?;
        let mut created = Vec::with_capacity(job_types.len());
        for jt in job_types {
            let id = new_id();
            tx.execute(
                "INSERT INTO job_type (id, name, description, options, traceid, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, jt.name, jt.description, jt.options.to_string(), trace_id, now],
            )?;
            created.push(JobType {
                id,
                name: jt.name,
                description: jt.description,
                options: jt.options,
                created_at: now.clone(),
                updated_at: now.clone(),
                trace_id: trace_id.map(String::from),
            });
        }
        tx.commit()?;
        info!(count = created.len(), "job types created");
        Ok(created)
    }

    pub fn list_job_types(&self) -> Result<Vec<JobType>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {JOB_TYPE_COLUMNS} FROM job_type ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([], row_to_job_type)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Changes take effect for a sequence the next time it is activated.
    #[instrument(skip(self, jt))]
    pub fn update_job_type(&self, id: &str, jt: NewJobType) -> Result<JobType> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE job_type SET name = ?1, description = ?2, options = ?3, updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![jt.name, jt.description, jt.options.to_string(), now, id],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("job type", id));
        }
        JobTypeStore::get(self, id)?.ok_or_else(|| StoreError::not_found("job type", id))
    }

    /// Delete a job type. Refused while jobs still reference it.
    #[instrument(skip(self))]
    pub fn delete_job_type(&self, id: &str) -> Result<()> {
        let db = self.conn();
        let in_use: i64 =
            db.query_row("SELECT COUNT(*) FROM job WHERE type = ?1", [id], |row| {
                row.get(0)
            })?;
        if in_use > 0 {
            return Err(StoreError::InUse {
                entity: "job type",
                id: id.to_string(),
                references: in_use as usize,
            });
        }
        let n = db.execute("DELETE FROM job_type WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::not_found("job type", id));
        }
        info!(job_type_id = %id, "job type deleted");
        Ok(())
    }

    // --- sequences ---------------------------------------------------------

    /// Create an INACTIVE sequence and its jobs in one transaction.
    ///
    /// The application name is snapshotted into the sequence. `~placeholder`
    /// strings anywhere in the submitted jobs are replaced with generated ids
    /// (one id per distinct token) and jobs without an id get a fresh one.
    #[instrument(skip(self, new), fields(app_id = %new.app_id, jobs = new.jobs.len()))]
    pub fn create_sequence(&self, new: NewSequence, trace_id: Option<&str>) -> Result<Sequence> {
        let app = self
            .get_application(&new.app_id)?
            .ok_or_else(|| StoreError::not_found("application", &new.app_id))?;

        let jobs = placeholder::resolve_typed(new.jobs)?;
        let now = Utc::now().to_rfc3339();
        let seq_id = new_id();

        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO sequence
             (id, app_id, app_name, description, frequency, status, traceid, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                seq_id,
                app.id,
                app.name,
                new.description,
                new.frequency,
                SequenceStatus::Inactive.as_str(),
                trace_id,
                now
            ],
        )?;

        let mut created_jobs = Vec::with_capacity(jobs.len());
        for (position, job) in jobs.into_iter().enumerate() {
            let id = job.id.filter(|id| !id.is_empty()).unwrap_or_else(new_id);
            tx.execute(
                "INSERT INTO job (id, seq_id, position, \"to\", type, options, traceid)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    seq_id,
                    position as i64,
                    job.to,
                    job.job_type,
                    job.options.to_string(),
                    trace_id
                ],
            )?;
            created_jobs.push(Job {
                id,
                seq_id: seq_id.clone(),
                to: job.to,
                job_type: job.job_type,
                options: job.options,
                trace_id: trace_id.map(String::from),
            });
        }
        tx.commit()?;

        info!(sequence_id = %seq_id, jobs = created_jobs.len(), "sequence created");
        Ok(Sequence {
            id: seq_id,
            app_id: app.id,
            app_name: app.name,
            description: new.description,
            frequency: new.frequency,
            status: SequenceStatus::Inactive,
            jobs: created_jobs,
            created_at: now.clone(),
            updated_at: now,
            trace_id: trace_id.map(String::from),
        })
    }

    /// Every sequence with its jobs attached, oldest first.
    pub fn list_sequences(&self) -> Result<Vec<Sequence>> {
        let mut sequences = {
            let db = self.conn();
            let mut stmt = db.prepare(&format!(
                "SELECT {SEQUENCE_COLUMNS} FROM sequence ORDER BY created_at"
            ))?;
            let rows: Vec<Sequence> = stmt
                .query_map([], row_to_sequence)?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };
        for seq in &mut sequences {
            seq.jobs = self.list_by_sequence(&seq.id)?;
        }
        Ok(sequences)
    }

    /// A sequence with its jobs attached.
    pub fn get_sequence_with_jobs(&self, id: &str) -> Result<Option<Sequence>> {
        let Some(mut seq) = SequenceStore::get(self, id)? else {
            return Ok(None);
        };
        seq.jobs = self.list_by_sequence(id)?;
        Ok(Some(seq))
    }

    /// Delete a sequence; its jobs go with it.
    #[instrument(skip(self))]
    pub fn delete_sequence(&self, id: &str) -> Result<()> {
        let n = self
            .conn()
            .execute("DELETE FROM sequence WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::not_found("sequence", id));
        }
        info!(sequence_id = %id, "sequence deleted");
        Ok(())
    }
}

impl SequenceStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<Sequence>> {
        let db = self.conn();
        let seq = db
            .query_row(
                &format!("SELECT {SEQUENCE_COLUMNS} FROM sequence WHERE id = ?1"),
                [id],
                row_to_sequence,
            )
            .optional()?;
        Ok(seq)
    }

    fn list_active(&self) -> Result<Vec<Sequence>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SEQUENCE_COLUMNS} FROM sequence WHERE status = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([SequenceStatus::Active.as_str()], row_to_sequence)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn set_status(&self, id: &str, status: SequenceStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE sequence SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![status.as_str(), now, id],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("sequence", id));
        }
        debug!(sequence_id = %id, %status, "sequence status updated");
        Ok(())
    }
}

impl JobStore for SqliteStore {
    fn list_by_sequence(&self, seq_id: &str) -> Result<Vec<Job>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM job WHERE seq_id = ?1 ORDER BY position"
        ))?;
        let rows = stmt.query_map([seq_id], row_to_job)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

impl JobTypeStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<JobType>> {
        let db = self.conn();
        let jt = db
            .query_row(
                &format!("SELECT {JOB_TYPE_COLUMNS} FROM job_type WHERE id = ?1"),
                [id],
                row_to_job_type,
            )
            .optional()?;
        Ok(jt)
    }
}

/// Decode a JSON text column; a corrupt value reads as `null` rather than
/// failing the whole query.
fn json_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Value> {
    let raw: String = row.get(idx)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

fn row_to_application(row: &rusqlite::Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        id: row.get(0)?,
        name: row.get(1)?,
        contact: json_column(row, 2)?,
        trace_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_job_type(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobType> {
    Ok(JobType {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        options: json_column(row, 3)?,
        trace_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_sequence(row: &rusqlite::Row<'_>) -> rusqlite::Result<Sequence> {
    let status = row
        .get::<_, String>(5)?
        .parse::<SequenceStatus>()
        .unwrap_or_default();
    Ok(Sequence {
        id: row.get(0)?,
        app_id: row.get(1)?,
        app_name: row.get(2)?,
        description: row.get(3)?,
        frequency: row.get(4)?,
        status,
        jobs: Vec::new(),
        trace_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        seq_id: row.get(1)?,
        to: row.get(2)?,
        job_type: row.get(3)?,
        options: json_column(row, 4)?,
        trace_id: row.get(5)?,
    })
}
